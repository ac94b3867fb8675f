// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::{
  Entry, Result, TiffError, Value, apply_corr,
  entry::ENTRY_SIZE,
  reader::{EndianReader, ReadByteOrder},
};
use crate::{bits::Endian, tags::TiffTag};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
  collections::{BTreeMap, HashMap},
  io::{Read, Seek},
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IFD {
  pub offset: u32,
  pub base: u32,
  pub corr: i32,
  pub next_ifd: u32,
  pub entries: BTreeMap<u16, Entry>,
  pub endian: Endian,
  pub sub: HashMap<u16, Vec<IFD>>,
}

impl IFD {
  /// Parse IFD at `offset`, SubIFDs referenced by any of `sub_tags`
  /// are followed up to `max_depth` levels.
  pub fn new_with_depth<R: Read + Seek>(
    reader: &mut R,
    offset: u32,
    base: u32,
    corr: i32,
    endian: Endian,
    sub_tags: &[u16],
    max_depth: usize,
  ) -> Result<IFD> {
    let mut path = Vec::new();
    Self::parse(reader, offset, base, corr, endian, sub_tags, max_depth, &mut path)
  }

  /// Parse a standalone IFD at an absolute file offset that is not
  /// referenced by the regular IFD tree. No SubIFDs are followed.
  pub fn new_hidden<R: Read + Seek>(reader: &mut R, offset: u32, endian: Endian) -> Result<IFD> {
    let stream_len = EndianReader::new(&mut *reader, endian).stream_len()?;
    if offset as u64 + 2 > stream_len {
      return Err(TiffError::Overflow(format!("IFD offset {:#x} is behind EOF ({} bytes)", offset, stream_len)));
    }
    let ifd = Self::new_with_depth(reader, offset, 0, 0, endian, &[], 0)?;
    if ifd.entries.is_empty() {
      return Err(TiffError::General(format!("IFD at {:#x} is invalid, IFD must contain at least one entry", offset)));
    }
    Ok(ifd)
  }

  #[allow(clippy::too_many_arguments)]
  fn parse<R: Read + Seek>(
    reader: &mut R,
    offset: u32,
    base: u32,
    corr: i32,
    endian: Endian,
    sub_tags: &[u16],
    depth_left: usize,
    path: &mut Vec<u32>,
  ) -> Result<IFD> {
    path.push(offset);
    let ifd = Self::parse_on_path(reader, offset, base, corr, endian, sub_tags, depth_left, path);
    path.pop();
    ifd
  }

  #[allow(clippy::too_many_arguments)]
  fn parse_on_path<R: Read + Seek>(
    reader: &mut R,
    offset: u32,
    base: u32,
    corr: i32,
    endian: Endian,
    sub_tags: &[u16],
    depth_left: usize,
    path: &mut Vec<u32>,
  ) -> Result<IFD> {
    let start = base
      .checked_add(offset)
      .ok_or_else(|| TiffError::Overflow(format!("IFD offset {:#x} with base {:#x} is out of range", offset, base)))?;
    let mut reader = EndianReader::new(reader, endian);
    reader.goto(start)?;
    let entry_count = reader.read_u16()?;
    let mut entries = BTreeMap::new();
    let mut sub_ifd_offsets = Vec::new();
    let first_entry = reader.position()?;
    debug!("Parse {} entries of IFD at {:#x}", entry_count, start);
    for i in 0..entry_count as u32 {
      match Entry::parse(&mut reader, first_entry + i * ENTRY_SIZE, base, corr) {
        Ok(entry) => {
          if sub_tags.contains(&entry.tag) {
            match &entry.value {
              Value::Long(offsets) => {
                sub_ifd_offsets.push((entry.tag, offsets.iter().map(|off| apply_corr(*off, corr)).collect::<Vec<_>>()));
              }
              Value::Undefined(_) => {
                sub_ifd_offsets.push((entry.tag, entry.embedded.into_iter().collect()));
              }
              val => {
                log::info!(
                  "Found IFD offset tag, but type mismatch: {}. Ignoring SubIFD parsing for tag 0x{:X}",
                  val.value_type_name(),
                  entry.tag
                );
              }
            }
          }
          entries.insert(entry.tag, entry);
        }
        Err(err) => {
          log::info!("Failed to parse TIFF entry {} of IFD at {:#x}, skipping: {}", i, base + offset, err);
        }
      }
    }

    // Some TIFF writers skip the next ifd pointer
    // If we get an I/O error, we fallback to 0, signaling the end of IFD chains.
    reader.goto(first_entry + entry_count as u32 * ENTRY_SIZE)?;
    let next_ifd = match reader.read_u32() {
      Ok(ptr) => ptr,
      Err(e) => {
        debug!(
          "TIFF IFD reader failed to get next IFD pointer, fallback to 0 and continue. Original error was: {}",
          e
        );
        0
      }
    };

    // Process SubIFDs
    let reader = reader.into_inner();
    let mut sub = HashMap::new();
    for (tag, offsets) in sub_ifd_offsets {
      if depth_left == 0 {
        log::info!("Maximum IFD nesting depth reached, ignoring SubIFDs for tag 0x{:X}", tag);
        continue;
      }
      let mut ifds = Vec::new();
      for sub_offset in offsets {
        if path.contains(&sub_offset) {
          log::warn!("SubIFD for tag 0x{:X} points back to IFD at {:#x}, ignoring it", tag, sub_offset);
          continue;
        }
        match Self::parse(&mut *reader, sub_offset, base, corr, endian, sub_tags, depth_left - 1, path) {
          Ok(ifd) => ifds.push(ifd),
          Err(err) => {
            log::warn!("Error while processing TIFF sub-IFD for tag 0x{:X}, ignoring it: {}", tag, err);
          }
        }
      }
      sub.insert(tag, ifds);
    }

    Ok(IFD {
      offset,
      base,
      corr,
      next_ifd: if next_ifd == 0 { 0 } else { apply_corr(next_ifd, corr) },
      entries,
      endian,
      sub,
    })
  }

  /// Insert or replace an entry
  pub fn add_entry(&mut self, entry: Entry) {
    self.entries.insert(entry.tag, entry);
  }

  /// Attach an IFD as SubIFD of `tag`
  pub fn add_sub_ifd(&mut self, tag: impl Into<u16>, ifd: IFD) {
    self.sub.entry(tag.into()).or_default().push(ifd);
  }

  pub fn sub_ifds(&self) -> &HashMap<u16, Vec<IFD>> {
    &self.sub
  }

  pub fn entry_count(&self) -> u16 {
    self.entries.len() as u16
  }

  pub fn get_entry<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    self.entries.get(&tag.into())
  }

  pub fn get_entry_subs<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    self.sub.values().flatten().find_map(|ifd| ifd.get_entry_recursive(tag))
  }

  pub fn get_entry_recursive<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    self.get_entry(tag).or_else(|| self.get_entry_subs(tag))
  }

  pub fn has_entry<T: TiffTag>(&self, tag: T) -> bool {
    self.get_entry(tag).is_some()
  }

  pub fn get_sub_ifd_all<T: TiffTag>(&self, tag: T) -> Option<&Vec<IFD>> {
    self.sub.get(&tag.into())
  }

  pub fn find_ifds_with_tag<T: TiffTag>(&self, tag: T) -> Vec<&IFD> {
    let mut ifds = Vec::new();
    if self.has_entry(tag) {
      ifds.push(self);
    }
    // Now search in all sub IFDs
    for ifd in self.sub.values().flatten() {
      ifds.append(&mut ifd.find_ifds_with_tag(tag));
    }
    ifds
  }

  pub fn find_first_ifd_with_tag<T: TiffTag>(&self, tag: T) -> Option<&IFD> {
    self.find_ifds_with_tag(tag).first().copied()
  }
}

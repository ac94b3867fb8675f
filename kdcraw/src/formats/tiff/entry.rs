// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
  Rational, Result, SRational, TiffAscii, TiffError, Value, apply_corr,
  reader::{EndianReader, ReadByteOrder},
};

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SBYTE: u16 = 6;
const TYPE_UNDEFINED: u16 = 7;
const TYPE_SSHORT: u16 = 8;
const TYPE_SLONG: u16 = 9;
const TYPE_SRATIONAL: u16 = 10;
const TYPE_FLOAT: u16 = 11;
const TYPE_DOUBLE: u16 = 12;
const TYPE_IFD: u16 = 13;

/// Size of a single directory entry on disk
pub(crate) const ENTRY_SIZE: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub tag: u16,
  pub value: Value,
  /// Offset of the value data, relative to the IFD base.
  /// This is only None for entries built in memory.
  pub embedded: Option<u32>,
}

impl std::ops::Deref for Entry {
  type Target = Value;

  fn deref(&self) -> &Self::Target {
    &self.value
  }
}

// 0-1-2-3-4-5-6-7-8-9-10-11-12-13
const DATASHIFTS: [u8; 14] = [0, 0, 0, 1, 2, 3, 0, 0, 1, 2, 3, 2, 3, 2];

impl Entry {
  pub fn new(tag: impl Into<u16>, value: impl Into<Value>) -> Self {
    Self {
      tag: tag.into(),
      value: value.into(),
      embedded: None,
    }
  }

  pub fn count(&self) -> u32 {
    self.value.count() as u32
  }

  /// Returns the offset
  /// It is already corrected by `corr` but needs to be summed
  /// with `base` offset.
  pub fn offset(&self) -> Option<usize> {
    self.embedded.map(|v| v as usize)
  }

  /// Parse the directory entry starting at `pos`. The reader is left
  /// positioned at the following entry, even if parsing fails.
  pub fn parse<R: Read + Seek>(reader: &mut EndianReader<R>, pos: u32, base: u32, corr: i32) -> Result<Entry> {
    let res = Self::parse_at(reader, pos, base, corr);
    reader.goto(pos + ENTRY_SIZE)?;
    res
  }

  fn parse_at<R: Read + Seek>(reader: &mut EndianReader<R>, pos: u32, base: u32, corr: i32) -> Result<Entry> {
    reader.goto(pos)?;
    let tag = reader.read_u16()?;
    let typ = reader.read_u16()?;
    let count = reader.read_u32()?;

    debug!("Tag: {:#x}, Typ: {:#x}, count: {}", tag, typ, count);

    // If we don't know the type assume byte data (undefined)
    let compat_typ = if typ == 0 || typ > TYPE_IFD { TYPE_UNDEFINED } else { typ };

    let bytesize = (count as u64) << DATASHIFTS[compat_typ as usize];
    let offset: u32 = if bytesize <= 4 {
      reader.position()? - base
    } else {
      apply_corr(reader.read_u32()?, corr)
    };

    let data_end = base as u64 + offset as u64 + bytesize;
    let stream_len = reader.stream_len()?;
    if data_end > stream_len {
      return Err(TiffError::Overflow(format!(
        "Tag {:#x} data ({} bytes at {:#x}) exceeds stream length {}",
        tag,
        bytesize,
        base as u64 + offset as u64,
        stream_len
      )));
    }

    reader.goto(base + offset)?;
    let count = count as usize;
    let value = match typ {
      TYPE_BYTE => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Byte(v)
      }
      TYPE_ASCII => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Ascii(TiffAscii::new_from_raw(&v))
      }
      TYPE_SHORT => {
        let mut v = vec![0; count];
        reader.read_u16_into(&mut v)?;
        Value::Short(v)
      }
      TYPE_LONG | TYPE_IFD => {
        let mut v = vec![0; count];
        reader.read_u32_into(&mut v)?;
        Value::Long(v)
      }
      TYPE_RATIONAL => {
        let mut tmp = vec![0; count * 2]; // Rational is 2x u32
        reader.read_u32_into(&mut tmp)?;
        Value::Rational(tmp.chunks_exact(2).map(|p| Rational::new(p[0], p[1])).collect())
      }
      TYPE_SBYTE => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::SByte(v.into_iter().map(|b| b as i8).collect())
      }
      TYPE_UNDEFINED => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Undefined(v)
      }
      TYPE_SSHORT => {
        let mut v = vec![0; count];
        reader.read_u16_into(&mut v)?;
        Value::SShort(v.into_iter().map(|s| s as i16).collect())
      }
      TYPE_SLONG => {
        let mut v = vec![0; count];
        reader.read_u32_into(&mut v)?;
        Value::SLong(v.into_iter().map(|l| l as i32).collect())
      }
      TYPE_SRATIONAL => {
        let mut tmp = vec![0; count * 2]; // SRational is 2x i32
        reader.read_u32_into(&mut tmp)?;
        Value::SRational(tmp.chunks_exact(2).map(|p| SRational::new(p[0] as i32, p[1] as i32)).collect())
      }
      TYPE_FLOAT => {
        let mut v = vec![0.0; count];
        reader.read_f32_into(&mut v)?;
        Value::Float(v)
      }
      TYPE_DOUBLE => {
        let mut v = vec![0.0; count];
        reader.read_f64_into(&mut v)?;
        Value::Double(v)
      }
      x => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Unknown(x, v)
      }
    };
    Ok(Entry {
      tag,
      value,
      embedded: Some(offset),
    })
  }

  pub fn type_name(&self) -> String {
    self.value.value_type_name()
  }
}

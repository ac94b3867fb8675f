// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use thiserror::Error;

pub mod entry;
pub mod file;
pub mod ifd;
pub mod reader;
pub mod value;

pub use entry::Entry;
pub use ifd::IFD;
pub use reader::{GenericTiffReader, TiffReader};
pub use value::{Rational, SRational, TiffAscii, Value};

const TIFF_MAGIC: u16 = 42;

/// Error variants for TIFF parsing
#[derive(Debug, Error)]
pub enum TiffError {
  /// Overflow of input, size constraints...
  #[error("Overflow error: {}", _0)]
  Overflow(String),
  #[error("General error: {}", _0)]
  General(String),
  #[error("Format mismatch: {}", _0)]
  FormatMismatch(String),
  /// Error on internal cursor type
  #[error("I/O error: {:?}", _0)]
  Io(#[from] std::io::Error),
}

/// Result type for TIFF results
pub type Result<T> = std::result::Result<T, TiffError>;

fn apply_corr(offset: u32, corr: i32) -> u32 {
  ((offset as i64) + (corr as i64)) as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tags::TiffCommonTag;

  fn push_entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&typ.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
  }

  /// Big endian TIFF with Make in IFD0 and a Kodak SubIFD holding the width.
  fn kodak_tiff(prefix: usize) -> Vec<u8> {
    let make = b"EASTMAN KODAK COMPANY\0";
    let mut buf = vec![0xAA; prefix];
    buf.extend_from_slice(b"MM\x00\x2a");
    buf.extend_from_slice(&8_u32.to_be_bytes());
    // IFD0 at 8, 2 entries, ends at 38
    buf.extend_from_slice(&2_u16.to_be_bytes());
    push_entry(&mut buf, TiffCommonTag::Make.into(), 2, make.len() as u32, 38);
    push_entry(&mut buf, TiffCommonTag::KodakIFD.into(), 4, 1, 60);
    buf.extend_from_slice(&0_u32.to_be_bytes());
    buf.extend_from_slice(make);
    // Kodak IFD at 60
    buf.extend_from_slice(&1_u16.to_be_bytes());
    push_entry(&mut buf, TiffCommonTag::KdcWidth.into(), 4, 1, 4000);
    buf.extend_from_slice(&0_u32.to_be_bytes());
    buf
  }

  #[test]
  fn parse_big_endian_tree() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let buf = kodak_tiff(0);
    assert!(GenericTiffReader::is_tiff(&buf));
    let tiff = GenericTiffReader::new_with_buffer(&buf, 0, 0, None)?;
    assert!(!tiff.little_endian());
    assert_eq!(tiff.chains().len(), 1);
    let make = tiff.get_entry(TiffCommonTag::Make).ok_or("no make")?;
    assert_eq!(make.get_string()?, "EASTMAN KODAK COMPANY");
    assert!(tiff.get_entry(TiffCommonTag::KdcWidth).is_none());
    let width = tiff.get_entry_recursive(TiffCommonTag::KdcWidth).ok_or("no width")?;
    assert_eq!(width.get_u32(0)?, Some(4000));
    Ok(())
  }

  #[test]
  fn parse_with_base_offset() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let buf = kodak_tiff(3);
    let tiff = GenericTiffReader::new_with_buffer(&buf, 3, 0, None)?;
    assert!(tiff.has_entry(TiffCommonTag::Make));
    assert!(tiff.has_entry_recursive(TiffCommonTag::KdcWidth));
    Ok(())
  }

  #[test]
  fn reject_non_tiff() {
    let buf = b"KDC\x00\x00\x00\x00\x00";
    assert!(!GenericTiffReader::is_tiff(buf));
    assert!(matches!(
      GenericTiffReader::new_with_buffer(buf, 0, 0, None),
      Err(TiffError::FormatMismatch(_))
    ));
  }

  #[test]
  fn corr_is_applied_signed() {
    assert_eq!(apply_corr(100, -10), 90);
    assert_eq!(apply_corr(100, 5), 105);
  }
}

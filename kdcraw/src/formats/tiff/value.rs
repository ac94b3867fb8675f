// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Result, TiffError};

/// Type to represent tiff values of type `RATIONAL`
#[derive(Clone, Debug, Default, PartialEq, Copy, Serialize, Deserialize)]
pub struct Rational {
  pub n: u32,
  pub d: u32,
}

impl Rational {
  pub fn new(n: u32, d: u32) -> Self {
    Self { n, d }
  }
}

/// Type to represent tiff values of type `SRATIONAL`
#[derive(Clone, Debug, Default, PartialEq, Copy, Serialize, Deserialize)]
pub struct SRational {
  pub n: i32,
  pub d: i32,
}

impl SRational {
  pub fn new(n: i32, d: i32) -> Self {
    Self { n, d }
  }
}

impl Display for Rational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl Display for SRational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl From<Rational> for f32 {
  fn from(v: Rational) -> Self {
    (v.n as f32) / (v.d as f32)
  }
}

impl From<SRational> for f32 {
  fn from(v: SRational) -> Self {
    (v.n as f32) / (v.d as f32)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  /// 8-bit unsigned integer
  Byte(Vec<u8>),
  /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
  Ascii(TiffAscii),
  /// 16-bit unsigned integer
  Short(Vec<u16>),
  /// 32-bit unsigned integer
  Long(Vec<u32>),
  /// Fraction stored as two 32-bit unsigned integers
  Rational(Vec<Rational>),
  /// 8-bit signed integer
  SByte(Vec<i8>),
  /// 8-bit byte that may contain anything, depending on the field
  Undefined(Vec<u8>),
  /// 16-bit signed integer
  SShort(Vec<i16>),
  /// 32-bit signed integer
  SLong(Vec<i32>),
  /// Fraction stored as two 32-bit signed integers
  SRational(Vec<SRational>),
  /// 32-bit IEEE floating point
  Float(Vec<f32>),
  /// 64-bit IEEE floating point
  Double(Vec<f64>),
  /// Unknown type, wrapped in u8
  Unknown(u16, Vec<u8>),
}

impl Value {
  pub fn as_string(&self) -> Option<&String> {
    match self {
      Self::Ascii(v) => v.strings().first(),
      _ => None,
    }
  }

  pub fn get_string(&self) -> Result<&String> {
    self
      .as_string()
      .ok_or_else(|| TiffError::FormatMismatch(format!("Can not use get_string() for tiff entry value of type {}", self.value_type_name())))
  }

  /// Integer value at `idx`, `None` if `idx` is out of range.
  pub fn get_u32(&self, idx: usize) -> Result<Option<u32>> {
    match self {
      Value::Byte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Short(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Long(v) => Ok(v.get(idx).map(ToOwned::to_owned)),
      Value::SByte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      Value::SShort(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      Value::SLong(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      _ => Err(TiffError::FormatMismatch(format!("Can not use get_u32() for tiff entry value of type {}", self.value_type_name()))),
    }
  }

  pub fn get_f32(&self, idx: usize) -> Result<Option<f32>> {
    match self {
      Value::Byte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::Short(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::Long(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::Rational(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::SByte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::SShort(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::SLong(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      Value::SRational(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Float(v) => Ok(v.get(idx).map(ToOwned::to_owned)),
      Value::Double(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as f32)),
      _ => Err(TiffError::FormatMismatch(format!("Can not use get_f32() for tiff entry value of type {}", self.value_type_name()))),
    }
  }

  /// Raw byte at `idx`, only defined for byte-like payloads.
  pub fn get_u8(&self, idx: usize) -> Result<Option<u8>> {
    match self {
      Value::Byte(v) | Value::Undefined(v) | Value::Unknown(_, v) => Ok(v.get(idx).copied()),
      _ => Err(TiffError::FormatMismatch(format!("Can not use get_u8() for tiff entry value of type {}", self.value_type_name()))),
    }
  }

  pub fn count(&self) -> usize {
    match self {
      Self::Byte(v) => v.len(),
      Self::Ascii(v) => v.count(),
      Self::Short(v) => v.len(),
      Self::Long(v) => v.len(),
      Self::Rational(v) => v.len(),
      Self::SByte(v) => v.len(),
      Self::Undefined(v) => v.len(),
      Self::SShort(v) => v.len(),
      Self::SLong(v) => v.len(),
      Self::SRational(v) => v.len(),
      Self::Float(v) => v.len(),
      Self::Double(v) => v.len(),
      Self::Unknown(_, v) => v.len(),
    }
  }

  pub fn value_type_name(&self) -> String {
    match self {
      Self::Byte(_) => "BYTE".into(),
      Self::Ascii(_) => "ASCII".into(),
      Self::Short(_) => "SHORT".into(),
      Self::Long(_) => "LONG".into(),
      Self::Rational(_) => "RATIONAL".into(),
      Self::SByte(_) => "SBYTE".into(),
      Self::Undefined(_) => "UNDEF".into(),
      Self::SShort(_) => "SSHORT".into(),
      Self::SLong(_) => "SLONG".into(),
      Self::SRational(_) => "SRATIONAL".into(),
      Self::Float(_) => "FLOAT".into(),
      Self::Double(_) => "DOUBLE".into(),
      Self::Unknown(t, _) => format!("UNKNOWN ({})", t),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TiffAscii {
  strings: Vec<String>,
}

impl TiffAscii {
  pub fn new<T: AsRef<str>>(value: T) -> Self {
    Self {
      strings: vec![String::from(value.as_ref())],
    }
  }

  pub fn strings(&self) -> &Vec<String> {
    &self.strings
  }

  pub fn count(&self) -> usize {
    self.strings.iter().map(|s| s.len() + 1).sum::<usize>()
  }

  /// Only the first NUL terminated string is decoded, as KDC files never
  /// carry multi-string ASCII entries.
  pub fn new_from_raw(raw: &[u8]) -> Self {
    let nul_range_end = raw.iter().position(|&c| c == b'\0').unwrap_or(raw.len());
    let s = String::from_utf8_lossy(&raw[0..nul_range_end]);
    Self { strings: vec![s.into_owned()] }
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::Ascii(TiffAscii::new(value))
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Long(vec![value])
  }
}

impl From<&[u32]> for Value {
  fn from(value: &[u32]) -> Self {
    Value::Long(value.into())
  }
}

impl<const N: usize> From<[u32; N]> for Value {
  fn from(value: [u32; N]) -> Self {
    Value::Long(value.into())
  }
}

impl From<u16> for Value {
  fn from(value: u16) -> Self {
    Value::Short(vec![value])
  }
}

impl<const N: usize> From<[f32; N]> for Value {
  fn from(value: [f32; N]) -> Self {
    Value::Float(value.into())
  }
}

impl From<&[u8]> for Value {
  fn from(value: &[u8]) -> Self {
    Value::Undefined(value.into())
  }
}

// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::Debug;

/// Everything that can be used as key for IFD entries
pub trait TiffTag: Into<u16> + TryFrom<u16> + Copy + Debug {}

impl TiffTag for u16 {}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum TiffCommonTag {
  Compression = 0x0103,
  Make = 0x010F,
  Model = 0x0110,
  SubIFDs = 0x014A,
  KodakWB = 0x0F00,
  KodakIFD = 0x8290,
  ExifIFDPointer = 0x8769,
  KdcWB = 0xFA2A,
  KdcWidth = 0xFD00,
  KdcLength = 0xFD01,
  KdcOffset = 0xFD04,
  /// Pointer to the hidden Kodak IFD, not parsed as regular SubIFD
  KdcIFD = 0xFE00,
}

impl TiffTag for TiffCommonTag {}

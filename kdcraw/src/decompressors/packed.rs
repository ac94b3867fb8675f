// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use multiversion::multiversion;

use crate::decompressors::LineIteratorMut;
use crate::{bits::Endian, decompressors::Decompressor};

/// Decompressor for packed data
pub struct PackedDecompressor {
  bps: u32,
  endian: Endian,
}

impl PackedDecompressor {
  pub fn new(bps: u32, endian: Endian) -> Self {
    Self { bps, endian }
  }

  /// Bytes holding the first `samples` samples of the stream. Rows carry no
  /// padding, so with an odd 12 bit width a row may start inside a byte.
  pub fn packed_len(&self, samples: usize) -> usize {
    (samples * self.bps as usize).div_ceil(8)
  }
}

impl<'a> Decompressor<'a, u16> for PackedDecompressor {
  fn decompress(&self, src: &[u8], skip_rows: usize, lines: impl LineIteratorMut<'a, u16>, line_width: usize) -> std::result::Result<(), String> {
    match (self.endian, self.bps) {
      (Endian::Big, 12) => {
        let needed = self.packed_len((skip_rows + lines.len()) * line_width);
        if src.len() < needed {
          return Err(format!("Packed data too short: needs {} bytes, got {}", needed, src.len()));
        }
        unpack_12be(lines, src, skip_rows, line_width);
      }
      (endian, bps) => return Err(format!("Don't know how to unpack {} bps data in {:?} byte order", bps, endian)),
    }
    Ok(())
  }

  fn available_lines(&self, src: &[u8], line_width: usize) -> usize {
    match (line_width, self.bps as usize) {
      (0, _) | (_, 0) => 0,
      (width, bps) => src.len() * 8 / bps / width,
    }
  }
}

#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "aarch64+neon"))]
fn unpack_12be<'a>(lines: impl LineIteratorMut<'a, u16>, src: &[u8], skip_rows: usize, line_width: usize) {
  for (row, line) in lines.enumerate() {
    let first = (skip_rows + row) * line_width;
    if line_width % 2 == 0 {
      let inb = &src[(first / 2 * 3)..];
      for (o, i) in line.chunks_exact_mut(2).zip(inb.chunks_exact(3)) {
        let g1: u16 = i[0] as u16;
        let g2: u16 = i[1] as u16;
        let g3: u16 = i[2] as u16;

        o[0] = (g1 << 4) | (g2 >> 4);
        o[1] = ((g2 & 0x0f) << 8) | g3;
      }
    } else {
      for (col, o) in line.iter_mut().enumerate() {
        let n = first + col;
        let i = &src[(n / 2 * 3)..];
        *o = if n % 2 == 0 {
          ((i[0] as u16) << 4) | ((i[1] as u16) >> 4)
        } else {
          (((i[1] & 0x0f) as u16) << 8) | i[2] as u16
        };
      }
    }
  }
}

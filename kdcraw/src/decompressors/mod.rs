// SPDX-License-Identifier: LGPL-2.1
// Copyright 2025 Daniel Vogelbacher <daniel@chaospixel.com>

use crate::pixarray::SubPixel;

pub mod packed;

/// Trait for mutable line iterators over image data.
///
/// This trait is implemented for iterators that yield mutable slices of subpixel data.
/// It is used to provide mutable access to each line of an image during decompression.
pub trait LineIteratorMut<'a, T>: Iterator<Item = &'a mut [T]> + ExactSizeIterator
where
  T: SubPixel + 'a,
{
}

impl<'a, T, I> LineIteratorMut<'a, T> for I
where
  I: ExactSizeIterator<Item = &'a mut [T]>,
  T: SubPixel + 'a,
{
}

/// Trait for decompressors handling raw image data.
///
/// Implementors decompress a source byte slice into the provided line buffers.
pub trait Decompressor<'a, T>: Send + Sync
where
  T: SubPixel + 'a,
{
  /// Decompresses the source data into the provided line buffers.
  ///
  /// # Arguments
  /// * `src` - Source byte slice containing compressed image data.
  /// * `skip_rows` - Number of rows to skip before starting decompression.
  /// * `lines` - Mutable iterator over destination lines to write decompressed data.
  /// * `line_width` - The width of each line in pixels.
  ///
  /// # Returns
  /// * `Ok(())` on success.
  /// * `Err(String)` with an error message on failure.
  fn decompress(&self, src: &[u8], skip_rows: usize, lines: impl LineIteratorMut<'a, T>, line_width: usize) -> std::result::Result<(), String>;

  /// Number of complete lines of `line_width` pixels that `src` can provide
  fn available_lines(&self, src: &[u8], line_width: usize) -> usize;
}

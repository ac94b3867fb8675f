// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Debug;

/// Sample types a pixel grid can hold
pub trait SubPixel: Copy + Default + Debug + Send + Sync + 'static {}

impl SubPixel for u16 {}
impl SubPixel for f32 {}

#[derive(Debug, Clone, PartialEq)]
pub struct Pix2D<T> {
  pub width: usize,
  pub height: usize,
  pub data: Vec<T>,
}

pub type PixU16 = Pix2D<u16>;

impl<T> Pix2D<T>
where
  T: SubPixel,
{
  pub fn new(width: usize, height: usize) -> Self {
    let data = vec![T::default(); width * height];
    Self { data, width, height }
  }

  pub fn into_inner(self) -> Vec<T> {
    self.data
  }

  pub fn pixels(&self) -> &[T] {
    &self.data
  }

  pub fn pixel_rows(&self) -> std::slice::ChunksExact<'_, T> {
    self.data.chunks_exact(self.width)
  }

  pub fn pixel_rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, T> {
    self.data.chunks_exact_mut(self.width)
  }

  #[inline(always)]
  pub fn at(&self, row: usize, col: usize) -> &T {
    &self.data[row * self.width + col]
  }
}

impl<T> Default for Pix2D<T>
where
  T: Default,
{
  fn default() -> Self {
    Self {
      width: 0,
      height: 0,
      data: Default::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rows_follow_width() {
    let mut pix = PixU16::new(3, 2);
    pix.pixel_rows_mut().nth(1).into_iter().for_each(|row| row.fill(7));
    assert_eq!(pix.pixels(), &[0, 0, 0, 7, 7, 7]);
    assert_eq!(*pix.at(1, 2), 7);
    assert_eq!(pix.pixel_rows().len(), 2);
  }
}

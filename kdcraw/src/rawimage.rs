// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::debug;

use crate::{RawError, Result, decoders::Camera, pixarray::PixU16};

/// Images we refuse to allocate, no real sensor comes close
const MAX_PIXELS: usize = 500_000_000;
const MAX_DIMENSION: usize = 50_000;

/// A rectangle inside the image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
  pub x: usize,
  pub y: usize,
  pub width: usize,
  pub height: usize,
}

impl Rect {
  /// Build rectangle from borders in [top, right, bottom, left] order
  pub fn new_with_borders(width: usize, height: usize, borders: &[usize; 4]) -> Self {
    Self {
      x: borders[3],
      y: borders[0],
      width: width.saturating_sub(borders[1] + borders[3]),
      height: height.saturating_sub(borders[0] + borders[2]),
    }
  }
}

/// Metadata gathered while decoding, never fatal
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
  /// whitebalance coefficients in RGB order
  pub wb_coeffs: [f32; 3],
  /// non-fatal problems found while decoding
  pub warnings: Vec<String>,
}

impl Default for ImageMetadata {
  fn default() -> Self {
    Self {
      wb_coeffs: [1.0, 1.0, 1.0],
      warnings: Vec::new(),
    }
  }
}

/// All the data needed to process this raw image, including the image data itself as well
/// as all the needed metadata
#[derive(Debug, Clone)]
pub struct RawImage {
  /// Camera definition
  pub camera: Camera,
  /// camera make as encoded in the file
  pub make: String,
  /// camera model as encoded in the file
  pub model: String,
  /// make cleaned up to be consistent and short
  pub clean_make: String,
  /// model cleaned up to be consistent and short
  pub clean_model: String,
  /// width of the full image
  pub width: usize,
  /// height of the full image
  pub height: usize,
  /// number of components per pixel (1 for bayer, 3 for RGB images)
  pub cpp: usize,
  /// Bits per pixel
  pub bps: usize,
  pub whitelevel: u16,
  pub blacklevel: u16,
  /// how much to crop the image to get all the recommended area
  pub crop_area: Option<Rect>,
  /// image data itself, has `width`\*`height`\*`cpp` elements
  pub data: RawImageData,
  pub metadata: ImageMetadata,
}

/// The actual image data, after decoding
#[derive(Debug, Clone, PartialEq)]
pub enum RawImageData {
  /// The most usual u16 output of almost all formats
  Integer(Vec<u16>),
}

impl RawImage {
  #[doc(hidden)]
  pub fn new(cam: Camera, image: PixU16, metadata: ImageMetadata) -> RawImage {
    let (width, height) = (image.width, image.height);
    let crop_area = cam.crop_area.map(|area| Rect::new_with_borders(width, height, &area));
    debug!("New raw image {}x{}, crop: {:?}", width, height, crop_area);

    RawImage {
      make: cam.make.clone(),
      model: cam.model.clone(),
      clean_make: cam.clean_make.clone(),
      clean_model: cam.clean_model.clone(),
      width,
      height,
      cpp: 1,
      bps: cam.bps,
      whitelevel: cam.whitelevel,
      blacklevel: cam.blacklevel,
      crop_area,
      data: RawImageData::Integer(image.into_inner()),
      metadata,
      camera: cam,
    }
  }

  pub fn pixels_u16(&self) -> &[u16] {
    match &self.data {
      RawImageData::Integer(data) => data,
    }
  }

  pub fn wb_coeffs(&self) -> [f32; 3] {
    self.metadata.wb_coeffs
  }

  /// First non-fatal warning, if any
  pub fn warning(&self) -> Option<&str> {
    self.metadata.warnings.first().map(String::as_str)
  }
}

/// Allocate a zeroed pixel grid, refusing absurd dimensions
pub(crate) fn alloc_image(width: usize, height: usize) -> Result<PixU16> {
  if width == 0 || height == 0 {
    return Err(RawError::DecoderFailed(format!("Invalid image size {}x{}", width, height)));
  }
  if width > MAX_DIMENSION || height > MAX_DIMENSION || width.saturating_mul(height) > MAX_PIXELS {
    return Err(RawError::DecoderFailed(format!(
      "Surely there's no such thing as a >500MP or >50000 px wide/tall image ({}x{})",
      width, height
    )));
  }
  Ok(PixU16::new(width, height))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn borders_to_rect() {
    let rect = Rect::new_with_borders(4080, 3070, &[0, 80, 70, 0]);
    assert_eq!(rect, Rect { x: 0, y: 0, width: 4000, height: 3000 });
  }

  #[test]
  fn allocation_guard() {
    assert!(alloc_image(4080, 3070).is_ok());
    assert!(matches!(alloc_image(60_000, 2), Err(RawError::DecoderFailed(_))));
    assert!(matches!(alloc_image(30_000, 30_000), Err(RawError::DecoderFailed(_))));
    assert!(alloc_image(0, 10).is_err());
  }

  #[test]
  fn metadata_defaults_to_neutral_wb() {
    let meta = ImageMetadata::default();
    assert_eq!(meta.wb_coeffs, [1.0, 1.0, 1.0]);
    let img = RawImage::new(Camera::new(), PixU16::new(2, 1), meta);
    assert_eq!(img.warning(), None);
    assert_eq!(img.pixels_u16(), &[0, 0]);
  }
}

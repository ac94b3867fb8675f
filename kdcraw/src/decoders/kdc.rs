// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::{debug, warn};

use crate::RawError;
use crate::Result;
use crate::bits::Endian;
use crate::decoders::*;
use crate::decompressors::Decompressor;
use crate::decompressors::packed::PackedDecompressor;
use crate::formats::tiff::{Entry, GenericTiffReader, IFD, TiffError, TiffReader};
use crate::pixarray::PixU16;
use crate::rawimage::alloc_image;
use crate::rawsource::RawSource;
use crate::tags::TiffCommonTag;

/// Compression code of the packed 12 bit KDC layout
const KDC_COMPRESSION: u32 = 7;
const WIDTH_CORRECTION: usize = 80;
const HEIGHT_CORRECTION: usize = 70;
/// KdcOffset must hold at least this many elements
const OFFSET_MIN_COUNT: usize = 13;
/// The pixel offset is the sum of these two KdcOffset elements
const OFFSET_FIELDS: (usize, usize) = (4, 12);

// Offset hardcoding gotten from dcraw
const EASYSHARE_OFFSET_HINT: &str = "easyshare_offset_hack";
const EASYSHARE_OFFSET_THRESHOLD: u64 = 0x15000;
const EASYSHARE_OFFSET_LOW: u64 = 0x15000;
const EASYSHARE_OFFSET_HIGH: u64 = 0x17000;

/// Known sizes of the KodakWB block
const KODAK_WB_COUNTS: [usize; 2] = [734, 1502];
const KODAK_WB_RED: usize = 148;
const KODAK_WB_BLUE: usize = 150;

pub(crate) const TRUNCATED_WARNING: &str = "Image truncated (file is too short)";

/// Resolved image size and location of the pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdcGeometry {
  pub width: usize,
  pub height: usize,
  pub offset: u64,
}

impl KdcGeometry {
  pub fn resolve<T: TiffReader>(tiff: &T, ctx: &DecodeContext) -> Result<Self> {
    let compression = tiff
      .get_entry_recursive(TiffCommonTag::Compression)
      .ok_or_else(|| RawError::UnsupportedCompression("KDC Decoder: Couldn't find compression setting".to_string()))?;
    match compression.get_u32(0) {
      Ok(Some(KDC_COMPRESSION)) => {}
      Ok(Some(c)) => return Err(RawError::UnsupportedCompression(format!("KDC Decoder: Unsupported compression {}", c))),
      Ok(None) | Err(_) => {
        return Err(RawError::UnsupportedCompression(format!(
          "KDC Decoder: Compression tag has no integer value ({})",
          compression.type_name()
        )));
      }
    }

    let width = geometry_value(tiff, TiffCommonTag::KdcWidth)? + WIDTH_CORRECTION;
    let height = geometry_value(tiff, TiffCommonTag::KdcLength)? + HEIGHT_CORRECTION;

    let offset = tiff
      .get_entry_recursive(TiffCommonTag::KdcOffset)
      .filter(|entry| entry.count() as usize >= OFFSET_MIN_COUNT)
      .ok_or_else(|| RawError::MissingOffset("KDC Decoder: Couldn't find the KDC offset".to_string()))?;
    let mut off = offset_field(offset, OFFSET_FIELDS.0)? + offset_field(offset, OFFSET_FIELDS.1)?;

    if ctx.has_hint(EASYSHARE_OFFSET_HINT) {
      let forced = if off < EASYSHARE_OFFSET_THRESHOLD {
        EASYSHARE_OFFSET_LOW
      } else {
        EASYSHARE_OFFSET_HIGH
      };
      debug!("KDC: {} forces offset {:#x} to {:#x}", EASYSHARE_OFFSET_HINT, off, forced);
      off = forced;
    }

    let size = ctx.file_size();
    if off >= size {
      return Err(RawError::OffsetOutOfBounds { offset: off, size });
    }

    debug!("KDC: geometry {}x{}, pixel data at {:#x}", width, height, off);
    Ok(Self { width, height, offset: off })
  }
}

fn geometry_value<T: TiffReader>(tiff: &T, tag: TiffCommonTag) -> Result<usize> {
  tiff
    .get_entry_recursive(tag)
    .and_then(|entry| entry.get_u32(0).ok().flatten())
    .map(|v| v as usize)
    .ok_or_else(|| RawError::MissingGeometry(format!("KDC Decoder: Unable to retrieve image size, {:?} is missing", tag)))
}

fn offset_field(entry: &Entry, idx: usize) -> Result<u64> {
  entry
    .get_u32(idx)
    .ok()
    .flatten()
    .map(u64::from)
    .ok_or_else(|| RawError::MissingOffset(format!("KDC Decoder: KDC offset element {} is not an integer", idx)))
}

/// Decoder for the Kodak KDC format
#[derive(Debug, Clone)]
pub struct KdcDecoder {
  tiff: GenericTiffReader,
  camera: Camera,
}

impl KdcDecoder {
  pub fn new(tiff: GenericTiffReader, rawloader: &RawLoader) -> Result<KdcDecoder> {
    let camera = Self::check_support(&tiff, rawloader)?;
    Ok(KdcDecoder { tiff, camera })
  }

  /// Look up make and model of the first IFD carrying a model name
  pub fn check_support(tiff: &GenericTiffReader, rawloader: &RawLoader) -> Result<Camera> {
    let ifd = tiff
      .find_first_ifd_with_tag(TiffCommonTag::Model)
      .ok_or_else(|| RawError::Unsupported("KDC Support check: Model name not found".to_string()))?;
    let make = ifd_string(ifd, TiffCommonTag::Make, "Make")?;
    let model = ifd_string(ifd, TiffCommonTag::Model, "Model")?;
    rawloader.check_supported_with_everything(make, model)
  }

  fn decode_pixels(ctx: &DecodeContext, geometry: &KdcGeometry, metadata: &mut ImageMetadata) -> Result<PixU16> {
    let mut image = alloc_image(geometry.width, geometry.height)?;
    let src = ctx
      .file
      .subview_until_eof(geometry.offset)
      .map_err(|e| RawError::with_io_error("KDC pixel data", ctx.file.path(), e))?;

    let decompressor = PackedDecompressor::new(12, Endian::Big);
    let rows = decompressor.available_lines(src, geometry.width).min(geometry.height);
    if rows < geometry.height {
      warn!("KDC: only {} of {} rows available", rows, geometry.height);
      metadata.warnings.push(TRUNCATED_WARNING.to_string());
    }
    decompressor
      .decompress(src, 0, image.pixel_rows_mut().take(rows), geometry.width)
      .map_err(RawError::DecoderFailed)?;
    Ok(image)
  }

  /// Fill white balance coefficients, problems end up as warnings only
  pub fn extract_wb(tiff: &GenericTiffReader, file: &RawSource, metadata: &mut ImageMetadata) {
    // Try the kodak hidden IFD for WB
    if let Some(pointer) = tiff.get_entry_recursive(TiffCommonTag::KdcIFD) {
      match hidden_ifd_wb(pointer, file, tiff.get_endian()) {
        Ok(Some(wb)) => {
          debug!("KDC: WB from hidden IFD: {:?}", wb);
          metadata.wb_coeffs = wb;
        }
        Ok(None) => debug!("KDC: hidden IFD carries no usable WB"),
        Err(err) => {
          warn!("KDC: failed to read hidden IFD: {}", err);
          metadata.warnings.push(format!("KDC hidden IFD: {}", err));
        }
      }
    }

    // Use the normal WB if available, takes precedence
    if let Some(levels) = tiff.get_entry_recursive(TiffCommonTag::KodakWB) {
      if KODAK_WB_COUNTS.contains(&(levels.count() as usize)) {
        match kodak_wb(levels) {
          Ok(wb) => {
            debug!("KDC: WB from KodakWB block: {:?}", wb);
            metadata.wb_coeffs = wb;
          }
          Err(err) => {
            warn!("KDC: ignoring KodakWB block: {}", err);
            metadata.warnings.push(format!("KDC KodakWB: {}", err));
          }
        }
      } else {
        debug!("KDC: KodakWB block with unknown size {}", levels.count());
      }
    }
  }
}

fn ifd_string<'a>(ifd: &'a IFD, tag: TiffCommonTag, name: &str) -> Result<&'a str> {
  ifd
    .get_entry(tag)
    .and_then(|entry| entry.get_string().ok())
    .map(|s| s.trim_end())
    .ok_or_else(|| RawError::Unsupported(format!("KDC Support check: {} name not found", name)))
}

fn hidden_ifd_wb(pointer: &Entry, file: &RawSource, endian: Endian) -> std::result::Result<Option<[f32; 3]>, TiffError> {
  let offset = pointer
    .get_u32(0)?
    .ok_or_else(|| TiffError::General("Hidden IFD pointer is empty".to_string()))?;
  let ifd = IFD::new_hidden(&mut file.reader(), offset, endian)?;
  match ifd.get_entry_recursive(TiffCommonTag::KdcWB) {
    Some(wb) if wb.count() == 3 => {
      let mut coeffs = [0.0; 3];
      for (i, coeff) in coeffs.iter_mut().enumerate() {
        *coeff = wb
          .get_f32(i)?
          .ok_or_else(|| TiffError::General(format!("KdcWB element {} missing", i)))?;
      }
      Ok(Some(coeffs))
    }
    _ => Ok(None),
  }
}

fn kodak_wb(levels: &Entry) -> std::result::Result<[f32; 3], TiffError> {
  let be16 = |pos: usize| -> std::result::Result<u16, TiffError> {
    match (levels.get_u8(pos)?, levels.get_u8(pos + 1)?) {
      (Some(hi), Some(lo)) => Ok(((hi as u16) << 8) | lo as u16),
      _ => Err(TiffError::Overflow(format!("KodakWB byte {} is out of range", pos))),
    }
  };
  Ok([be16(KODAK_WB_RED)? as f32 / 256.0, 1.0, be16(KODAK_WB_BLUE)? as f32 / 256.0])
}

impl Decoder for KdcDecoder {
  fn raw_image(&self, file: &RawSource, params: &RawDecodeParams) -> Result<RawImage> {
    let ctx = DecodeContext::for_camera(file, &self.camera, params);
    let geometry = KdcGeometry::resolve(&self.tiff, &ctx)?;
    let mut metadata = ImageMetadata::default();
    let image = Self::decode_pixels(&ctx, &geometry, &mut metadata)?;
    Self::extract_wb(&self.tiff, file, &mut metadata);
    Ok(RawImage::new(self.camera.clone(), image, metadata))
  }

  fn camera(&self) -> &Camera {
    &self.camera
  }
}

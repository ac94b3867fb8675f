// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Library to extract the raw data and some metadata from Kodak KDC camera
//! raw files. Given a file of a supported camera you will get the unpacked
//! 12 bit sensor data, white balance coefficients and the camera levels.
//!
//! # Example
//! ```rust,no_run
//! let image = kdcraw::decode_file("path/to/image.kdc").expect("decode failed");
//! println!("{}x{} wb: {:?}", image.width, image.height, image.wb_coeffs());
//! if let Some(warning) = image.warning() {
//!   eprintln!("Warning: {}", warning);
//! }
//! ```

#![deny(unstable_features)]

use lazy_static::lazy_static;

pub mod bits;
pub mod decoders;
pub mod decompressors;
mod envparams;
pub mod formats;
pub mod pixarray;
pub mod rawimage;
pub mod rawsource;
pub mod tags;

pub use decoders::Decoder;
pub use decoders::RawDecodeParams;
#[doc(hidden)]
pub use decoders::RawLoader;
pub use rawimage::ImageMetadata;
pub use rawimage::RawImage;
pub use rawimage::RawImageData;
pub use rawsource::RawSource;

use formats::tiff::TiffError;

lazy_static! {
  static ref LOADER: RawLoader = decoders::RawLoader::new();
}

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawError {
  #[error("File is unsupported: {}", _0)]
  Unsupported(String),

  #[error("Unsupported compression: {}", _0)]
  UnsupportedCompression(String),

  #[error("Missing image geometry: {}", _0)]
  MissingGeometry(String),

  #[error("Missing pixel data offset: {}", _0)]
  MissingOffset(String),

  #[error("Pixel data offset {:#x} is out of bounds (file size {})", offset, size)]
  OffsetOutOfBounds { offset: u64, size: u64 },

  #[error("Decoder failed: {}", _0)]
  DecoderFailed(String),

  #[error("{}", _0)]
  General(String),
}

pub type Result<T> = std::result::Result<T, RawError>;

impl RawError {
  pub fn with_io_error(context: impl AsRef<str>, path: impl AsRef<Path>, error: std::io::Error) -> Self {
    Self::General(format!("I/O error in context '{}' on file: {:?}, {}", context.as_ref(), path.as_ref(), error))
  }
}

impl From<TiffError> for RawError {
  fn from(err: TiffError) -> Self {
    Self::General(err.to_string())
  }
}

/// Take a path to a raw file and return a decoded image or an error
///
/// # Example
/// ```rust,ignore
/// let image = match kdcraw::decode_file("path/to/your/file.kdc") {
///   Ok(val) => val,
///   Err(e) => ... some appropriate action when the file is unreadable ...
/// };
/// ```
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<RawImage> {
  LOADER.decode_file(path.as_ref())
}

/// Decode a raw file that is already available as [`RawSource`]
pub fn decode(rawfile: &RawSource, params: &RawDecodeParams) -> Result<RawImage> {
  LOADER.decode(rawfile, params)
}

// Used to force lazy_static initializations. Useful for fuzzing.
#[doc(hidden)]
pub fn force_initialization() {
  lazy_static::initialize(&LOADER);
}

pub fn get_decoder(rawfile: &RawSource) -> Result<Box<dyn Decoder>> {
  LOADER.get_decoder(rawfile)
}

/// MD5 digest over the decoded pixel samples (u16, little endian)
pub fn raw_pixels_digest<P: AsRef<Path>>(path: P) -> Result<md5::Digest> {
  let image = decode_file(path)?;
  Ok(pixels_digest(image.pixels_u16()))
}

pub(crate) fn pixels_digest(pixels: &[u16]) -> md5::Digest {
  let bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
  md5::compute(bytes)
}

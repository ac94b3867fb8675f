// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::debug;
use std::collections::HashMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use toml::Value;

use crate::RawError;
use crate::Result;
use crate::envparams::kdcraw_hints;
use crate::formats::tiff::GenericTiffReader;
use crate::formats::tiff::TiffReader;
use crate::rawsource::RawSource;
use crate::tags::TiffCommonTag;

mod camera;
pub mod kdc;

pub use camera::Camera;
pub use super::rawimage::*;

pub static CAMERAS_TOML: &str = include_str!(concat!(env!("OUT_DIR"), "/cameras.toml"));
pub static SAMPLE: &str = "\nPlease submit samples at https://raw.pixls.us/";
pub static BUG: &str = "\nPlease file a bug with a sample file";

/// Parameters a caller can pass to a decode run
#[derive(Default, Clone, Debug)]
pub struct RawDecodeParams {
  /// Compatibility hint flags added to the ones of the camera definition
  pub hints: Vec<String>,
}

/// Per-file state of a single decode run
#[derive(Debug)]
pub struct DecodeContext<'a> {
  pub file: &'a RawSource,
  pub hints: Vec<String>,
}

impl<'a> DecodeContext<'a> {
  pub fn new(file: &'a RawSource, hints: Vec<String>) -> Self {
    Self { file, hints }
  }

  /// Collect hints from camera definition, caller parameters and environment
  pub fn for_camera(file: &'a RawSource, camera: &Camera, params: &RawDecodeParams) -> Self {
    let mut hints = camera.hints.clone();
    hints.extend(params.hints.iter().cloned());
    hints.extend(kdcraw_hints());
    hints.sort();
    hints.dedup();
    Self::new(file, hints)
  }

  pub fn has_hint(&self, hint: &str) -> bool {
    self.hints.iter().any(|h| h == hint)
  }

  pub fn file_size(&self) -> u64 {
    self.file.size()
  }
}

pub trait Decoder: Send {
  fn raw_image(&self, file: &RawSource, params: &RawDecodeParams) -> Result<RawImage>;

  /// Camera definition the decoder was selected for
  fn camera(&self) -> &Camera;
}

/// The struct that holds all the info about the cameras and is able to decode a file
#[derive(Debug, Clone)]
pub struct RawLoader {
  cameras: HashMap<(String, String), Camera>,
}

impl RawLoader {
  /// Creates a new raw loader using the camera information included in the library
  pub fn new() -> RawLoader {
    match Self::new_with_toml(CAMERAS_TOML) {
      Ok(loader) => loader,
      Err(e) => panic!("Error parsing cameras.toml: {}", e),
    }
  }

  /// Creates a new raw loader from a camera database in TOML format
  pub fn new_with_toml(toml: &str) -> Result<RawLoader> {
    let toml = toml
      .parse::<Value>()
      .map_err(|e| RawError::General(format!("Error parsing camera database: {}", e)))?;

    let mut cams = Vec::new();
    let cameras = toml
      .get("cameras")
      .and_then(Value::as_array)
      .ok_or_else(|| RawError::General("Camera database has no [[cameras]] array".to_string()))?;
    for camera in cameras {
      let ct = camera
        .as_table()
        .ok_or_else(|| RawError::General("Camera definition must be a table".to_string()))?;

      // Start with the basic camera
      let mut cam = Camera::new();
      cam.update_from_toml(ct)?;
      if cam.make.is_empty() || cam.model.is_empty() {
        return Err(RawError::General(format!("Camera definition without make or model: {:?}", cam)));
      }
      // Create a list of alias names including the base one
      let mut camnames = vec![(cam.model.clone(), cam.clean_model.clone())];
      if let Some(val) = ct.get("model_aliases") {
        for alias in val.as_array().into_iter().flatten() {
          match (alias.get(0).and_then(Value::as_str), alias.get(1).and_then(Value::as_str)) {
            (Some(model), Some(clean_model)) => camnames.push((model.to_string(), clean_model.to_string())),
            _ => return Err(RawError::General(format!("Invalid model alias for {}: {}", cam.model, alias))),
          }
        }
      }

      for (model, clean_model) in camnames {
        let mut mcam = cam.clone();
        mcam.model = model;
        mcam.clean_model = clean_model;
        cams.push(mcam);
      }
    }

    let mut map = HashMap::new();
    for cam in cams {
      map.insert((cam.make.clone(), cam.model.clone()), cam);
    }
    debug!("Camera database loaded with {} entries", map.len());

    Ok(RawLoader { cameras: map })
  }

  /// Get list of cameras
  pub fn get_cameras(&self) -> &HashMap<(String, String), Camera> {
    &self.cameras
  }

  /// Returns a decoder for a given buffer
  pub fn get_decoder(&self, rawfile: &RawSource) -> Result<Box<dyn Decoder>> {
    if !GenericTiffReader::is_tiff(rawfile.buf()) {
      return Err(RawError::Unsupported(format!("Couldn't find a decoder for this file.{}", SAMPLE)));
    }
    let tiff = GenericTiffReader::new(&mut rawfile.reader(), 0, 0, None, &[])?;

    macro_rules! use_decoder {
      ($dec:ty, $tiff:ident, $rawdec:ident) => {
        Ok(Box::new(<$dec>::new($tiff, $rawdec)?) as Box<dyn Decoder>)
      };
    }

    match tiff
      .get_entry_recursive(TiffCommonTag::Make)
      .and_then(|entry| entry.value.as_string().map(|s| s.as_str().trim_end()))
    {
      Some("EASTMAN KODAK COMPANY") => use_decoder!(kdc::KdcDecoder, tiff, self),
      Some("Eastman Kodak Company") => use_decoder!(kdc::KdcDecoder, tiff, self),
      Some(make) => Err(RawError::Unsupported(format!("Couldn't find a decoder for make \"{}\".{}", make, SAMPLE))),
      None => Err(RawError::Unsupported(format!("Couldn't find a decoder for this file.{}", SAMPLE))),
    }
  }

  pub fn check_supported_with_everything(&self, make: &str, model: &str) -> Result<Camera> {
    match self.cameras.get(&(make.trim_end().to_string(), model.trim_end().to_string())) {
      Some(cam) if !cam.supported => Err(RawError::Unsupported(format!(
        "Camera \"{}\" \"{}\" is explicitly marked unsupported{}",
        make,
        model,
        cam.remark.as_ref().map(|r| format!(": {}", r)).unwrap_or_default()
      ))),
      Some(cam) => Ok(cam.clone()),
      None => Err(RawError::Unsupported(format!("Couldn't find camera \"{}\" \"{}\".{}", make, model, SAMPLE))),
    }
  }

  fn decode_unsafe(&self, rawfile: &RawSource, params: &RawDecodeParams) -> Result<RawImage> {
    let decoder = self.get_decoder(rawfile)?;
    decoder.raw_image(rawfile, params)
  }

  /// Decodes an input into a RawImage
  pub fn decode(&self, rawfile: &RawSource, params: &RawDecodeParams) -> Result<RawImage> {
    match panic::catch_unwind(AssertUnwindSafe(|| self.decode_unsafe(rawfile, params))) {
      Ok(val) => val,
      Err(_) => Err(RawError::DecoderFailed(format!("Caught a panic while decoding.{}", BUG))),
    }
  }

  /// Decodes a file into a RawImage
  pub fn decode_file(&self, path: &Path) -> Result<RawImage> {
    let rawfile = RawSource::new(path).map_err(|e| RawError::with_io_error("decode_file()", path, e))?;
    self.decode(&rawfile, &RawDecodeParams::default())
  }
}

impl Default for RawLoader {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DB: &str = r#"
[[cameras]]
make = "EASTMAN KODAK COMPANY"
model = "KODAK EASYSHARE Z980 DIGITAL CAMERA"
clean_make = "Kodak"
clean_model = "EasyShare Z980"
model_aliases = [["KODAK EASYSHARE Z981 DIGITAL CAMERA", "EasyShare Z981"]]
hints = ["easyshare_offset_hack"]

[[cameras]]
make = "Eastman Kodak Company"
model = "Kodak DC120 ZOOM Digital Camera"
supported = false
"#;

  #[test]
  fn builtin_database_loads() {
    let loader = RawLoader::new();
    assert!(!loader.get_cameras().is_empty());
    assert!(
      loader
        .check_supported_with_everything("EASTMAN KODAK COMPANY", "KODAK P880 ZOOM DIGITAL CAMERA")
        .is_ok()
    );
  }

  #[test]
  fn lookup_with_aliases() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let loader = RawLoader::new_with_toml(DB)?;
    let cam = loader.check_supported_with_everything("EASTMAN KODAK COMPANY", "KODAK EASYSHARE Z981 DIGITAL CAMERA ")?;
    assert_eq!(cam.clean_model, "EasyShare Z981");
    assert!(cam.find_hint("easyshare_offset_hack"));
    assert!(matches!(
      loader.check_supported_with_everything("EASTMAN KODAK COMPANY", "KODAK DC50"),
      Err(RawError::Unsupported(_))
    ));
    Ok(())
  }

  #[test]
  fn explicitly_unsupported_camera() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let loader = RawLoader::new_with_toml(DB)?;
    match loader.check_supported_with_everything("Eastman Kodak Company", "Kodak DC120 ZOOM Digital Camera") {
      Err(RawError::Unsupported(msg)) => assert!(msg.contains("explicitly marked unsupported")),
      other => panic!("Unexpected result: {:?}", other.map(|c| c.model)),
    }
    Ok(())
  }

  #[test]
  fn invalid_database_rejected() {
    assert!(RawLoader::new_with_toml("cameras = 1").is_err());
    assert!(RawLoader::new_with_toml("[[cameras]]\nmake = \"Kodak\"\n").is_err());
    assert!(RawLoader::new_with_toml("[[cameras]]\nmake = \"Kodak\"\nmodel = \"X\"\nfoo = 1\n").is_err());
  }

  #[test]
  fn decode_context_merges_hints() {
    let file = RawSource::new_from_slice(&[0u8; 16]);
    let mut cam = Camera::new();
    cam.hints = vec!["a".to_string()];
    let params = RawDecodeParams { hints: vec!["b".to_string()] };
    let ctx = DecodeContext::for_camera(&file, &cam, &params);
    assert!(ctx.has_hint("a"));
    assert!(ctx.has_hint("b"));
    assert!(!ctx.has_hint("c"));
    assert_eq!(ctx.file_size(), 16);
  }

  #[test]
  fn non_tiff_is_unsupported() {
    let loader = RawLoader::new();
    let file = RawSource::new_from_slice(b"not a raw file at all");
    assert!(matches!(loader.decode(&file, &RawDecodeParams::default()), Err(RawError::Unsupported(_))));
  }
}

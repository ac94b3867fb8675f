// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use toml::Value;

use crate::{RawError, Result};

/// Contains sanitized information about the raw image's properties
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
  pub make: String,
  pub model: String,
  pub clean_make: String,
  pub clean_model: String,
  pub remark: Option<String>,
  /// Cameras known but not decodable
  pub supported: bool,
  pub whitelevel: u16,
  pub blacklevel: u16,
  // Recommended area relative to sensor size
  pub crop_area: Option<[usize; 4]>,
  pub bps: usize,
  pub hints: Vec<String>,
}

impl Default for Camera {
  fn default() -> Self {
    Self::new()
  }
}

fn as_str<'a>(name: &str, val: &'a Value) -> Result<&'a str> {
  val.as_str().ok_or_else(|| RawError::General(format!("{} must be a string", name)))
}

fn as_int(name: &str, val: &Value) -> Result<i64> {
  val.as_integer().ok_or_else(|| RawError::General(format!("{} must be an integer", name)))
}

fn as_array<'a>(name: &str, val: &'a Value) -> Result<&'a Vec<Value>> {
  val.as_array().ok_or_else(|| RawError::General(format!("{} must be an array", name)))
}

impl Camera {
  pub fn find_hint(&self, hint: &str) -> bool {
    self.hints.iter().any(|h| h == hint)
  }

  pub fn update_from_toml(&mut self, ct: &toml::value::Table) -> Result<()> {
    for (name, val) in ct {
      match name.as_ref() {
        n @ "make" => {
          self.make = as_str(n, val)?.to_string();
        }
        n @ "model" => {
          self.model = as_str(n, val)?.to_string();
        }
        n @ "clean_make" => {
          self.clean_make = as_str(n, val)?.to_string();
        }
        n @ "clean_model" => {
          self.clean_model = as_str(n, val)?.to_string();
        }
        n @ "remark" => {
          self.remark = Some(as_str(n, val)?.to_string());
        }
        n @ "supported" => {
          self.supported = val.as_bool().ok_or_else(|| RawError::General(format!("{} must be a boolean", n)))?;
        }
        n @ "whitepoint" => {
          self.whitelevel = as_int(n, val)? as u16;
        }
        n @ "blackpoint" => {
          self.blacklevel = as_int(n, val)? as u16;
        }
        n @ "crop_area" => {
          let crop_vals = as_array(n, val)?;
          if crop_vals.len() != 4 {
            return Err(RawError::General(format!("{} must have 4 elements", n)));
          }
          let mut crop = [0, 0, 0, 0];
          for (i, val) in crop_vals.iter().enumerate() {
            crop[i] = as_int(n, val)? as usize;
          }
          self.crop_area = Some(crop);
        }
        n @ "bps" => {
          self.bps = as_int(n, val)? as usize;
        }
        n @ "hints" => {
          self.hints = Vec::new();
          for hint in as_array(n, val)? {
            self.hints.push(as_str(n, hint)?.to_string());
          }
        }
        "model_aliases" => {}
        key => {
          return Err(RawError::General(format!("Unknown key: {}", key)));
        }
      }
    }
    if self.clean_make.is_empty() {
      self.clean_make = self.make.clone();
    }
    if self.clean_model.is_empty() {
      self.clean_model = self.model.clone();
    }
    Ok(())
  }

  pub fn new() -> Camera {
    Camera {
      make: "".to_string(),
      model: "".to_string(),
      clean_make: "".to_string(),
      clean_model: "".to_string(),
      remark: None,
      supported: true,
      whitelevel: (1 << 12) - 1,
      blacklevel: 0,
      crop_area: None,
      bps: 12,
      hints: Vec::new(),
    }
  }
}

// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::warn;

/// Nesting depth for SubIFDs if KDCRAW_IFD_MAX_DEPTH is not set
pub(crate) const DEFAULT_IFD_MAX_DEPTH: usize = 4;

/// Additional hint flags, comma separated
pub(crate) fn kdcraw_hints() -> Vec<String> {
  match std::env::var("KDCRAW_HINTS") {
    Ok(value) => parse_hints(&value),
    Err(std::env::VarError::NotUnicode(_)) => {
      warn!("Invalid value for KDCRAW_HINTS");
      Vec::new()
    }
    Err(_) => Vec::new(),
  }
}

pub(crate) fn kdcraw_ifd_max_depth() -> usize {
  match std::env::var("KDCRAW_IFD_MAX_DEPTH").map(|val| val.parse::<usize>()) {
    Ok(Ok(value)) => value,
    Ok(Err(_)) => {
      warn!("Invalid value for KDCRAW_IFD_MAX_DEPTH");
      DEFAULT_IFD_MAX_DEPTH
    }
    Err(_) => DEFAULT_IFD_MAX_DEPTH,
  }
}

fn parse_hints(value: &str) -> Vec<String> {
  value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

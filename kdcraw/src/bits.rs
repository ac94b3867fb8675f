// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
  Big,
  #[default]
  Little,
}

impl Endian {
  #[inline]
  pub fn little(&self) -> bool {
    matches!(*self, Self::Little)
  }
}

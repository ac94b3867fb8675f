// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  fmt::Debug,
  fs::File,
  io::Cursor,
  ops::Deref,
  path::{Path, PathBuf},
  sync::Arc,
};

use md5::Digest;
use memmap2::MmapOptions;

/// Read-only byte source of a single raw file.
///
/// All decoder stages (tag tree parsing, pixel unpacking, hidden IFD parsing)
/// borrow from the same source, it is never copied or mutated.
pub struct RawSource {
  path: PathBuf,
  inner: RawSourceImpl,
}

enum RawSourceImpl {
  Memmap(memmap2::Mmap),
  Memory(Arc<Vec<u8>>),
}

impl RawSource {
  pub fn new(path: &Path) -> std::io::Result<Self> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and we never hand out mutable views.
    let mmap = unsafe { MmapOptions::new().populate().map(&file)? };
    #[cfg(unix)]
    {
      mmap.advise(memmap2::Advice::WillNeed)?;
      mmap.advise(memmap2::Advice::Sequential)?;
    }
    Ok(Self {
      path: path.canonicalize().unwrap_or_else(|_| path.to_owned()),
      inner: RawSourceImpl::Memmap(mmap),
    })
  }

  pub fn new_from_shared_vec(buf: Arc<Vec<u8>>) -> Self {
    Self {
      path: PathBuf::default(),
      inner: RawSourceImpl::Memory(buf),
    }
  }

  pub fn new_from_slice(buf: &[u8]) -> Self {
    Self::new_from_shared_vec(Arc::new(Vec::from(buf)))
  }

  /// Calculate digest for file
  pub fn digest(&self) -> Digest {
    md5::compute(self.buf())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn buf(&self) -> &[u8] {
    self.deref()
  }

  /// Total size of the source in bytes
  pub fn size(&self) -> u64 {
    self.buf().len() as u64
  }

  pub fn subview(&self, offset: u64, size: u64) -> std::io::Result<&[u8]> {
    let end = offset.checked_add(size).unwrap_or(u64::MAX);
    self.buf().get(offset as usize..end as usize).ok_or(std::io::Error::new(
      std::io::ErrorKind::UnexpectedEof,
      format!("subview(): Offset {}+{} is behind EOF", offset, size),
    ))
  }

  pub fn subview_until_eof(&self, offset: u64) -> std::io::Result<&[u8]> {
    self.buf().get(offset as usize..).ok_or(std::io::Error::new(
      std::io::ErrorKind::UnexpectedEof,
      format!("subview_until_eof(): Offset {} is behind EOF", offset),
    ))
  }

  pub fn reader(&self) -> Cursor<&[u8]> {
    Cursor::new(self.buf())
  }
}

impl Deref for RawSource {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    match &self.inner {
      RawSourceImpl::Memmap(mmap) => mmap.deref(),
      RawSourceImpl::Memory(mem) => mem.deref(),
    }
  }
}

impl Debug for RawSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RawSource").field("path", &self.path).field("size", &self.size()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subviews_are_bounds_checked() {
    let src = RawSource::new_from_slice(&[1, 2, 3, 4, 5]);
    assert_eq!(src.size(), 5);
    assert_eq!(src.subview(1, 3).unwrap(), &[2, 3, 4]);
    assert!(src.subview(3, 3).is_err());
    assert!(src.subview(u64::MAX, 2).is_err());
    assert_eq!(src.subview_until_eof(4).unwrap(), &[5]);
    assert!(src.subview_until_eof(6).is_err());
  }

  #[test]
  fn digest_covers_whole_buffer() {
    let src = RawSource::new_from_slice(b"kdc");
    assert_eq!(src.digest(), md5::compute(b"kdc"));
  }
}

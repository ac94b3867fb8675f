// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Writer for synthetic big endian KDC files

#![allow(dead_code)]

pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_UNDEFINED: u16 = 7;
pub const TYPE_FLOAT: u16 = 11;

pub const TAG_COMPRESSION: u16 = 0x0103;
pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_KODAK_WB: u16 = 0x0F00;
pub const TAG_KODAK_IFD: u16 = 0x8290;
pub const TAG_KDC_WB: u16 = 0xFA2A;
pub const TAG_KDC_WIDTH: u16 = 0xFD00;
pub const TAG_KDC_LENGTH: u16 = 0xFD01;
pub const TAG_KDC_OFFSET: u16 = 0xFD04;
pub const TAG_KDC_IFD: u16 = 0xFE00;

pub const P880_MAKE: &str = "EASTMAN KODAK COMPANY";
pub const P880_MODEL: &str = "KODAK P880 ZOOM DIGITAL CAMERA";

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// A directory entry with big endian encoded payload
pub struct RawEntry {
  pub tag: u16,
  pub typ: u16,
  pub count: u32,
  pub data: Vec<u8>,
}

pub fn ascii(tag: u16, s: &str) -> RawEntry {
  let mut data = s.as_bytes().to_vec();
  data.push(0);
  RawEntry {
    tag,
    typ: TYPE_ASCII,
    count: data.len() as u32,
    data,
  }
}

pub fn short(tag: u16, v: u16) -> RawEntry {
  RawEntry {
    tag,
    typ: TYPE_SHORT,
    count: 1,
    data: v.to_be_bytes().to_vec(),
  }
}

pub fn long(tag: u16, vs: &[u32]) -> RawEntry {
  RawEntry {
    tag,
    typ: TYPE_LONG,
    count: vs.len() as u32,
    data: vs.iter().flat_map(|v| v.to_be_bytes()).collect(),
  }
}

pub fn float(tag: u16, vs: &[f32]) -> RawEntry {
  RawEntry {
    tag,
    typ: TYPE_FLOAT,
    count: vs.len() as u32,
    data: vs.iter().flat_map(|v| v.to_be_bytes()).collect(),
  }
}

pub fn undefined(tag: u16, data: Vec<u8>) -> RawEntry {
  RawEntry {
    tag,
    typ: TYPE_UNDEFINED,
    count: data.len() as u32,
    data,
  }
}

/// Big endian TIFF writer, payloads are written before their IFD
pub struct TiffBuilder {
  pub buf: Vec<u8>,
}

impl TiffBuilder {
  pub fn new() -> Self {
    // Root IFD pointer is patched by finish()
    Self {
      buf: b"MM\x00\x2a\x00\x00\x00\x00".to_vec(),
    }
  }

  fn align(&mut self) {
    if self.buf.len() % 2 == 1 {
      self.buf.push(0);
    }
  }

  pub fn pos(&self) -> u32 {
    self.buf.len() as u32
  }

  /// Write an IFD and return its offset
  pub fn write_ifd(&mut self, mut entries: Vec<RawEntry>) -> u32 {
    entries.sort_by_key(|e| e.tag);
    let mut offsets = Vec::new();
    for entry in &entries {
      if entry.data.len() > 4 {
        self.align();
        offsets.push(Some(self.pos()));
        self.buf.extend_from_slice(&entry.data);
      } else {
        offsets.push(None);
      }
    }
    self.align();
    let ifd = self.pos();
    self.buf.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (entry, offset) in entries.iter().zip(offsets) {
      self.buf.extend_from_slice(&entry.tag.to_be_bytes());
      self.buf.extend_from_slice(&entry.typ.to_be_bytes());
      self.buf.extend_from_slice(&entry.count.to_be_bytes());
      match offset {
        Some(offset) => self.buf.extend_from_slice(&offset.to_be_bytes()),
        None => {
          let mut inline = entry.data.clone();
          inline.resize(4, 0);
          self.buf.extend_from_slice(&inline);
        }
      }
    }
    self.buf.extend_from_slice(&0_u32.to_be_bytes());
    ifd
  }

  pub fn finish(mut self, root_ifd: u32) -> Vec<u8> {
    self.buf[4..8].copy_from_slice(&root_ifd.to_be_bytes());
    self.buf
  }
}

/// Description of a synthetic KDC file
pub struct KdcFile {
  pub make: String,
  pub model: String,
  pub compression: u16,
  pub width: u32,
  pub height: u32,
  /// Elements 4 and 12 of KdcOffset
  pub offset_fields: (u32, u32),
  /// Absolute position of the packed pixel data
  pub pixel_pos: usize,
  pub pixels: Vec<u8>,
  pub kodak_wb: Option<Vec<u8>>,
  pub hidden_wb: Option<[f32; 3]>,
  /// Write this value as hidden IFD pointer instead of a real IFD
  pub hidden_ifd_pointer: Option<u32>,
  /// Store Make and Model in the Kodak IFD instead of the root IFD
  pub identity_in_kodak_ifd: bool,
}

impl KdcFile {
  /// P880 file with 82x71 pixels at 0x1000
  pub fn p880() -> Self {
    Self::p880_with_size(2, 1)
  }

  /// P880 file with raw size fields `width` and `height`
  pub fn p880_with_size(width: u32, height: u32) -> Self {
    Self {
      make: P880_MAKE.to_string(),
      model: P880_MODEL.to_string(),
      compression: 7,
      width,
      height,
      offset_fields: (0x0C00, 0x0400),
      pixel_pos: 0x1000,
      pixels: packed_pattern(packed_len((width as usize + 80) * (height as usize + 70))),
      kodak_wb: None,
      hidden_wb: None,
      hidden_ifd_pointer: None,
      identity_in_kodak_ifd: false,
    }
  }

  pub fn image_width(&self) -> usize {
    self.width as usize + 80
  }

  pub fn image_height(&self) -> usize {
    self.height as usize + 70
  }

  pub fn build(&self) -> Vec<u8> {
    let mut tiff = TiffBuilder::new();

    let mut offsets = [0_u32; 13];
    offsets[4] = self.offset_fields.0;
    offsets[12] = self.offset_fields.1;
    let mut kodak = vec![
      long(TAG_KDC_WIDTH, &[self.width]),
      long(TAG_KDC_LENGTH, &[self.height]),
      long(TAG_KDC_OFFSET, &offsets),
    ];
    if let Some(wb) = &self.kodak_wb {
      kodak.push(undefined(TAG_KODAK_WB, wb.clone()));
    }
    match (self.hidden_ifd_pointer, self.hidden_wb) {
      (Some(pointer), _) => kodak.push(long(TAG_KDC_IFD, &[pointer])),
      (None, Some(wb)) => {
        let hidden = tiff.write_ifd(vec![float(TAG_KDC_WB, &wb)]);
        kodak.push(long(TAG_KDC_IFD, &[hidden]));
      }
      (None, None) => {}
    }
    let identity = vec![ascii(TAG_MAKE, &self.make), ascii(TAG_MODEL, &self.model)];
    let mut root = vec![short(TAG_COMPRESSION, self.compression)];
    if self.identity_in_kodak_ifd {
      kodak.extend(identity);
    } else {
      root.extend(identity);
    }
    let kodak_ifd = tiff.write_ifd(kodak);
    root.push(long(TAG_KODAK_IFD, &[kodak_ifd]));
    let root = tiff.write_ifd(root);

    let mut buf = tiff.finish(root);
    assert!(buf.len() <= self.pixel_pos, "pixel data overlaps TIFF structure");
    buf.resize(self.pixel_pos, 0);
    buf.extend_from_slice(&self.pixels);
    buf
  }
}

/// Deterministic pixel bytes
pub fn packed_pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i.wrapping_mul(37) ^ (i >> 3)) as u8).collect()
}

/// KodakWB block with red and blue levels at 148 and 150
pub fn kodak_wb_block(count: usize, red: u16, blue: u16) -> Vec<u8> {
  let mut block = vec![0; count];
  block[148..150].copy_from_slice(&red.to_be_bytes());
  block[150..152].copy_from_slice(&blue.to_be_bytes());
  block
}

/// Bytes needed for `samples` 12 bit samples packed back to back
pub fn packed_len(samples: usize) -> usize {
  (samples * 12).div_ceil(8)
}

/// Reference unpacking of a continuous 12 bit big endian stream, only
/// complete rows are filled
pub fn expected_samples(packed: &[u8], width: usize, height: usize) -> Vec<u16> {
  let rows = (packed.len() * 8 / 12 / width).min(height);
  let mut out = vec![0_u16; width * height];
  for (n, sample) in out.iter_mut().enumerate().take(rows * width) {
    let i = n / 2 * 3;
    *sample = if n % 2 == 0 {
      ((packed[i] as u16) << 4) | ((packed[i + 1] as u16) >> 4)
    } else {
      (((packed[i + 1] & 0x0f) as u16) << 8) | packed[i + 2] as u16
    };
  }
  out
}

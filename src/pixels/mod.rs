//! The pixel row pipeline.
//!
//! Every row of every image, whatever its depth and color type, passes
//! through the same four steps:
//!
//! 1. **init**: [`RowState::new`] works out the pass geometry.
//! 2. **process**: an unfiltered stream row becomes a [`CanonicalRow`], four
//!    channels per pixel, with keyed transparency applied.
//! 3. **store**: the same stream row is unpacked into the object's sample
//!    buffer, one byte per sample (two for 16-bit images).
//! 4. **retrieve**: a stored row becomes a [`CanonicalRow`] again, the same way
//!    `process` would have done it.
//!
//! The strategy for an image is picked once from its [`PixelFormat`].

use bitfrob::u8_replicate_bits;

use crate::{
  interlace::PassGeometry, ColorType, FormatError, PixelFormat, Transparency, RGB8, RGBA16, RGBA8,
};

mod row_state;
pub use row_state::*;

/// A decoded row, always four channels per pixel.
///
/// 16-bit images stay 16-bit, everything else becomes 8-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CanonicalRow {
  Rgba8(Vec<RGBA8>),
  Rgba16(Vec<RGBA16>),
}
impl Default for CanonicalRow {
  #[inline]
  fn default() -> Self {
    Self::Rgba8(Vec::new())
  }
}
impl CanonicalRow {
  /// Pixels in the row.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::Rgba8(v) => v.len(),
      Self::Rgba16(v) => v.len(),
    }
  }

  /// If the row has no pixels.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The pixel at `i`, reduced to 8 bits per channel.
  #[inline]
  #[must_use]
  pub fn get8(&self, i: usize) -> Option<RGBA8> {
    match self {
      Self::Rgba8(v) => v.get(i).copied(),
      Self::Rgba16(v) => v.get(i).map(|p| p.to_rgba8()),
    }
  }

  /// The row as raw bytes, `RGBA` order, 16-bit channels in native endian.
  #[inline]
  #[must_use]
  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    match self {
      Self::Rgba8(v) => bytemuck::cast_slice_mut(v.as_mut_slice()),
      Self::Rgba16(v) => bytemuck::cast_slice_mut(v.as_mut_slice()),
    }
  }

  fn reset(&mut self, wide: bool, width: usize) {
    match (wide, &mut *self) {
      (false, Self::Rgba8(v)) => {
        v.clear();
        v.resize(width, RGBA8::default());
      }
      (true, Self::Rgba16(v)) => {
        v.clear();
        v.resize(width, RGBA16::default());
      }
      (false, _) => *self = Self::Rgba8(vec![RGBA8::default(); width]),
      (true, _) => *self = Self::Rgba16(vec![RGBA16::default(); width]),
    }
  }
}

/// The palette and transparency that rows are resolved with.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowColors<'a> {
  /// The palette, for indexed images.
  pub palette: &'a [RGB8],
  /// The image's transparency, if any.
  pub trns: Option<&'a Transparency>,
}

/// How samples sit in a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Packing {
  /// 1, 2, or 4 bits, leftmost sample in the high bits.
  Packed(u8),
  /// One byte per sample.
  Byte,
  /// Two big-endian bytes per sample.
  Wide,
}
impl Packing {
  #[inline]
  fn sample(self, data: &[u8], index: usize) -> u16 {
    match self {
      Self::Packed(depth) => {
        let depth = usize::from(depth);
        let bit = index * depth;
        let byte = data.get(bit / 8).copied().unwrap_or(0);
        let shift = 8 - depth - (bit % 8);
        u16::from((byte >> shift) & ((1 << depth) - 1) as u8)
      }
      Self::Byte => u16::from(data.get(index).copied().unwrap_or(0)),
      Self::Wide => {
        let i = index * 2;
        match data.get(i..i + 2) {
          Some([hi, lo]) => u16::from_be_bytes([*hi, *lo]),
          _ => 0,
        }
      }
    }
  }
}

/// The per-format row strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RowStrategy {
  Gray { depth: u8 },
  Rgb { depth: u8 },
  Indexed { depth: u8 },
  GrayAlpha { depth: u8 },
  Rgba { depth: u8 },
}
impl RowStrategy {
  /// Picks the strategy for a format.
  #[inline]
  #[must_use]
  pub const fn for_format(format: PixelFormat) -> Self {
    let depth = format.bits_per_channel();
    match format.color_type() {
      ColorType::Y => Self::Gray { depth },
      ColorType::RGB => Self::Rgb { depth },
      ColorType::Index => Self::Indexed { depth },
      ColorType::YA => Self::GrayAlpha { depth },
      ColorType::RGBA => Self::Rgba { depth },
    }
  }

  /// Bits per sample.
  #[inline]
  #[must_use]
  pub const fn depth(self) -> u8 {
    match self {
      Self::Gray { depth }
      | Self::Rgb { depth }
      | Self::Indexed { depth }
      | Self::GrayAlpha { depth }
      | Self::Rgba { depth } => depth,
    }
  }

  /// Samples per pixel.
  #[inline]
  #[must_use]
  pub const fn channels(self) -> usize {
    match self {
      Self::Gray { .. } | Self::Indexed { .. } => 1,
      Self::GrayAlpha { .. } => 2,
      Self::Rgb { .. } => 3,
      Self::Rgba { .. } => 4,
    }
  }

  /// If canonical rows come out 16 bits per channel.
  #[inline]
  #[must_use]
  pub const fn is_wide(self) -> bool {
    self.depth() == 16
  }

  /// Bytes per pixel in an object's sample buffer.
  #[inline]
  #[must_use]
  pub const fn stored_bytes_per_pixel(self) -> usize {
    self.channels() * if self.is_wide() { 2 } else { 1 }
  }

  #[inline]
  const fn stream_packing(self) -> Packing {
    match self.depth() {
      16 => Packing::Wide,
      8 => Packing::Byte,
      d => Packing::Packed(d),
    }
  }

  #[inline]
  const fn stored_packing(self) -> Packing {
    if self.is_wide() {
      Packing::Wide
    } else {
      Packing::Byte
    }
  }

  /// Turns an unfiltered stream row of `width` pixels into canonical form.
  ///
  /// Returns if every pixel of the row is fully opaque.
  #[inline]
  pub fn process(
    self, raw: &[u8], width: usize, colors: RowColors<'_>, out: &mut CanonicalRow,
  ) -> Result<bool, FormatError> {
    self.to_canonical(raw, self.stream_packing(), width, colors, out)
  }

  /// Turns a stored row back into canonical form.
  ///
  /// Palette indexes are checked against the palette here too, since a
  /// palette can be replaced after the pixels were stored.
  #[inline]
  pub fn retrieve(
    self, stored: &[u8], width: usize, colors: RowColors<'_>, out: &mut CanonicalRow,
  ) -> Result<bool, FormatError> {
    self.to_canonical(stored, self.stored_packing(), width, colors, out)
  }

  /// Unpacks an unfiltered stream row into a sample buffer.
  ///
  /// * `buffer` is the whole sample buffer of an image `full_width` wide.
  /// * `pass` and `reduced_y` say which full-image pixels the row covers.
  pub fn store(
    self, raw: &[u8], pass: &PassGeometry, reduced_y: u32, full_width: u32, buffer: &mut [u8],
  ) {
    let channels = self.channels();
    let bpp = self.stored_bytes_per_pixel();
    let packing = self.stream_packing();
    for rx in 0..pass.width {
      let (x, y) = pass.full_pos(rx, reduced_y);
      let dst_start = (y as usize * full_width as usize + x as usize) * bpp;
      let Some(dst) = buffer.get_mut(dst_start..dst_start + bpp) else { return };
      for c in 0..channels {
        let v = packing.sample(raw, rx as usize * channels + c);
        if self.is_wide() {
          dst[c * 2..c * 2 + 2].copy_from_slice(&v.to_be_bytes());
        } else {
          dst[c] = v as u8;
        }
      }
    }
  }

  fn to_canonical(
    self, data: &[u8], packing: Packing, width: usize, colors: RowColors<'_>,
    out: &mut CanonicalRow,
  ) -> Result<bool, FormatError> {
    let wide = self.is_wide();
    out.reset(wide, width);
    let depth = self.depth();
    let scale8 = |v: u16| -> u8 {
      match depth {
        8 => v as u8,
        d => u8_replicate_bits(u32::from(d), v as u8),
      }
    };
    let mut opaque = true;
    match (self, out) {
      (Self::Indexed { .. }, CanonicalRow::Rgba8(px)) => {
        let alphas: &[u8] = match colors.trns {
          Some(Transparency::Alphas(a)) => a,
          _ => &[],
        };
        for (i, p) in px.iter_mut().enumerate() {
          let index = usize::from(packing.sample(data, i));
          let rgb = *colors.palette.get(index).ok_or(FormatError::PLTEIndexError)?;
          let a = alphas.get(index).copied().unwrap_or(u8::MAX);
          opaque &= a == u8::MAX;
          *p = RGBA8::from_rgb(rgb, a);
        }
      }
      (Self::Gray { .. }, CanonicalRow::Rgba8(px)) => {
        let key = match colors.trns {
          Some(Transparency::Y(k)) => Some(*k),
          _ => None,
        };
        for (i, p) in px.iter_mut().enumerate() {
          let v = packing.sample(data, i);
          let a = if key == Some(v) { 0 } else { u8::MAX };
          opaque &= a == u8::MAX;
          let y = scale8(v);
          *p = RGBA8 { r: y, g: y, b: y, a };
        }
      }
      (Self::Rgb { .. }, CanonicalRow::Rgba8(px)) => {
        let key = match colors.trns {
          Some(Transparency::RGB(k)) => Some(*k),
          _ => None,
        };
        for (i, p) in px.iter_mut().enumerate() {
          let rgb = [packing.sample(data, i * 3), packing.sample(data, i * 3 + 1), packing.sample(data, i * 3 + 2)];
          let a = if key == Some(rgb) { 0 } else { u8::MAX };
          opaque &= a == u8::MAX;
          *p = RGBA8 { r: rgb[0] as u8, g: rgb[1] as u8, b: rgb[2] as u8, a };
        }
      }
      (Self::GrayAlpha { .. }, CanonicalRow::Rgba8(px)) => {
        for (i, p) in px.iter_mut().enumerate() {
          let y = packing.sample(data, i * 2) as u8;
          let a = packing.sample(data, i * 2 + 1) as u8;
          opaque &= a == u8::MAX;
          *p = RGBA8 { r: y, g: y, b: y, a };
        }
      }
      (Self::Rgba { .. }, CanonicalRow::Rgba8(px)) => {
        for (i, p) in px.iter_mut().enumerate() {
          let s = |c: usize| packing.sample(data, i * 4 + c) as u8;
          let a = s(3);
          opaque &= a == u8::MAX;
          *p = RGBA8 { r: s(0), g: s(1), b: s(2), a };
        }
      }
      (Self::Gray { .. }, CanonicalRow::Rgba16(px)) => {
        let key = match colors.trns {
          Some(Transparency::Y(k)) => Some(*k),
          _ => None,
        };
        for (i, p) in px.iter_mut().enumerate() {
          let y = packing.sample(data, i);
          let a = if key == Some(y) { 0 } else { u16::MAX };
          opaque &= a == u16::MAX;
          *p = RGBA16 { r: y, g: y, b: y, a };
        }
      }
      (Self::Rgb { .. }, CanonicalRow::Rgba16(px)) => {
        let key = match colors.trns {
          Some(Transparency::RGB(k)) => Some(*k),
          _ => None,
        };
        for (i, p) in px.iter_mut().enumerate() {
          let rgb = [packing.sample(data, i * 3), packing.sample(data, i * 3 + 1), packing.sample(data, i * 3 + 2)];
          let a = if key == Some(rgb) { 0 } else { u16::MAX };
          opaque &= a == u16::MAX;
          *p = RGBA16 { r: rgb[0], g: rgb[1], b: rgb[2], a };
        }
      }
      (Self::GrayAlpha { .. }, CanonicalRow::Rgba16(px)) => {
        for (i, p) in px.iter_mut().enumerate() {
          let y = packing.sample(data, i * 2);
          let a = packing.sample(data, i * 2 + 1);
          opaque &= a == u16::MAX;
          *p = RGBA16 { r: y, g: y, b: y, a };
        }
      }
      (Self::Rgba { .. }, CanonicalRow::Rgba16(px)) => {
        for (i, p) in px.iter_mut().enumerate() {
          let s = |c: usize| packing.sample(data, i * 4 + c);
          let a = s(3);
          opaque &= a == u16::MAX;
          *p = RGBA16 { r: s(0), g: s(1), b: s(2), a };
        }
      }
      // indexed images are never 16-bit
      (Self::Indexed { .. }, CanonicalRow::Rgba16(_)) => return Err(FormatError::InvalidBitdepth),
    }
    Ok(opaque)
  }
}

/// Fills a sample buffer with one color, the way a `BASI` image starts out.
///
/// `rgb` and `alpha` are in the image's own sample depth. Gray images use the
/// red value, indexed images use it as the index.
pub fn fill_samples(strategy: RowStrategy, rgb: [u16; 3], alpha: Option<u16>, buffer: &mut [u8]) {
  let max = if strategy.is_wide() { u16::MAX } else { (1_u16 << strategy.depth()) - 1 };
  let alpha = alpha.unwrap_or(max);
  let sample: Vec<u16> = match strategy {
    RowStrategy::Gray { .. } | RowStrategy::Indexed { .. } => vec![rgb[0]],
    RowStrategy::GrayAlpha { .. } => vec![rgb[0], alpha],
    RowStrategy::Rgb { .. } => rgb.to_vec(),
    RowStrategy::Rgba { .. } => vec![rgb[0], rgb[1], rgb[2], alpha],
  };
  let bytes: Vec<u8> = if strategy.is_wide() {
    sample.iter().flat_map(|v| v.to_be_bytes()).collect()
  } else {
    sample.iter().map(|&v| v.min(max) as u8).collect()
  };
  for px in buffer.chunks_exact_mut(bytes.len()) {
    px.copy_from_slice(&bytes);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_process_packed_gray() {
    let s = RowStrategy::for_format(PixelFormat::Y2);
    let mut out = CanonicalRow::default();
    let opaque = s.process(&[0b00_01_10_11], 4, RowColors::default(), &mut out).unwrap();
    assert!(opaque);
    let ys: Vec<u8> = (0..4).map(|i| out.get8(i).unwrap().r).collect();
    assert_eq!(ys, [0x00, 0x55, 0xAA, 0xFF]);
  }

  #[test]
  fn test_gray_key_transparency() {
    let s = RowStrategy::for_format(PixelFormat::Y4);
    let trns = Transparency::Y(3);
    let colors = RowColors { palette: &[], trns: Some(&trns) };
    let mut out = CanonicalRow::default();
    let opaque = s.process(&[0x3F], 2, colors, &mut out).unwrap();
    assert!(!opaque);
    assert_eq!(out.get8(0).unwrap().a, 0);
    assert_eq!(out.get8(1).unwrap().a, 255);
  }

  #[test]
  fn test_palette_index_error_on_retrieve() {
    let s = RowStrategy::for_format(PixelFormat::I8);
    let palette = [RGB8 { r: 1, g: 2, b: 3 }, RGB8 { r: 4, g: 5, b: 6 }];
    let colors = RowColors { palette: &palette, trns: None };
    let mut out = CanonicalRow::default();
    assert_eq!(s.retrieve(&[0, 1], 2, colors, &mut out), Ok(true));
    for bad in [2_u8, 3, 200, 255] {
      assert_eq!(s.retrieve(&[0, bad], 2, colors, &mut out), Err(FormatError::PLTEIndexError));
    }
  }

  #[test]
  fn test_store_then_retrieve_matches_process() {
    let s = RowStrategy::for_format(PixelFormat::I4);
    let palette: Vec<RGB8> = (0..16).map(|i| RGB8 { r: i, g: i * 2, b: i * 3 }).collect();
    let trns = Transparency::Alphas(vec![0, 128]);
    let colors = RowColors { palette: &palette, trns: Some(&trns) };
    let raw = [0x01, 0x2F, 0xE0];
    let pass = PassGeometry::new(0, 5, 1);
    let mut buffer = vec![0_u8; 5];
    s.store(&raw, &pass, 0, 5, &mut buffer);
    assert_eq!(buffer, [0, 1, 2, 15, 14]);
    let mut a = CanonicalRow::default();
    let mut b = CanonicalRow::default();
    s.process(&raw, 5, colors, &mut a).unwrap();
    s.retrieve(&buffer, 5, colors, &mut b).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.get8(1).unwrap().a, 128);
  }

  #[test]
  fn test_fill_samples() {
    let mut buf = vec![0_u8; 8];
    fill_samples(RowStrategy::for_format(PixelFormat::YA16), [0x1234, 0, 0], None, &mut buf);
    assert_eq!(buf, [0x12, 0x34, 0xFF, 0xFF, 0x12, 0x34, 0xFF, 0xFF]);
  }
}

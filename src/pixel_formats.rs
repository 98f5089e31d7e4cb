//! Module for pixel formats.
//!
//! There's two main factors with a pixel format:
//! * **Channels:** generally one or more of red, green, blue, and alpha. Some
//!   formats only use gray, marked as "Y" in format names. Indexed formats
//!   store a palette index, marked as "I".
//! * **Bit Depth:** how many bits per channel. PNG, and so also MNG, uses the
//!   same depth for every channel of a pixel.
//!
//! Decoded rows always end up as one of the two canonical row types,
//! [`RGBA8`] or [`RGBA16`], no matter what the stored format was.

use bytemuck::{Pod, Zeroable};

/// An RGB value, 8-bits per channel.
///
/// This is the palette entry type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// An 8-bits per channel RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8 {
  /// Fully opaque black.
  pub const OPAQUE_BLACK: Self = Self { r: 0, g: 0, b: 0, a: 255 };

  /// Makes an opaque pixel from a palette entry.
  #[inline]
  #[must_use]
  pub const fn from_rgb(rgb: RGB8, a: u8) -> Self {
    Self { r: rgb.r, g: rgb.g, b: rgb.b, a }
  }
}

/// A 16-bits per channel RGBA pixel, in native endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA16 {
  pub r: u16,
  pub g: u16,
  pub b: u16,
  pub a: u16,
}
impl RGBA16 {
  /// Keeps the high byte of each channel.
  #[inline]
  #[must_use]
  pub const fn to_rgba8(self) -> RGBA8 {
    RGBA8 {
      r: (self.r >> 8) as u8,
      g: (self.g >> 8) as u8,
      b: (self.b >> 8) as u8,
      a: (self.a >> 8) as u8,
    }
  }
}

unsafe impl Zeroable for RGB8 {}
unsafe impl Zeroable for RGBA8 {}
unsafe impl Zeroable for RGBA16 {}
//
unsafe impl Pod for RGB8 {}
unsafe impl Pod for RGBA8 {}
unsafe impl Pod for RGBA16 {}

/// The color types of PNG style images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl ColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// If the color type carries its own alpha channel.
  #[inline]
  #[must_use]
  pub const fn has_alpha(self) -> bool {
    matches!(self, Self::YA | Self::RGBA)
  }
}
impl TryFrom<u8> for ColorType {
  type Error = ();
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => ColorType::Y,
      2 => ColorType::RGB,
      3 => ColorType::Index,
      4 => ColorType::YA,
      6 => ColorType::RGBA,
      _ => return Err(()),
    })
  }
}

/// The pixel formats allowed in a PNG style image.
///
/// This combines a channel ordering with a bit depth per channel.
///
/// * The Greyscale (`Y`) and Indexed (`I`) formats allow for pixels that are
///   only 1, 2, or 4 bits each. In this case, the pixels are tightly packed
///   into bytes, with the left-most pixel being the highest bits of the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum PixelFormat {
  Y1,
  Y2,
  Y4,
  Y8,
  Y16,
  RGB8,
  RGB16,
  I1,
  I2,
  I4,
  I8,
  YA8,
  YA16,
  RGBA8,
  RGBA16,
}
impl PixelFormat {
  /// Combines a bit depth and color type, if that pair is legal.
  #[inline]
  #[must_use]
  pub const fn from_depth_and_type(bit_depth: u8, color_type: ColorType) -> Option<Self> {
    Some(match (bit_depth, color_type) {
      (1, ColorType::Y) => Self::Y1,
      (2, ColorType::Y) => Self::Y2,
      (4, ColorType::Y) => Self::Y4,
      (8, ColorType::Y) => Self::Y8,
      (16, ColorType::Y) => Self::Y16,
      (8, ColorType::RGB) => Self::RGB8,
      (16, ColorType::RGB) => Self::RGB16,
      (1, ColorType::Index) => Self::I1,
      (2, ColorType::Index) => Self::I2,
      (4, ColorType::Index) => Self::I4,
      (8, ColorType::Index) => Self::I8,
      (8, ColorType::YA) => Self::YA8,
      (16, ColorType::YA) => Self::YA16,
      (8, ColorType::RGBA) => Self::RGBA8,
      (16, ColorType::RGBA) => Self::RGBA16,
      _ => return None,
    })
  }

  /// Bits in each channel.
  #[inline]
  #[must_use]
  pub const fn bits_per_channel(self) -> u8 {
    match self {
      Self::Y1 | Self::I1 => 1,
      Self::Y2 | Self::I2 => 2,
      Self::Y4 | Self::I4 => 4,
      Self::Y8 | Self::I8 | Self::RGB8 | Self::YA8 | Self::RGBA8 => 8,
      Self::Y16 | Self::RGB16 | Self::YA16 | Self::RGBA16 => 16,
    }
  }

  /// The color type half of the format.
  #[inline]
  #[must_use]
  pub const fn color_type(self) -> ColorType {
    match self {
      Self::Y1 | Self::Y2 | Self::Y4 | Self::Y8 | Self::Y16 => ColorType::Y,
      Self::RGB8 | Self::RGB16 => ColorType::RGB,
      Self::I1 | Self::I2 | Self::I4 | Self::I8 => ColorType::Index,
      Self::YA8 | Self::YA16 => ColorType::YA,
      Self::RGBA8 | Self::RGBA16 => ColorType::RGBA,
    }
  }

  /// Bits per full pixel.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(self) -> usize {
    (self.bits_per_channel() as usize) * self.color_type().channel_count()
  }

  /// The "bytes per pixel" that the row filters step by, never less than 1.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(self) -> usize {
    let bpp = self.bits_per_pixel() / 8;
    if bpp == 0 {
      1
    } else {
      bpp
    }
  }

  /// Bytes for a scanline of `width` pixels, without the filter byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(self, width: u32) -> usize {
    let bits = self.bits_per_pixel() * (width as usize);
    (bits / 8) + ((bits % 8 != 0) as usize)
  }

  /// Bytes that one pixel takes in an object's sample buffer.
  ///
  /// Stored samples get a full byte each even when the stream packs them.
  #[inline]
  #[must_use]
  pub const fn stored_bytes_per_pixel(self) -> usize {
    let per_channel = if self.bits_per_channel() == 16 { 2 } else { 1 };
    per_channel * self.color_type().channel_count()
  }

  /// If canonical rows for this format are 16 bits per channel.
  #[inline]
  #[must_use]
  pub const fn is_16bit(self) -> bool {
    self.bits_per_channel() == 16
  }
}

#[test]
fn test_bytes_per_scanline() {
  assert_eq!(PixelFormat::Y1.bytes_per_scanline(9), 2);
  assert_eq!(PixelFormat::I2.bytes_per_scanline(5), 2);
  assert_eq!(PixelFormat::Y4.bytes_per_scanline(3), 2);
  assert_eq!(PixelFormat::RGB16.bytes_per_scanline(3), 18);
  assert_eq!(PixelFormat::YA8.filter_chunk_size(), 2);
  assert_eq!(PixelFormat::I4.filter_chunk_size(), 1);
  assert_eq!(PixelFormat::RGBA16.filter_chunk_size(), 8);
}

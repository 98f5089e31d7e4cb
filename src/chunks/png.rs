use super::*;

/// Image header, shared by `IHDR` and the first 13 bytes of `BASI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHeader {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bit depth and color type together
  pub format: PixelFormat,
  /// The MNG-only filter method 64: rows also carry intrapixel differencing.
  pub intrapixel: bool,
  /// if the image data is stored Adam7 interlaced.
  pub interlaced: bool,
}
impl ImageHeader {
  /// Parses and checks the 13 header bytes.
  ///
  /// The checks run in stream field order, so the first bad field decides the
  /// error. `allow_intrapixel` is for images embedded in an MNG, where filter
  /// method 64 is also legal.
  pub fn parse(data: &[u8], allow_intrapixel: bool) -> Result<Self, FormatError> {
    let [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression, filter, interlace] =
      *data
    else {
      return Err(FormatError::InvalidLength);
    };
    let width = u32::from_be_bytes([w0, w1, w2, w3]);
    let height = u32::from_be_bytes([h0, h1, h2, h3]);
    if width == 0 || height == 0 || width > (i32::MAX as u32) || height > (i32::MAX as u32) {
      return Err(FormatError::InvalidFieldValue);
    }
    if !matches!(bit_depth, 1 | 2 | 4 | 8 | 16) {
      return Err(FormatError::InvalidBitdepth);
    }
    let color_type = ColorType::try_from(color_type).map_err(|_| FormatError::InvalidColortype)?;
    let format =
      PixelFormat::from_depth_and_type(bit_depth, color_type).ok_or(FormatError::InvalidBitdepth)?;
    if compression != 0 {
      return Err(FormatError::InvalidCompress);
    }
    let intrapixel = match filter {
      0 => false,
      64 if allow_intrapixel => true,
      _ => return Err(FormatError::InvalidFilter),
    };
    let interlaced = match interlace {
      0 => false,
      1 => true,
      _ => return Err(FormatError::InvalidInterlace),
    };
    Ok(Self { width, height, format, intrapixel, interlaced })
  }

  /// Gets the buffer size needed to hold the whole decompressed image.
  #[must_use]
  pub fn zlib_decompression_requirement(&self) -> usize {
    let bytes_for = |width: u32, height: u32| -> usize {
      if width == 0 || height == 0 {
        0
      } else {
        (self.format.bytes_per_scanline(width) + 1).saturating_mul(height as usize)
      }
    };
    if self.interlaced {
      crate::interlace::reduced_image_dimensions(self.width, self.height)
        .into_iter()
        .skip(1)
        .fold(0_usize, |total, (w, h)| total.saturating_add(bytes_for(w, h)))
    } else {
      bytes_for(self.width, self.height)
    }
  }
}

/// Transparency data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transparency {
  /// The greyscale value that is transparent.
  Y(u16),
  /// The RGB value that is transparent.
  RGB([u16; 3]),
  /// Alpha for each palette index. Missing entries are fully opaque.
  Alphas(Vec<u8>),
  /// A global chunk, which only gets a meaning once an image picks it up.
  Raw(Vec<u8>),
}
impl Transparency {
  /// Interprets raw transparency bytes for an image of the given color type.
  ///
  /// `palette_len` bounds the number of alpha entries for indexed images.
  pub fn for_color_type(
    data: &[u8], color_type: ColorType, palette_len: usize,
  ) -> Result<Self, FormatError> {
    match color_type {
      ColorType::Y => match *data {
        [y0, y1] => Ok(Self::Y(u16::from_be_bytes([y0, y1]))),
        _ => Err(FormatError::InvalidLength),
      },
      ColorType::RGB => match *data {
        [r0, r1, g0, g1, b0, b1] => Ok(Self::RGB([
          u16::from_be_bytes([r0, r1]),
          u16::from_be_bytes([g0, g1]),
          u16::from_be_bytes([b0, b1]),
        ])),
        _ => Err(FormatError::InvalidLength),
      },
      ColorType::Index => {
        if data.len() > 256 || data.len() > palette_len {
          Err(FormatError::InvalidLength)
        } else {
          Ok(Self::Alphas(data.to_vec()))
        }
      }
      ColorType::YA | ColorType::RGBA => Err(FormatError::ChunkNotAllowed),
    }
  }

  /// The raw bytes as they'd appear in a chunk.
  #[must_use]
  pub fn to_bytes(&self) -> Vec<u8> {
    match self {
      Self::Y(y) => y.to_be_bytes().to_vec(),
      Self::RGB(rgb) => rgb.iter().flat_map(|c| c.to_be_bytes()).collect(),
      Self::Alphas(v) | Self::Raw(v) => v.clone(),
    }
  }
}

/// Primary chromaticities and white point, each value times 100,000.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Chromaticities {
  pub white_x: u32,
  pub white_y: u32,
  pub red_x: u32,
  pub red_y: u32,
  pub green_x: u32,
  pub green_y: u32,
  pub blue_x: u32,
  pub blue_y: u32,
}
impl TryFrom<&[u8]> for Chromaticities {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() != 32 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self {
      white_x: u32_be_at(data, 0),
      white_y: u32_be_at(data, 4),
      red_x: u32_be_at(data, 8),
      red_y: u32_be_at(data, 12),
      green_x: u32_be_at(data, 16),
      green_y: u32_be_at(data, 20),
      blue_x: u32_be_at(data, 24),
      blue_y: u32_be_at(data, 28),
    })
  }
}

/// An embedded ICC profile, already decompressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IccProfile {
  /// The profile name (Latin-1).
  pub name: String,
  /// The profile bytes.
  pub profile: Vec<u8>,
}

/// Background color.
///
/// RGB and Greyscale colors are always given as `u16` values. The actual color
/// selected should stay within the bit depth range of the rest of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Background {
  Y { y: u16 },
  RGB { r: u16, g: u16, b: u16 },
  Index { i: u8 },
}
impl TryFrom<&[u8]> for Background {
  type Error = FormatError;
  #[inline]
  fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
    Ok(match *slice {
      [y0, y1] => Background::Y { y: u16::from_be_bytes([y0, y1]) },
      [r0, r1, g0, g1, b0, b1] => Background::RGB {
        r: u16::from_be_bytes([r0, r1]),
        g: u16::from_be_bytes([g0, g1]),
        b: u16::from_be_bytes([b0, b1]),
      },
      [i] => Background::Index { i },
      _ => return Err(FormatError::InvalidLength),
    })
  }
}
impl Background {
  /// The payload length this color type uses for `bKGD`.
  #[inline]
  #[must_use]
  pub const fn expected_len(color_type: ColorType) -> usize {
    match color_type {
      ColorType::Index => 1,
      ColorType::Y | ColorType::YA => 2,
      ColorType::RGB | ColorType::RGBA => 6,
    }
  }

  /// Resolves the color to 8-bit RGB for filling a canvas.
  ///
  /// `bit_depth` scales gray and RGB values, a palette resolves an index.
  #[must_use]
  pub fn to_rgb8(self, bit_depth: u8, palette: &[RGB8]) -> RGB8 {
    let scale = |v: u16| -> u8 {
      match bit_depth {
        16 => (v >> 8) as u8,
        8 => v as u8,
        d => bitfrob::u8_replicate_bits(d as u32, v as u8),
      }
    };
    match self {
      Self::Y { y } => {
        let y = scale(y);
        RGB8 { r: y, g: y, b: y }
      }
      Self::RGB { r, g, b } => RGB8 { r: scale(r), g: scale(g), b: scale(b) },
      Self::Index { i } => palette.get(i as usize).copied().unwrap_or_default(),
    }
  }
}

/// The flavor of a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
  /// `tEXt`
  Plain,
  /// `zTXt`
  Compressed,
  /// `iTXt`
  International,
}
impl TextKind {
  /// The chunk tag for this kind.
  #[inline]
  #[must_use]
  pub const fn tag(self) -> ChunkTag {
    match self {
      Self::Plain => ChunkTag::tEXt,
      Self::Compressed => ChunkTag::zTXt,
      Self::International => ChunkTag::iTXt,
    }
  }
}

/// Text from any of the three text chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextChunk {
  /// Which chunk carried the text.
  pub kind: TextKind,
  /// Keyword (Latin-1).
  pub keyword: String,
  /// Text, decompressed when needed.
  pub text: String,
  /// `iTXt` only: language tag.
  pub language: String,
  /// `iTXt` only: keyword translated into the language.
  pub translation: String,
}

/// Physical pixel dimensions (`pHYs`, or the global `pHYg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct PhysicalDims {
  pub ppu_x: u32,
  pub ppu_y: u32,
  pub is_meters: bool,
}
impl TryFrom<&[u8]> for PhysicalDims {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    match *data {
      [_, _, _, _, _, _, _, _, unit @ (0 | 1)] => Ok(Self {
        ppu_x: u32_be_at(data, 0),
        ppu_y: u32_be_at(data, 4),
        is_meters: unit == 1,
      }),
      [_, _, _, _, _, _, _, _, _] => Err(FormatError::InvalidFieldValue),
      _ => Err(FormatError::InvalidLength),
    }
  }
}

/// Suggested palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestedPalette {
  /// Palette name (Latin-1).
  pub name: String,
  /// 8 or 16.
  pub sample_depth: u8,
  /// Entries, each 6 or 10 bytes depending on the sample depth.
  pub entries: Vec<u8>,
}
impl TryFrom<&[u8]> for SuggestedPalette {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let (name, rest) = split_keyword(data)?;
    let (sample_depth, entries) = try_pull_u8(rest)?;
    let entry_size = match sample_depth {
      8 => 6,
      16 => 10,
      _ => return Err(FormatError::InvalidBitdepth),
    };
    if entries.len() % entry_size != 0 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self { name: latin1_to_string(name), sample_depth, entries: entries.to_vec() })
  }
}

/// Image last-modification time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Time {
  pub year: u16,
  pub month: u8,
  pub day: u8,
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
}
impl TryFrom<&[u8]> for Time {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    match *data {
      [y0, y1, month, day, hour, minute, second] => {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60 {
          return Err(FormatError::InvalidFieldValue);
        }
        Ok(Self { year: u16::from_be_bytes([y0, y1]), month, day, hour, minute, second })
      }
      _ => Err(FormatError::InvalidLength),
    }
  }
}

#[test]
fn test_image_header_field_order() {
  let mut ihdr = [0, 0, 0, 4, 0, 0, 0, 4, 8, 6, 0, 0, 0];
  assert_eq!(ImageHeader::parse(&ihdr, false).unwrap().format, PixelFormat::RGBA8);
  ihdr[8] = 4;
  assert_eq!(ImageHeader::parse(&ihdr, false), Err(FormatError::InvalidBitdepth));
  ihdr[8] = 8;
  ihdr[9] = 5;
  assert_eq!(ImageHeader::parse(&ihdr, false), Err(FormatError::InvalidColortype));
  ihdr[9] = 6;
  ihdr[10] = 1;
  assert_eq!(ImageHeader::parse(&ihdr, false), Err(FormatError::InvalidCompress));
  ihdr[10] = 0;
  ihdr[11] = 64;
  assert_eq!(ImageHeader::parse(&ihdr, false), Err(FormatError::InvalidFilter));
  assert!(ImageHeader::parse(&ihdr, true).unwrap().intrapixel);
  ihdr[11] = 0;
  ihdr[12] = 2;
  assert_eq!(ImageHeader::parse(&ihdr, false), Err(FormatError::InvalidInterlace));
  assert_eq!(ImageHeader::parse(&ihdr[..12], false), Err(FormatError::InvalidLength));
}

#[test]
fn test_transparency_for_color_type() {
  assert_eq!(Transparency::for_color_type(&[0, 7], ColorType::Y, 0), Ok(Transparency::Y(7)));
  assert_eq!(
    Transparency::for_color_type(&[0, 1, 0, 2, 0, 3], ColorType::RGB, 0),
    Ok(Transparency::RGB([1, 2, 3]))
  );
  assert_eq!(
    Transparency::for_color_type(&[1, 2, 3], ColorType::Index, 2),
    Err(FormatError::InvalidLength)
  );
  assert_eq!(
    Transparency::for_color_type(&[1, 2], ColorType::RGBA, 0),
    Err(FormatError::ChunkNotAllowed)
  );
}

//! JNG and Delta-PNG headers.
//!
//! These are checked and kept, but the images they describe aren't decoded.

use super::*;

/// JNG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct JHDR {
  pub width: u32,
  pub height: u32,
  /// 8: gray, 10: color, 12: gray+alpha, 14: color+alpha.
  pub color_type: u8,
  /// 8, 12, or 20 (8 and 12 in one stream).
  pub sample_depth: u8,
  pub progressive: bool,
  pub alpha_depth: u8,
  /// 0: zlib alpha (PNG style), 8: JPEG alpha.
  pub alpha_compression: u8,
}
impl TryFrom<&[u8]> for JHDR {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() != 16 {
      return Err(FormatError::InvalidLength);
    }
    let width = u32_be_at(data, 0);
    let height = u32_be_at(data, 4);
    if width == 0 || height == 0 {
      return Err(FormatError::InvalidFieldValue);
    }
    let [color_type, sample_depth, compression, interlace, alpha_depth, alpha_compression, alpha_filter, alpha_interlace] =
      [data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15]];
    if !matches!(color_type, 8 | 10 | 12 | 14) {
      return Err(FormatError::InvalidColortype);
    }
    if !matches!(sample_depth, 8 | 12 | 20) {
      return Err(FormatError::InvalidBitdepth);
    }
    if compression != 8 {
      return Err(FormatError::InvalidCompress);
    }
    let progressive = match interlace {
      0 => false,
      8 => true,
      _ => return Err(FormatError::InvalidInterlace),
    };
    let has_alpha = color_type >= 12;
    if has_alpha {
      if !matches!(alpha_depth, 1 | 2 | 4 | 8 | 16) {
        return Err(FormatError::InvalidBitdepth);
      }
      if !matches!(alpha_compression, 0 | 8) {
        return Err(FormatError::InvalidCompress);
      }
      if alpha_compression == 8 && alpha_depth != 8 {
        return Err(FormatError::InvalidBitdepth);
      }
    } else if alpha_depth != 0 || alpha_compression != 0 {
      return Err(FormatError::InvalidBitdepth);
    }
    if alpha_filter != 0 {
      return Err(FormatError::InvalidFilter);
    }
    if alpha_interlace != 0 {
      return Err(FormatError::InvalidInterlace);
    }
    Ok(Self { width, height, color_type, sample_depth, progressive, alpha_depth, alpha_compression })
  }
}

/// Delta-PNG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct DHDR {
  pub object_id: u16,
  /// 0: unspecified, 1: PNG, 2: JNG.
  pub image_type: u8,
  /// 0 to 7: full replace, add, pixel replace, alpha add/replace, color
  /// add/replace, no change.
  pub delta_type: u8,
  pub block_size: Option<(u32, u32)>,
  pub block_location: Option<(u32, u32)>,
}
impl TryFrom<&[u8]> for DHDR {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if !matches!(data.len(), 4 | 12 | 20) {
      return Err(FormatError::InvalidLength);
    }
    let image_type = data[2];
    let delta_type = data[3];
    if image_type > 2 || delta_type > 7 {
      return Err(FormatError::InvalidFieldValue);
    }
    Ok(Self {
      object_id: u16_be_at(data, 0),
      image_type,
      delta_type,
      block_size: (data.len() >= 12).then(|| (u32_be_at(data, 4), u32_be_at(data, 8))),
      block_location: (data.len() >= 20).then(|| (u32_be_at(data, 12), u32_be_at(data, 16))),
    })
  }
}

/// Promote an object's color type or depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct PROM {
  pub color_type: ColorType,
  pub sample_depth: u8,
  /// 0: left-bit replication, 1: zero fill.
  pub filling_method: u8,
}
impl TryFrom<&[u8]> for PROM {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    match *data {
      [color_type, sample_depth, filling_method] => {
        let color_type = ColorType::try_from(color_type).map_err(|_| FormatError::InvalidColortype)?;
        PixelFormat::from_depth_and_type(sample_depth, color_type).ok_or(FormatError::InvalidBitdepth)?;
        if filling_method > 1 {
          return Err(FormatError::InvalidFieldValue);
        }
        Ok(Self { color_type, sample_depth, filling_method })
      }
      _ => Err(FormatError::InvalidLength),
    }
  }
}

/// Palette delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct PPLT {
  /// 0/1: rgb replace/add, 2/3: alpha replace/add, 4/5: rgba replace/add.
  pub delta_type: u8,
  /// (first index, last index, entry bytes)
  pub groups: Vec<(u8, u8, Vec<u8>)>,
}
impl TryFrom<&[u8]> for PPLT {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let (delta_type, mut rest) = try_pull_u8(data)?;
    let entry_size = match delta_type {
      0 | 1 => 3,
      2 | 3 => 1,
      4 | 5 => 4,
      _ => return Err(FormatError::InvalidFieldValue),
    };
    let mut groups = Vec::new();
    while !rest.is_empty() {
      let (first, r) = try_pull_u8(rest)?;
      let (last, r) = try_pull_u8(r)?;
      if last < first {
        return Err(FormatError::InvalidFieldValue);
      }
      let n = (usize::from(last - first) + 1) * entry_size;
      if r.len() < n {
        return Err(FormatError::InvalidLength);
      }
      groups.push((first, last, r[..n].to_vec()));
      rest = &r[n..];
    }
    Ok(Self { delta_type, groups })
  }
}

/// Drop text chunks by keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct DBYK {
  pub tag: ChunkTag,
  /// 0: drop the listed keywords, 1: drop all others.
  pub polarity: u8,
  pub keywords: Vec<String>,
}
impl TryFrom<&[u8]> for DBYK {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let (tag, rest) = try_pull_byte_array::<4>(data)?;
    let (polarity, rest) = try_pull_u8(rest)?;
    if polarity > 1 {
      return Err(FormatError::InvalidFieldValue);
    }
    if rest.is_empty() {
      return Err(FormatError::InvalidLength);
    }
    let keywords = rest.split(|&u| u == 0).map(latin1_to_string).collect();
    Ok(Self { tag: ChunkTag(tag), polarity, keywords })
  }
}

#[test]
fn test_jhdr_checks() {
  let mut jhdr = [0, 0, 0, 1, 0, 0, 0, 1, 10, 8, 8, 0, 0, 0, 0, 0];
  assert!(JHDR::try_from(&jhdr[..]).is_ok());
  jhdr[8] = 9;
  assert_eq!(JHDR::try_from(&jhdr[..]), Err(FormatError::InvalidColortype));
  jhdr[8] = 14;
  assert_eq!(JHDR::try_from(&jhdr[..]), Err(FormatError::InvalidBitdepth));
  jhdr[12] = 8;
  assert!(JHDR::try_from(&jhdr[..]).is_ok());
}

#[test]
fn test_pplt_groups() {
  let p = PPLT::try_from(&[2, 0, 1, 10, 20, 5, 5, 30][..]).unwrap();
  assert_eq!(p.groups, [(0, 1, std::vec![10, 20]), (5, 5, std::vec![30])]);
  assert_eq!(PPLT::try_from(&[0, 0, 1, 1, 2, 3][..]), Err(FormatError::InvalidLength));
}

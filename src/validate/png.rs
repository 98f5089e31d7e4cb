//! Rules for the PNG chunks, which can also appear inside MNG and JNG images.

use super::scope::{check_pre_palette, resolve, ScopeRules};
use crate::{
  context::{ActiveHeader, ProcessContext},
  inflate::inflate_buffer,
  latin1_to_string, split_keyword, Background, Chromaticities, Chunk, ColorType, Config,
  FormatError, IccProfile, ImageHeader, MngResult, PhysicalDims, RenderingIntent,
  SuggestedPalette, TextChunk, TextKind, Time, Transparency, RGB8,
};

/// Splits at the first null byte. Unlike a keyword the front may be empty.
fn split_nul(bytes: &[u8]) -> Result<(&[u8], &[u8]), FormatError> {
  let nul = bytes.iter().position(|&u| u == 0).ok_or(FormatError::NullNotFound)?;
  Ok((&bytes[..nul], &bytes[nul + 1..]))
}

/// Only compression method 0 (zlib) exists.
fn inflate_method0(method: u8, data: &[u8], config: &Config) -> MngResult<Vec<u8>> {
  if method != 0 {
    return Err(FormatError::InvalidCompress.into());
  }
  inflate_buffer(data, data.len().saturating_mul(4), config.inflate_limit)
}

pub(super) fn ihdr(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.active.is_active() {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::IHDR(ImageHeader::parse(data, ctx.is_mng())?))
}

fn parse_palette(data: &[u8]) -> Result<Vec<RGB8>, FormatError> {
  if data.len() % 3 != 0 || data.len() > 768 {
    return Err(FormatError::InvalidLength);
  }
  Ok(data.chunks_exact(3).map(|c| RGB8 { r: c[0], g: c[1], b: c[2] }).collect())
}

pub(super) fn plte(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if data.len() % 3 != 0 || data.len() > 768 {
    return Err(FormatError::InvalidLength);
  }
  let mut max_entries = 256;
  match &ctx.active {
    ActiveHeader::Jng(_) => return Err(FormatError::ChunkNotAllowed),
    ActiveHeader::None => (),
    active => {
      let l = &ctx.local;
      if l.has_idat || l.has_trns || l.has_bkgd || l.has_hist {
        return Err(FormatError::SequenceError);
      }
      if l.has_plte {
        return Err(FormatError::MultipleError);
      }
      if let Some(h) = active.image_header() {
        match h.format.color_type() {
          ColorType::Y | ColorType::YA => return Err(FormatError::ChunkNotAllowed),
          ColorType::Index => max_entries = 1 << h.format.bits_per_channel(),
          ColorType::RGB | ColorType::RGBA => (),
        }
      }
    }
  }
  let global = (!ctx.globals.palette.is_empty()).then_some(&ctx.globals.palette);
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global,
      parse_global: parse_palette,
      parse_local: |d: &[u8]| {
        let p = parse_palette(d)?;
        if p.len() > max_entries {
          return Err(FormatError::InvalidLength);
        }
        Ok(p)
      },
      fit_global: |g: &Vec<RGB8>| {
        if g.len() > max_entries {
          return Err(FormatError::GlobalLengthErr);
        }
        Ok(g.clone())
      },
    },
  )?;
  Ok(Chunk::PLTE(scoped))
}

pub(super) fn trns(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let palette_len = ctx.local_colors.palette.len();
  let color_type = match &ctx.active {
    ActiveHeader::Jng(_) => return Err(FormatError::ChunkNotAllowed),
    ActiveHeader::None => {
      if data.len() > 256 {
        return Err(FormatError::InvalidLength);
      }
      None
    }
    active => {
      let l = &ctx.local;
      if l.has_idat {
        return Err(FormatError::SequenceError);
      }
      if l.has_trns {
        return Err(FormatError::MultipleError);
      }
      let ct = active.color_type();
      match ct {
        Some(ColorType::YA | ColorType::RGBA) => return Err(FormatError::ChunkNotAllowed),
        Some(ColorType::Index) if !l.has_plte => return Err(FormatError::PLTEMissing),
        _ => (),
      }
      ct
    }
  };
  let interpret = |d: &[u8]| match color_type {
    Some(ct) => Transparency::for_color_type(d, ct, palette_len),
    None => Ok(Transparency::Raw(d.to_vec())),
  };
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.trns.as_ref(),
      parse_global: |d: &[u8]| Ok(Transparency::Raw(d.to_vec())),
      parse_local: interpret,
      fit_global: |g: &Transparency| interpret(&g.to_bytes()),
    },
  )?;
  Ok(Chunk::tRNS(scoped))
}

fn parse_gamma(data: &[u8]) -> Result<u32, FormatError> {
  match *data {
    [a, b, c, d] => match u32::from_be_bytes([a, b, c, d]) {
      0 => Err(FormatError::InvalidFieldValue),
      g => Ok(g),
    },
    _ => Err(FormatError::InvalidLength),
  }
}

pub(super) fn gama(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  check_pre_palette(ctx, ctx.local.has_gama)?;
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.gamma.as_ref(),
      parse_global: parse_gamma,
      parse_local: parse_gamma,
      fit_global: |g: &u32| Ok(*g),
    },
  )?;
  Ok(Chunk::gAMA(scoped))
}

pub(super) fn chrm(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  check_pre_palette(ctx, ctx.local.has_chrm)?;
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.chrm.as_ref(),
      parse_global: |d: &[u8]| Chromaticities::try_from(d),
      parse_local: |d: &[u8]| Chromaticities::try_from(d),
      fit_global: |g: &Chromaticities| Ok(*g),
    },
  )?;
  Ok(Chunk::cHRM(scoped))
}

fn parse_intent(data: &[u8]) -> Result<RenderingIntent, FormatError> {
  match *data {
    [u] => RenderingIntent::try_from(u),
    _ => Err(FormatError::InvalidLength),
  }
}

pub(super) fn srgb(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  check_pre_palette(ctx, ctx.local.has_srgb)?;
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.srgb.as_ref(),
      parse_global: parse_intent,
      parse_local: parse_intent,
      fit_global: |g: &RenderingIntent| Ok(*g),
    },
  )?;
  Ok(Chunk::sRGB(scoped))
}

pub(super) fn iccp(ctx: &ProcessContext, data: &[u8], config: &Config) -> MngResult<Chunk> {
  check_pre_palette(ctx, ctx.local.has_iccp)?;
  // the profile is inflated up front, resolve only sees the result
  let profile = if data.is_empty() {
    None
  } else {
    let (name, rest) = split_keyword(data)?;
    let [method, compressed @ ..] = rest else { return Err(FormatError::InvalidLength.into()) };
    let profile = inflate_method0(*method, compressed, config)?;
    Some(IccProfile { name: latin1_to_string(name), profile })
  };
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.iccp.as_ref(),
      parse_global: |_: &[u8]| profile.clone().ok_or(FormatError::InvalidLength),
      parse_local: |_: &[u8]| profile.clone().ok_or(FormatError::InvalidLength),
      fit_global: |g: &IccProfile| Ok(g.clone()),
    },
  )?;
  Ok(Chunk::iCCP(scoped))
}

pub(super) fn bkgd(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let palette_len = ctx.local_colors.palette.len();
  let color_type = match &ctx.active {
    ActiveHeader::None => {
      if !data.is_empty() && data.len() != 6 {
        return Err(FormatError::InvalidLength);
      }
      None
    }
    active => {
      let l = &ctx.local;
      if l.has_idat || l.has_jdat {
        return Err(FormatError::SequenceError);
      }
      if l.has_bkgd {
        return Err(FormatError::MultipleError);
      }
      let ct = active.color_type();
      if ct == Some(ColorType::Index) && !l.has_plte {
        return Err(FormatError::PLTEMissing);
      }
      ct
    }
  };
  let parse_local = |d: &[u8]| {
    if let Some(ct) = color_type {
      if d.len() != Background::expected_len(ct) {
        return Err(FormatError::InvalidLength);
      }
    }
    let bg = Background::try_from(d)?;
    if let Background::Index { i } = bg {
      if usize::from(i) >= palette_len {
        return Err(FormatError::InvalidFieldValue);
      }
    }
    Ok(bg)
  };
  let scoped = resolve(
    ctx,
    data,
    ScopeRules {
      global: ctx.globals.bkgd.as_ref(),
      parse_global: |d: &[u8]| Background::try_from(d),
      parse_local,
      fit_global: |g: &Background| Ok(*g),
    },
  )?;
  Ok(Chunk::bKGD(scoped))
}

pub(super) fn idat(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  match &ctx.active {
    ActiveHeader::None => return Err(FormatError::SequenceError),
    ActiveHeader::Jng(j) if j.alpha_compression != 0 || j.alpha_depth == 0 => {
      return Err(FormatError::ChunkNotAllowed)
    }
    ActiveHeader::Png(h) | ActiveHeader::Basi(h) => {
      if h.format.color_type() == ColorType::Index && !ctx.local.has_plte {
        return Err(FormatError::PLTEMissing);
      }
    }
    _ => (),
  }
  Ok(Chunk::IDAT(data.to_vec()))
}

pub(super) fn iend(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if !data.is_empty() {
    return Err(FormatError::InvalidLength);
  }
  match &ctx.active {
    ActiveHeader::None => Err(FormatError::SequenceError),
    ActiveHeader::Png(_) if !ctx.local.has_idat => Err(FormatError::IDATMissing),
    ActiveHeader::Jng(_) if !ctx.local.has_jdat => Err(FormatError::IDATMissing),
    _ => Ok(Chunk::IEND),
  }
}

pub(super) fn text(kind: TextKind, data: &[u8], config: &Config) -> MngResult<Chunk> {
  let (keyword, rest) = split_keyword(data)?;
  let keyword = latin1_to_string(keyword);
  let chunk = match kind {
    TextKind::Plain => TextChunk {
      kind,
      keyword,
      text: latin1_to_string(rest),
      language: String::new(),
      translation: String::new(),
    },
    TextKind::Compressed => {
      let [method, compressed @ ..] = rest else { return Err(FormatError::InvalidLength.into()) };
      let text = inflate_method0(*method, compressed, config)?;
      TextChunk {
        kind,
        keyword,
        text: latin1_to_string(&text),
        language: String::new(),
        translation: String::new(),
      }
    }
    TextKind::International => {
      let [flag, method, rest @ ..] = rest else { return Err(FormatError::InvalidLength.into()) };
      let (language, rest) = split_nul(rest)?;
      let (translation, rest) = split_nul(rest)?;
      let text = match flag {
        0 => rest.to_vec(),
        1 => inflate_method0(*method, rest, config)?,
        _ => return Err(FormatError::InvalidFieldValue.into()),
      };
      TextChunk {
        kind,
        keyword,
        text: String::from(core::str::from_utf8(&text)?),
        language: latin1_to_string(language),
        translation: String::from(core::str::from_utf8(translation)?),
      }
    }
  };
  Ok(Chunk::Text(chunk))
}

pub(super) fn phys(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::pHYs(PhysicalDims::try_from(data)?))
}

pub(super) fn sbit(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let ct = ctx.active.color_type().ok_or(FormatError::ChunkNotAllowed)?;
  let l = &ctx.local;
  if l.has_plte || l.has_idat || l.has_jdat {
    return Err(FormatError::SequenceError);
  }
  if l.has_sbit {
    return Err(FormatError::MultipleError);
  }
  let expected = match ct {
    ColorType::Y => 1,
    ColorType::YA => 2,
    ColorType::RGB | ColorType::Index => 3,
    ColorType::RGBA => 4,
  };
  if data.len() != expected {
    return Err(FormatError::InvalidLength);
  }
  let depth = match ct {
    ColorType::Index => 8,
    _ => ctx.active.bit_depth().unwrap_or(8),
  };
  if data.iter().any(|&b| b == 0 || b > depth) {
    return Err(FormatError::InvalidFieldValue);
  }
  Ok(Chunk::sBIT(data.to_vec()))
}

pub(super) fn splt(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.local.has_idat {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::sPLT(SuggestedPalette::try_from(data)?))
}

pub(super) fn hist(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.active.image_header().is_none() {
    return Err(FormatError::ChunkNotAllowed);
  }
  let l = &ctx.local;
  if !l.has_plte {
    return Err(FormatError::PLTEMissing);
  }
  if l.has_idat {
    return Err(FormatError::SequenceError);
  }
  if l.has_hist {
    return Err(FormatError::MultipleError);
  }
  if data.len() != ctx.local_colors.palette.len() * 2 {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::hIST(data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect()))
}

pub(super) fn time(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::tIME(Time::try_from(data)?))
}

//! Rules for the MNG-only chunks.

use crate::{
  context::ProcessContext, latin1_to_string, Chunk, CloneKind, FormatError, MngError, PhysicalDims,
  Unsupported, BACK, BASI, CLIP, CLON, DEFI, EXPI, FPRI, FRAM, LOOP, MAGN, MHDR, MOVE, PAST,
  SAVE, SHOW, TERM,
};

/// `nEED` keywords this decoder satisfies, besides the chunk names it knows.
const NEED_KEYWORDS: &[&str] =
  &["draft 99", "draft 100", "MNG-1.0", "MNG-1.1", "MNG-LC", "MNG-VLC", "CACHEOFF"];

pub(super) fn mhdr(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.mhdr.is_some() {
    return Err(FormatError::MultipleError);
  }
  Ok(Chunk::MHDR(MHDR::try_from(data)?))
}

pub(super) fn mend(data: &[u8]) -> Result<Chunk, FormatError> {
  if !data.is_empty() {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::MEND)
}

pub(super) fn loop_(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::LOOP(LOOP::try_from(data)?))
}

pub(super) fn endl(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let [level] = *data else { return Err(FormatError::InvalidLength) };
  if !ctx.loop_levels.contains(&level) {
    return Err(FormatError::NoMatchingLoop);
  }
  Ok(Chunk::ENDL(level))
}

pub(super) fn defi(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::DEFI(DEFI::try_from(data)?))
}

pub(super) fn basi(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::BASI(BASI::try_from(data)?))
}

/// Object ids are checked as of the first pass. `CLON`s replayed by a `LOOP`
/// are checked again when displayed.
pub(super) fn clon(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let clon = CLON::try_from(data)?;
  if clon.clone == 0 || clon.clone == clon.source {
    return Err(FormatError::InvalidFieldValue);
  }
  if clon.kind == CloneKind::Renumber && clon.source == 0 {
    return Err(FormatError::InvalidFieldValue);
  }
  if !ctx.has_object(clon.source) {
    return Err(FormatError::ObjectUnknown);
  }
  if ctx.has_object(clon.clone) {
    return Err(FormatError::ObjectExists);
  }
  Ok(Chunk::CLON(clon))
}

pub(super) fn past(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::PAST(PAST::try_from(data)?))
}

pub(super) fn disc(data: &[u8]) -> Result<Chunk, FormatError> {
  if data.len() % 2 != 0 {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::DISC(data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect()))
}

pub(super) fn back(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::BACK(BACK::try_from(data)?))
}

pub(super) fn fram(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::FRAM(FRAM::try_from(data)?))
}

pub(super) fn move_(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::MOVE(MOVE::try_from(data)?))
}

pub(super) fn clip(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::CLIP(CLIP::try_from(data)?))
}

pub(super) fn show(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::SHOW(SHOW::try_from(data)?))
}

pub(super) fn term(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.has_term {
    return Err(FormatError::MultipleError);
  }
  if !ctx.loop_levels.is_empty() {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::TERM(TERM::try_from(data)?))
}

pub(super) fn save(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.has_save {
    return Err(FormatError::MultipleError);
  }
  Ok(Chunk::SAVE(SAVE::try_from(data)?))
}

pub(super) fn seek(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if !ctx.has_save {
    return Err(FormatError::SequenceError);
  }
  if data.len() > 79 {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::SEEK(latin1_to_string(data)))
}

pub(super) fn expi(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::eXPI(EXPI::try_from(data)?))
}

pub(super) fn fpri(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::fPRI(FPRI::try_from(data)?))
}

pub(super) fn need(data: &[u8]) -> Result<Chunk, MngError> {
  if data.is_empty() {
    return Err(FormatError::InvalidLength.into());
  }
  let mut keywords = Vec::new();
  for raw in data.split(|&u| u == 0) {
    if raw.is_empty() {
      return Err(FormatError::KeywordNull.into());
    }
    let keyword = latin1_to_string(raw);
    let known_chunk = <[u8; 4]>::try_from(raw).is_ok_and(|t| super::is_known_tag(crate::ChunkTag(t)));
    if !known_chunk && !NEED_KEYWORDS.contains(&keyword.as_str()) {
      log::debug!("nEED keyword {keyword:?} can't be satisfied");
      return Err(Unsupported::Need.into());
    }
    keywords.push(keyword);
  }
  Ok(Chunk::nEED(keywords))
}

pub(super) fn phyg(data: &[u8]) -> Result<Chunk, FormatError> {
  if data.is_empty() {
    return Ok(Chunk::pHYg(None));
  }
  Ok(Chunk::pHYg(Some(PhysicalDims::try_from(data)?)))
}

pub(super) fn magn(data: &[u8]) -> Result<Chunk, FormatError> {
  Ok(Chunk::MAGN(MAGN::try_from(data)?))
}

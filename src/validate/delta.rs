//! Rules for the JNG and Delta-PNG chunks.

use crate::{
  context::{ActiveHeader, ProcessContext},
  Chunk, ChunkTag, FormatError, DBYK, DHDR, JHDR, PPLT, PROM,
};

pub(super) fn jhdr(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.active.is_active() {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::JHDR(JHDR::try_from(data)?))
}

fn jng_header(ctx: &ProcessContext) -> Result<&JHDR, FormatError> {
  match &ctx.active {
    ActiveHeader::Jng(j) => Ok(j),
    ActiveHeader::None => Err(FormatError::SequenceError),
    _ => Err(FormatError::ChunkNotAllowed),
  }
}

pub(super) fn jdat(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  jng_header(ctx)?;
  Ok(Chunk::JDAT(data.to_vec()))
}

pub(super) fn jdaa(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let j = jng_header(ctx)?;
  if j.alpha_compression != 8 {
    return Err(FormatError::ChunkNotAllowed);
  }
  if ctx.local.has_idat {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::JDAA(data.to_vec()))
}

pub(super) fn jsep(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  let j = jng_header(ctx)?;
  if !data.is_empty() {
    return Err(FormatError::InvalidLength);
  }
  if j.sample_depth != 20 {
    return Err(FormatError::ChunkNotAllowed);
  }
  if ctx.local.has_jsep {
    return Err(FormatError::MultipleError);
  }
  if !ctx.local.has_jdat {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::JSEP)
}

pub(super) fn dhdr(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  if ctx.active.is_active() {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::DHDR(DHDR::try_from(data)?))
}

fn delta_header(ctx: &ProcessContext) -> Result<&DHDR, FormatError> {
  match &ctx.active {
    ActiveHeader::Delta(d) => Ok(d),
    ActiveHeader::None => Err(FormatError::SequenceError),
    _ => Err(FormatError::ChunkNotAllowed),
  }
}

pub(super) fn prom(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  if ctx.local.has_idat || ctx.local.has_plte {
    return Err(FormatError::SequenceError);
  }
  Ok(Chunk::PROM(PROM::try_from(data)?))
}

pub(super) fn ipng(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  if !data.is_empty() {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::IPNG)
}

pub(super) fn ijng(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  if !data.is_empty() {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::IJNG)
}

pub(super) fn pplt(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  Ok(Chunk::PPLT(PPLT::try_from(data)?))
}

pub(super) fn drop(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  if data.is_empty() || data.len() % 4 != 0 {
    return Err(FormatError::InvalidLength);
  }
  Ok(Chunk::DROP(data.chunks_exact(4).map(|c| ChunkTag([c[0], c[1], c[2], c[3]])).collect()))
}

pub(super) fn dbyk(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  Ok(Chunk::DBYK(DBYK::try_from(data)?))
}

pub(super) fn ordr(ctx: &ProcessContext, data: &[u8]) -> Result<Chunk, FormatError> {
  delta_header(ctx)?;
  if data.is_empty() || data.len() % 5 != 0 {
    return Err(FormatError::InvalidLength);
  }
  let mut out = Vec::with_capacity(data.len() / 5);
  for c in data.chunks_exact(5) {
    if c[4] > 4 {
      return Err(FormatError::InvalidFieldValue);
    }
    out.push((ChunkTag([c[0], c[1], c[2], c[3]]), c[4]));
  }
  Ok(Chunk::ORDR(out))
}

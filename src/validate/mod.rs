//! Checks chunks against the stream grammar.
//!
//! [`validate`] looks at one chunk payload and the [`ProcessContext`] and
//! either gives back the parsed [`Chunk`] or an error. It never changes the
//! context: the caller commits the chunk with
//! [`ProcessContext::commit`](crate::context::ProcessContext::commit) once it
//! has decided to keep it. That way a bad chunk leaves no partial state
//! behind.

use crate::{context::ProcessContext, Chunk, ChunkTag, Config, FormatError, MngResult, SignatureType, TextKind};

mod scope;

mod png;

mod mng;

mod delta;

/// Chunks that only exist in MNG streams.
#[must_use]
pub fn is_mng_only(tag: ChunkTag) -> bool {
  matches!(
    tag,
    ChunkTag::MHDR
      | ChunkTag::MEND
      | ChunkTag::LOOP
      | ChunkTag::ENDL
      | ChunkTag::DEFI
      | ChunkTag::BASI
      | ChunkTag::CLON
      | ChunkTag::PAST
      | ChunkTag::DISC
      | ChunkTag::BACK
      | ChunkTag::FRAM
      | ChunkTag::MOVE
      | ChunkTag::CLIP
      | ChunkTag::SHOW
      | ChunkTag::TERM
      | ChunkTag::SAVE
      | ChunkTag::SEEK
      | ChunkTag::eXPI
      | ChunkTag::fPRI
      | ChunkTag::nEED
      | ChunkTag::pHYg
      | ChunkTag::MAGN
      | ChunkTag::DHDR
      | ChunkTag::PROM
      | ChunkTag::IPNG
      | ChunkTag::PPLT
      | ChunkTag::IJNG
      | ChunkTag::DROP
      | ChunkTag::DBYK
      | ChunkTag::ORDR
  )
}

/// MNG chunks that are only allowed between images.
#[must_use]
pub fn is_top_level_only(tag: ChunkTag) -> bool {
  is_mng_only(tag)
    && !matches!(
      tag,
      ChunkTag::PROM
        | ChunkTag::IPNG
        | ChunkTag::PPLT
        | ChunkTag::IJNG
        | ChunkTag::DROP
        | ChunkTag::DBYK
        | ChunkTag::ORDR
    )
}

/// Chunks that only exist in JNG images.
#[must_use]
pub fn is_jng_only(tag: ChunkTag) -> bool {
  matches!(tag, ChunkTag::JHDR | ChunkTag::JDAT | ChunkTag::JDAA | ChunkTag::JSEP)
}

/// Every chunk this decoder understands.
#[must_use]
pub fn is_known_tag(tag: ChunkTag) -> bool {
  is_mng_only(tag)
    || is_jng_only(tag)
    || matches!(
      tag,
      ChunkTag::IHDR
        | ChunkTag::PLTE
        | ChunkTag::IDAT
        | ChunkTag::IEND
        | ChunkTag::tRNS
        | ChunkTag::gAMA
        | ChunkTag::cHRM
        | ChunkTag::sRGB
        | ChunkTag::iCCP
        | ChunkTag::bKGD
        | ChunkTag::tEXt
        | ChunkTag::zTXt
        | ChunkTag::iTXt
        | ChunkTag::pHYs
        | ChunkTag::sBIT
        | ChunkTag::sPLT
        | ChunkTag::hIST
        | ChunkTag::tIME
    )
}

/// The chunk a stream of this kind has to start with.
#[inline]
#[must_use]
pub const fn first_chunk(signature: SignatureType) -> ChunkTag {
  match signature {
    SignatureType::Png => ChunkTag::IHDR,
    SignatureType::Jng => ChunkTag::JHDR,
    SignatureType::Mng => ChunkTag::MHDR,
  }
}

/// Validates one chunk against the current context.
///
/// On success the parsed chunk is returned and should then be committed. On
/// failure nothing anywhere was changed.
pub fn validate(ctx: &ProcessContext, tag: ChunkTag, data: &[u8], config: &Config) -> MngResult<Chunk> {
  log::trace!("validate {tag:?}, {} bytes", data.len());
  let signature = ctx.signature.ok_or(FormatError::InvalidSignature)?;
  if ctx.ended {
    return Err(FormatError::SequenceError.into());
  }
  if ctx.chunk_seq == 0 && tag != first_chunk(signature) {
    return Err(FormatError::NoHeader.into());
  }
  match signature {
    SignatureType::Png if is_mng_only(tag) || is_jng_only(tag) => {
      return Err(FormatError::ChunkNotAllowed.into())
    }
    SignatureType::Jng if is_mng_only(tag) || tag == ChunkTag::IHDR => {
      return Err(FormatError::ChunkNotAllowed.into())
    }
    _ => (),
  }
  if ctx.active.is_active() && is_top_level_only(tag) {
    return Err(FormatError::SequenceError.into());
  }
  if tag == ChunkTag::IDAT && ctx.local.has_idat && ctx.last_tag != Some(ChunkTag::IDAT) {
    return Err(FormatError::SequenceError.into());
  }
  let chunk = match tag {
    ChunkTag::IHDR => png::ihdr(ctx, data)?,
    ChunkTag::PLTE => png::plte(ctx, data)?,
    ChunkTag::IDAT => png::idat(ctx, data)?,
    ChunkTag::IEND => png::iend(ctx, data)?,
    ChunkTag::tRNS => png::trns(ctx, data)?,
    ChunkTag::gAMA => png::gama(ctx, data)?,
    ChunkTag::cHRM => png::chrm(ctx, data)?,
    ChunkTag::sRGB => png::srgb(ctx, data)?,
    ChunkTag::iCCP => png::iccp(ctx, data, config)?,
    ChunkTag::bKGD => png::bkgd(ctx, data)?,
    ChunkTag::tEXt => png::text(TextKind::Plain, data, config)?,
    ChunkTag::zTXt => png::text(TextKind::Compressed, data, config)?,
    ChunkTag::iTXt => png::text(TextKind::International, data, config)?,
    ChunkTag::pHYs => png::phys(data)?,
    ChunkTag::sBIT => png::sbit(ctx, data)?,
    ChunkTag::sPLT => png::splt(ctx, data)?,
    ChunkTag::hIST => png::hist(ctx, data)?,
    ChunkTag::tIME => png::time(data)?,
    ChunkTag::MHDR => mng::mhdr(ctx, data)?,
    ChunkTag::MEND => mng::mend(data)?,
    ChunkTag::LOOP => mng::loop_(data)?,
    ChunkTag::ENDL => mng::endl(ctx, data)?,
    ChunkTag::DEFI => mng::defi(data)?,
    ChunkTag::BASI => mng::basi(data)?,
    ChunkTag::CLON => mng::clon(ctx, data)?,
    ChunkTag::PAST => mng::past(data)?,
    ChunkTag::DISC => mng::disc(data)?,
    ChunkTag::BACK => mng::back(data)?,
    ChunkTag::FRAM => mng::fram(data)?,
    ChunkTag::MOVE => mng::move_(data)?,
    ChunkTag::CLIP => mng::clip(data)?,
    ChunkTag::SHOW => mng::show(data)?,
    ChunkTag::TERM => mng::term(ctx, data)?,
    ChunkTag::SAVE => mng::save(ctx, data)?,
    ChunkTag::SEEK => mng::seek(ctx, data)?,
    ChunkTag::eXPI => mng::expi(data)?,
    ChunkTag::fPRI => mng::fpri(data)?,
    ChunkTag::nEED => mng::need(data)?,
    ChunkTag::pHYg => mng::phyg(data)?,
    ChunkTag::MAGN => mng::magn(data)?,
    ChunkTag::JHDR => delta::jhdr(ctx, data)?,
    ChunkTag::JDAT => delta::jdat(ctx, data)?,
    ChunkTag::JDAA => delta::jdaa(ctx, data)?,
    ChunkTag::JSEP => delta::jsep(ctx, data)?,
    ChunkTag::DHDR => delta::dhdr(ctx, data)?,
    ChunkTag::PROM => delta::prom(ctx, data)?,
    ChunkTag::IPNG => delta::ipng(ctx, data)?,
    ChunkTag::PPLT => delta::pplt(ctx, data)?,
    ChunkTag::IJNG => delta::ijng(ctx, data)?,
    ChunkTag::DROP => delta::drop(ctx, data)?,
    ChunkTag::DBYK => delta::dbyk(ctx, data)?,
    ChunkTag::ORDR => delta::ordr(ctx, data)?,
    _ if tag.is_critical() => return Err(FormatError::UnknownCritical.into()),
    _ => {
      log::debug!("skipping unknown ancillary chunk {tag:?}");
      Chunk::Unknown { tag, data: data.to_vec() }
    }
  };
  Ok(chunk)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{MngError, PixelFormat, Scoped, Transparency, RGB8};

  fn ihdr_bytes(depth: u8, color_type: u8) -> Vec<u8> {
    let mut v = vec![0, 0, 0, 4, 0, 0, 0, 4];
    v.extend_from_slice(&[depth, color_type, 0, 0, 0]);
    v
  }

  fn feed(ctx: &mut ProcessContext, tag: ChunkTag, data: &[u8]) -> MngResult<Chunk> {
    let chunk = validate(ctx, tag, data, &Config::default())?;
    ctx.commit(&chunk);
    Ok(chunk)
  }

  fn mng_ctx() -> ProcessContext {
    let mut ctx = ProcessContext::new(SignatureType::Mng);
    let mut mhdr = [0_u8; 28];
    mhdr[3] = 8;
    mhdr[7] = 8;
    mhdr[11] = 100;
    feed(&mut ctx, ChunkTag::MHDR, &mhdr).unwrap();
    ctx
  }

  #[test]
  fn test_depth_color_matrix() {
    for depth in 0..=17_u8 {
      for color_type in 0..=7_u8 {
        let ctx = ProcessContext::new(SignatureType::Png);
        let result = validate(&ctx, ChunkTag::IHDR, &ihdr_bytes(depth, color_type), &Config::default());
        let legal = matches!(
          (depth, color_type),
          (1 | 2 | 4 | 8 | 16, 0) | (1 | 2 | 4 | 8, 3) | (8 | 16, 2 | 4 | 6)
        );
        match result {
          Ok(Chunk::IHDR(h)) => {
            assert!(legal, "{depth}/{color_type}");
            assert_eq!(h.format.bits_per_channel(), depth);
          }
          Err(MngError::Format(FormatError::InvalidBitdepth | FormatError::InvalidColortype)) => {
            assert!(!legal, "{depth}/{color_type}")
          }
          other => panic!("{depth}/{color_type}: {other:?}"),
        }
      }
    }
  }

  #[test]
  fn test_first_chunk_must_be_header() {
    let ctx = ProcessContext::new(SignatureType::Mng);
    assert_eq!(
      validate(&ctx, ChunkTag::IHDR, &ihdr_bytes(8, 2), &Config::default()),
      Err(FormatError::NoHeader.into())
    );
    let ctx = ProcessContext::new(SignatureType::Png);
    assert_eq!(validate(&ctx, ChunkTag::tEXt, b"a\0b", &Config::default()), Err(FormatError::NoHeader.into()));
  }

  #[test]
  fn test_plte_rules() {
    let mut ctx = ProcessContext::new(SignatureType::Png);
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(2, 3)).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::PLTE, &[0; 7]), Err(FormatError::InvalidLength.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::PLTE, &[0; 15]), Err(FormatError::InvalidLength.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::PLTE, &[]), Err(FormatError::CannotBeEmpty.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::tRNS, &[0]), Err(FormatError::PLTEMissing.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::IDAT, &[0]), Err(FormatError::PLTEMissing.into()));
    feed(&mut ctx, ChunkTag::PLTE, &[0; 12]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::PLTE, &[0; 12]), Err(FormatError::MultipleError.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::gAMA, &[0, 0, 177, 143]), Err(FormatError::SequenceError.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::IEND, &[]), Err(FormatError::IDATMissing.into()));

    let mut gray = ProcessContext::new(SignatureType::Png);
    feed(&mut gray, ChunkTag::IHDR, &ihdr_bytes(8, 0)).unwrap();
    assert_eq!(feed(&mut gray, ChunkTag::PLTE, &[0; 3]), Err(FormatError::ChunkNotAllowed.into()));
  }

  #[test]
  fn test_global_palette_inherited() {
    let mut ctx = mng_ctx();
    let pal = [1, 2, 3, 4, 5, 6];
    feed(&mut ctx, ChunkTag::PLTE, &pal).unwrap();
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 3)).unwrap();
    let chunk = feed(&mut ctx, ChunkTag::PLTE, &[]).unwrap();
    let expected = vec![RGB8 { r: 1, g: 2, b: 3 }, RGB8 { r: 4, g: 5, b: 6 }];
    assert_eq!(chunk, Chunk::PLTE(Scoped::Inherited(expected)));
  }

  #[test]
  fn test_global_trns_too_long_for_palette() {
    let mut ctx = mng_ctx();
    feed(&mut ctx, ChunkTag::tRNS, &[255, 128, 0]).unwrap();
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 3)).unwrap();
    feed(&mut ctx, ChunkTag::PLTE, &[9; 6]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::tRNS, &[]), Err(FormatError::GlobalLengthErr.into()));
    // nothing was committed by the failure
    assert!(!ctx.local.has_trns);
    let chunk = feed(&mut ctx, ChunkTag::tRNS, &[7]).unwrap();
    assert_eq!(chunk, Chunk::tRNS(Scoped::Local(Transparency::Alphas(vec![7]))));
  }

  #[test]
  fn test_empty_global_clears() {
    let mut ctx = mng_ctx();
    feed(&mut ctx, ChunkTag::gAMA, &[0, 0, 177, 143]).unwrap();
    assert_eq!(ctx.globals.gamma, Some(45455));
    feed(&mut ctx, ChunkTag::gAMA, &[]).unwrap();
    assert_eq!(ctx.globals.gamma, None);
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 2)).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::gAMA, &[]), Err(FormatError::CannotBeEmpty.into()));
  }

  #[test]
  fn test_clon_needs_known_source_and_free_id() {
    let mut ctx = mng_ctx();
    assert_eq!(feed(&mut ctx, ChunkTag::CLON, &[0, 1, 0, 2]), Err(FormatError::ObjectUnknown.into()));
    feed(&mut ctx, ChunkTag::DEFI, &[0, 1]).unwrap();
    feed(&mut ctx, ChunkTag::DEFI, &[0, 2]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::CLON, &[0, 1, 0, 2]), Err(FormatError::ObjectExists.into()));
    feed(&mut ctx, ChunkTag::CLON, &[0, 1, 0, 3]).unwrap();
    feed(&mut ctx, ChunkTag::DISC, &[0, 3]).unwrap();
    // object 0 is always a valid source
    feed(&mut ctx, ChunkTag::CLON, &[0, 0, 0, 3]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::CLON, &[0, 0, 0, 4, 2]), Err(FormatError::InvalidFieldValue.into()));
  }

  #[test]
  fn test_idat_must_be_contiguous() {
    let mut ctx = ProcessContext::new(SignatureType::Png);
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 0)).unwrap();
    feed(&mut ctx, ChunkTag::IDAT, &[1]).unwrap();
    feed(&mut ctx, ChunkTag::IDAT, &[2]).unwrap();
    feed(&mut ctx, ChunkTag::tEXt, b"k\0v").unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::IDAT, &[3]), Err(FormatError::SequenceError.into()));
    feed(&mut ctx, ChunkTag::IEND, &[]).unwrap();
    assert!(ctx.ended);
  }

  #[test]
  fn test_mng_only_chunks() {
    let mut ctx = ProcessContext::new(SignatureType::Png);
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 0)).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::LOOP, &[0, 0, 0, 0, 1]), Err(FormatError::ChunkNotAllowed.into()));
    let mut ctx = mng_ctx();
    feed(&mut ctx, ChunkTag::IHDR, &ihdr_bytes(8, 0)).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::SHOW, &[]), Err(FormatError::SequenceError.into()));
  }

  #[test]
  fn test_loop_and_term_rules() {
    let mut ctx = mng_ctx();
    assert_eq!(feed(&mut ctx, ChunkTag::ENDL, &[0]), Err(FormatError::NoMatchingLoop.into()));
    feed(&mut ctx, ChunkTag::LOOP, &[0, 0, 0, 0, 3]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::TERM, &[0]), Err(FormatError::SequenceError.into()));
    feed(&mut ctx, ChunkTag::ENDL, &[0]).unwrap();
    feed(&mut ctx, ChunkTag::TERM, &[0]).unwrap();
    assert_eq!(feed(&mut ctx, ChunkTag::TERM, &[0]), Err(FormatError::MultipleError.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::SEEK, &[]), Err(FormatError::SequenceError.into()));
    assert_eq!(feed(&mut ctx, ChunkTag::DISC, &[0, 1, 2]), Err(FormatError::InvalidLength.into()));
  }

  #[test]
  fn test_unknown_chunks() {
    let mut ctx = mng_ctx();
    assert_eq!(feed(&mut ctx, ChunkTag(*b"ZZZZ"), &[]), Err(FormatError::UnknownCritical.into()));
    let chunk = feed(&mut ctx, ChunkTag(*b"zzZz"), &[1]).unwrap();
    assert_eq!(chunk, Chunk::Unknown { tag: ChunkTag(*b"zzZz"), data: vec![1] });
  }

  #[test]
  fn test_need_keywords() {
    let mut ctx = mng_ctx();
    feed(&mut ctx, ChunkTag::nEED, b"MNG-1.0\0LOOP").unwrap();
    assert_eq!(
      feed(&mut ctx, ChunkTag::nEED, b"teleport"),
      Err(MngError::Unsupported(crate::Unsupported::Need))
    );
  }

  #[test]
  fn test_intrapixel_only_in_mng() {
    let mut bytes = ihdr_bytes(8, 2);
    bytes[11] = 64;
    let ctx = ProcessContext::new(SignatureType::Png);
    assert_eq!(validate(&ctx, ChunkTag::IHDR, &bytes, &Config::default()), Err(FormatError::InvalidFilter.into()));
    let mut ctx = mng_ctx();
    let Chunk::IHDR(h) = feed(&mut ctx, ChunkTag::IHDR, &bytes).unwrap() else { panic!() };
    assert!(h.intrapixel);
    assert_eq!(h.format, PixelFormat::RGB8);
  }
}

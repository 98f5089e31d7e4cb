//! Zlib decompression, built on the `miniz_oxide` core decompressor.
//!
//! Image data arrives split over any number of `IDAT` chunks, so the
//! [`IdatInflater`] keeps its decompressor alive between chunks and hands out
//! scanlines as soon as enough output exists. The smaller compressed payloads
//! (`iCCP`, `zTXt`, `iTXt`) go through [`inflate_buffer`] in one shot.

use miniz_oxide::inflate::{
  core::{
    decompress,
    inflate_flags::{
      TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_PARSE_ZLIB_HEADER,
      TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
    },
    DecompressorOxide,
  },
  TINFLStatus,
};

use crate::{MngError, MngResult, ResourceError};

/// Streaming inflate for one image's worth of `IDAT` chunks.
///
/// The output buffer is sized from the image header up front. Output past
/// that size is dropped with a warning, since every scanline has already
/// been produced by then.
pub struct IdatInflater {
  decomp: Box<DecompressorOxide>,
  out: Vec<u8>,
  out_pos: usize,
  done: bool,
  overflowed: bool,
}
impl core::fmt::Debug for IdatInflater {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("IdatInflater")
      .field("capacity", &self.out.len())
      .field("out_pos", &self.out_pos)
      .field("done", &self.done)
      .finish()
  }
}
impl IdatInflater {
  /// Makes an inflater that expects exactly `expected` output bytes.
  pub fn new(expected: usize) -> MngResult<Self> {
    let mut out = Vec::new();
    out.try_reserve_exact(expected)?;
    out.resize(expected, 0);
    Ok(Self { decomp: Box::default(), out, out_pos: 0, done: false, overflowed: false })
  }

  /// Pushes one chunk of compressed bytes through.
  ///
  /// Returns the total number of output bytes produced so far.
  pub fn feed(&mut self, mut input: &[u8]) -> MngResult<usize> {
    while !input.is_empty() && !self.done && !self.overflowed {
      let flags = TINFL_FLAG_PARSE_ZLIB_HEADER
        | TINFL_FLAG_HAS_MORE_INPUT
        | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;
      let (status, consumed, produced) =
        decompress(&mut self.decomp, input, &mut self.out, self.out_pos, flags);
      input = &input[consumed..];
      self.out_pos += produced;
      match status {
        TINFLStatus::Done => self.done = true,
        TINFLStatus::NeedsMoreInput => {
          if consumed == 0 && produced == 0 {
            break;
          }
        }
        TINFLStatus::HasMoreOutput => {
          log::warn!("image data inflates past its expected size, the extra is ignored");
          self.overflowed = true;
        }
        other => {
          log::debug!("inflate failed: {other:?}");
          return Err(MngError::Inflate);
        }
      }
    }
    Ok(self.out_pos)
  }

  /// The bytes produced so far.
  #[inline]
  #[must_use]
  pub fn output(&self) -> &[u8] {
    &self.out[..self.out_pos]
  }

  /// If the zlib stream reached its end marker.
  #[inline]
  #[must_use]
  pub fn is_done(&self) -> bool {
    self.done
  }
}

/// Inflates a whole zlib stream at once.
///
/// The output buffer starts at `estimate` bytes and doubles whenever the
/// decompressor runs out of room, keeping everything already written. It
/// never grows past `limit`.
pub fn inflate_buffer(data: &[u8], estimate: usize, limit: usize) -> MngResult<Vec<u8>> {
  let mut decomp: Box<DecompressorOxide> = Box::default();
  let mut out: Vec<u8> = Vec::new();
  let first_size = estimate.clamp(64, limit.max(64));
  out.try_reserve_exact(first_size)?;
  out.resize(first_size, 0);
  let mut in_pos = 0;
  let mut out_pos = 0;
  loop {
    let flags = TINFL_FLAG_PARSE_ZLIB_HEADER | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF;
    let (status, consumed, produced) = decompress(&mut decomp, &data[in_pos..], &mut out, out_pos, flags);
    in_pos += consumed;
    out_pos += produced;
    match status {
      TINFLStatus::Done => {
        out.truncate(out_pos);
        return Ok(out);
      }
      TINFLStatus::HasMoreOutput => {
        if out.len() >= limit {
          return Err(ResourceError::BufferOverflow.into());
        }
        let new_size = out.len().saturating_mul(2).min(limit);
        log::trace!("inflate buffer grows {} -> {new_size}", out.len());
        out.try_reserve_exact(new_size - out.len())?;
        out.resize(new_size, 0);
      }
      TINFLStatus::NeedsMoreInput | TINFLStatus::FailedCannotMakeProgress => {
        return Err(MngError::Inflate);
      }
      other => {
        log::debug!("inflate failed: {other:?}");
        return Err(MngError::Inflate);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use miniz_oxide::deflate::compress_to_vec_zlib;

  #[test]
  fn test_inflate_buffer_undersized_estimate() {
    let payload: Vec<u8> = (0..5000_u32).map(|i| (i * 7 % 251) as u8).collect();
    let z = compress_to_vec_zlib(&payload, 6);
    let out = inflate_buffer(&z, 10, 1 << 20).unwrap();
    assert_eq!(out, payload);
  }

  #[test]
  fn test_inflate_buffer_limit() {
    let payload = vec![3_u8; 4096];
    let z = compress_to_vec_zlib(&payload, 6);
    assert_eq!(
      inflate_buffer(&z, 16, 1000),
      Err(MngError::Resource(ResourceError::BufferOverflow))
    );
  }

  #[test]
  fn test_idat_inflater_split_input() {
    let payload: Vec<u8> = (0..3000_u32).map(|i| (i % 13) as u8).collect();
    let z = compress_to_vec_zlib(&payload, 6);
    let mut inf = IdatInflater::new(payload.len()).unwrap();
    for piece in z.chunks(17) {
      inf.feed(piece).unwrap();
    }
    assert!(inf.is_done());
    assert_eq!(inf.output(), &payload[..]);
  }

  #[test]
  fn test_corrupt_stream() {
    assert_eq!(inflate_buffer(&[0x78, 0x9C, 0xFF, 0xFF], 16, 1024), Err(MngError::Inflate));
  }
}

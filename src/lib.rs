#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A decoder and player for MNG animations, and the PNG and JNG streams they
//! are built from.
//!
//! The usual way in is a [`Decoder`] wrapped around your [`Host`]. The host
//! hands over stream bytes and canvas scanlines, the decoder validates each
//! chunk, decodes images into numbered objects, and plays the animation onto
//! the canvas. When a frame has to wait, the decoder asks the host for a
//! timer and returns, and picks up where it stopped on
//! [`Decoder::resume`].
//!
//! The pieces are usable on their own too:
//! * [`chunks`] has the parsed chunk payloads and a raw chunk iterator.
//! * [`validate`] checks a chunk against the stream grammar.
//! * [`pixels`] turns scanlines of any depth and color type into RGBA rows.
//! * [`color`] does gamma, chromaticity, and ICC correction.
//!
//! ## Features
//! * `icc` (default): full ICC color management through `moxcms`.

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

pub mod pixel_formats;
pub use pixel_formats::*;

mod parser_helpers;
pub(crate) use parser_helpers::*;

mod error;
pub use error::*;

pub mod chunks;
pub use chunks::*;

pub mod inflate;

pub mod filter;

pub mod interlace;

pub mod pixels;

pub mod color;

pub mod canvas;

pub mod objects;

pub mod context;

pub mod validate;

pub mod animation;

pub mod display;

mod config;
pub use config::*;

mod host;
pub use host::*;

mod decoder;
pub use decoder::*;

/// An ICC rendering intent, as used by `sRGB` chunks and color transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderingIntent {
  /// for images preferring good adaptation to the output device gamut at the
  /// expense of colorimetric accuracy, such as photographs.
  Perceptual,
  /// for images requiring colour appearance matching (relative to the output
  /// device white point), such as logos.
  RelativeColorimetric,
  /// for images preferring preservation of saturation at the expense of hue and
  /// lightness, such as charts and graphs.
  Saturation,
  /// for images requiring preservation of absolute colorimetry, such as
  /// previews of images destined for a different output device (proofs).
  AbsoluteColorimetric,
}
impl TryFrom<u8> for RenderingIntent {
  type Error = FormatError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Perceptual,
      1 => Self::RelativeColorimetric,
      2 => Self::Saturation,
      3 => Self::AbsoluteColorimetric,
      _ => return Err(FormatError::InvalidFieldValue),
    })
  }
}

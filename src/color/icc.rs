//! Full color management through `moxcms`.

use std::sync::Arc;

use moxcms::{ColorProfile, Layout, TransformExecutor, TransformOptions};

use crate::{pixels::CanonicalRow, MngError, MngResult, RenderingIntent};

/// A built ICC transform, for one sample width.
#[derive(Clone)]
pub enum IccTransform {
  /// For 8-bit rows.
  Rgba8(Arc<dyn TransformExecutor<u8> + Send + Sync>),
  /// For 16-bit rows.
  Rgba16(Arc<dyn TransformExecutor<u16> + Send + Sync>),
}
impl core::fmt::Debug for IccTransform {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::Rgba8(_) => f.write_str("IccTransform::Rgba8"),
      Self::Rgba16(_) => f.write_str("IccTransform::Rgba16"),
    }
  }
}

const fn moxcms_intent(intent: RenderingIntent) -> moxcms::RenderingIntent {
  match intent {
    RenderingIntent::Perceptual => moxcms::RenderingIntent::Perceptual,
    RenderingIntent::RelativeColorimetric => moxcms::RenderingIntent::RelativeColorimetric,
    RenderingIntent::Saturation => moxcms::RenderingIntent::Saturation,
    RenderingIntent::AbsoluteColorimetric => moxcms::RenderingIntent::AbsoluteColorimetric,
  }
}

fn load_profile(bytes: Option<&[u8]>) -> MngResult<ColorProfile> {
  match bytes {
    Some(b) => ColorProfile::new_from_slice(b).map_err(|e| MngError::Profile(format!("{e:?}"))),
    None => Ok(ColorProfile::new_srgb()),
  }
}

impl IccTransform {
  /// Builds a transform between two profiles. `None` stands for sRGB.
  pub fn new(
    source: Option<&[u8]>, output: Option<&[u8]>, intent: RenderingIntent, wide: bool,
  ) -> MngResult<Self> {
    let src = load_profile(source)?;
    let dst = load_profile(output)?;
    let options = TransformOptions { rendering_intent: moxcms_intent(intent), ..Default::default() };
    let err = |e: moxcms::CmsError| MngError::Profile(format!("{e:?}"));
    Ok(if wide {
      Self::Rgba16(src.create_transform_16bit(Layout::Rgba, &dst, Layout::Rgba, options).map_err(err)?)
    } else {
      Self::Rgba8(src.create_transform_8bit(Layout::Rgba, &dst, Layout::Rgba, options).map_err(err)?)
    })
  }

  /// Transforms a row in place.
  pub fn apply(&self, row: &mut CanonicalRow) -> MngResult<()> {
    let err = |e: moxcms::CmsError| MngError::Profile(format!("{e:?}"));
    match (self, row) {
      (Self::Rgba8(t), CanonicalRow::Rgba8(px)) => {
        let src: Vec<u8> = bytemuck::cast_slice(px.as_slice()).to_vec();
        t.transform(&src, bytemuck::cast_slice_mut(px.as_mut_slice())).map_err(err)
      }
      (Self::Rgba16(t), CanonicalRow::Rgba16(px)) => {
        let src: Vec<u16> = bytemuck::cast_slice(px.as_slice()).to_vec();
        t.transform(&src, bytemuck::cast_slice_mut(px.as_mut_slice())).map_err(err)
      }
      _ => Err(MngError::InvalidState),
    }
  }
}

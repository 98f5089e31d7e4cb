//! Color correction.
//!
//! For each image the engine picks one correction when the first row comes
//! through, in this order of preference:
//!
//! 1. An ICC transform from the image's (or the global) `iCCP` profile to the
//!    output profile.
//! 2. An sRGB to output profile transform, when the image is tagged `sRGB` and
//!    the output isn't sRGB.
//! 3. A transform synthesized from `cHRM` and `gAMA`.
//! 4. A gamma lookup table from `gAMA` alone.
//!
//! Anything not available (or not allowed by the [`ColorMode`]) is skipped.
//! The first two need the `icc` feature.

use crate::{
  config::ColorMode, pixels::CanonicalRow, Chromaticities, Config, Host, IccProfile, IoError,
  MngResult, RenderingIntent,
};

mod gamma;
pub use gamma::*;

mod chromaticity;
pub use chromaticity::*;

#[cfg(feature = "icc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "icc")))]
mod icc;
#[cfg(feature = "icc")]
pub use icc::*;

/// The color chunks that apply to one image.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageColorInfo<'a> {
  /// `gAMA`, times 100,000.
  pub gamma: Option<u32>,
  /// `cHRM`
  pub chrm: Option<&'a Chromaticities>,
  /// `sRGB`
  pub srgb: Option<RenderingIntent>,
  /// `iCCP`
  pub iccp: Option<&'a IccProfile>,
}

/// Which correction is active, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CorrectionKind {
  Identity,
  Gamma,
  Chromaticity,
  Icc,
  AppManaged,
}

#[derive(Debug, Clone)]
enum Correction {
  Identity,
  Gamma,
  Chromaticity(ChromaticityTransform),
  #[cfg(feature = "icc")]
  Icc(IccTransform),
  AppManaged,
}

/// Picks and runs the per-image color correction.
#[derive(Debug, Clone)]
pub struct ColorEngine {
  mode: ColorMode,
  view_gamma: f64,
  display_gamma: f64,
  intent: RenderingIntent,
  #[cfg_attr(not(feature = "icc"), allow(dead_code))]
  output_profile: Option<Vec<u8>>,
  gamma: Option<GammaTable>,
  gamma_builds: u32,
  current: Correction,
}
impl ColorEngine {
  /// Makes an engine for the configured mode.
  #[must_use]
  pub fn new(config: &Config) -> Self {
    Self {
      mode: config.color_mode,
      view_gamma: config.view_gamma,
      display_gamma: config.display_gamma,
      intent: config.rendering_intent,
      output_profile: config.output_profile.clone(),
      gamma: None,
      gamma_builds: 0,
      current: Correction::Identity,
    }
  }

  /// The active correction.
  #[must_use]
  pub fn kind(&self) -> CorrectionKind {
    match self.current {
      Correction::Identity => CorrectionKind::Identity,
      Correction::Gamma => CorrectionKind::Gamma,
      Correction::Chromaticity(_) => CorrectionKind::Chromaticity,
      #[cfg(feature = "icc")]
      Correction::Icc(_) => CorrectionKind::Icc,
      Correction::AppManaged => CorrectionKind::AppManaged,
    }
  }

  /// How many times a gamma table has been built.
  #[inline]
  #[must_use]
  pub const fn gamma_table_builds(&self) -> u32 {
    self.gamma_builds
  }

  /// Chooses the correction for the next image.
  ///
  /// `wide` is if the image's rows are 16-bit.
  pub fn select(&mut self, info: &ImageColorInfo<'_>, wide: bool) -> MngResult<CorrectionKind> {
    self.current = match self.mode {
      ColorMode::None => Correction::Identity,
      ColorMode::AppManaged => Correction::AppManaged,
      ColorMode::GammaOnly => self.gamma_correction(info),
      ColorMode::Full => self.full_correction(info, wide),
    };
    log::debug!("color correction for image: {:?}", self.kind());
    Ok(self.kind())
  }

  /// Full color management, first match wins:
  /// * `iCCP`: the embedded profile to the output profile. An `sRGB` chunk
  ///   next to it picks the intent, else the configured intent is used.
  /// * `sRGB`: sRGB to the output profile.
  /// * `cHRM` and `gAMA`: the chromaticity transform.
  /// * `gAMA` alone.
  ///
  /// With no output profile configured the output is taken to be sRGB, so an
  /// `sRGB` image needs no correction at all.
  #[cfg_attr(not(feature = "icc"), allow(unused_variables))]
  fn full_correction(&mut self, info: &ImageColorInfo<'_>, wide: bool) -> Correction {
    #[cfg(feature = "icc")]
    {
      let output = self.output_profile.as_deref();
      if let Some(iccp) = info.iccp {
        let intent = info.srgb.unwrap_or(self.intent);
        match IccTransform::new(Some(&iccp.profile), output, intent, wide) {
          Ok(t) => return Correction::Icc(t),
          Err(e) => log::warn!("ICC profile {:?} unusable: {e}", iccp.name),
        }
      }
      if let Some(intent) = info.srgb {
        if output.is_none() {
          return Correction::Identity;
        }
        match IccTransform::new(None, output, intent, wide) {
          Ok(t) => return Correction::Icc(t),
          Err(e) => log::warn!("output profile unusable: {e}"),
        }
      }
    }
    #[cfg(not(feature = "icc"))]
    {
      if info.srgb.is_some() {
        return Correction::Identity;
      }
    }
    if let (Some(chrm), Some(g)) = (info.chrm, info.gamma) {
      if let Some(t) = ChromaticityTransform::new(chrm, g, self.view_gamma, self.display_gamma) {
        return Correction::Chromaticity(t);
      }
      log::warn!("degenerate cHRM values, falling back to gamma only");
    }
    self.gamma_correction(info)
  }

  fn gamma_correction(&mut self, info: &ImageColorInfo<'_>) -> Correction {
    let Some(g) = info.gamma else { return Correction::Identity };
    let exponent = effective_exponent(g, self.view_gamma, self.display_gamma);
    let stale = match &self.gamma {
      Some(t) => (t.exponent() - exponent).abs() > f64::EPSILON,
      None => true,
    };
    if stale {
      log::trace!("building gamma table, exponent {exponent}");
      self.gamma = Some(GammaTable::new(exponent));
      self.gamma_builds += 1;
    }
    Correction::Gamma
  }

  /// Corrects one row with the selected correction.
  pub fn correct<H: Host>(&mut self, row: &mut CanonicalRow, host: &mut H) -> MngResult<()> {
    match &self.current {
      Correction::Identity => Ok(()),
      Correction::Gamma => {
        if let Some(t) = self.gamma.as_mut() {
          t.apply(row);
        }
        Ok(())
      }
      Correction::Chromaticity(t) => {
        t.apply(row);
        Ok(())
      }
      #[cfg(feature = "icc")]
      Correction::Icc(t) => t.apply(row),
      Correction::AppManaged => {
        if host.correct_row(row) {
          Ok(())
        } else {
          Err(IoError::CorrectRow.into())
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_gamma_table_rebuilt_only_on_change() {
    let mut engine = ColorEngine::new(&Config::default().with_color_mode(ColorMode::GammaOnly));
    let info = ImageColorInfo { gamma: Some(100_000), ..Default::default() };
    assert_eq!(engine.select(&info, false).unwrap(), CorrectionKind::Gamma);
    assert_eq!(engine.select(&info, false).unwrap(), CorrectionKind::Gamma);
    assert_eq!(engine.gamma_table_builds(), 1);
    let other = ImageColorInfo { gamma: Some(50_000), ..Default::default() };
    engine.select(&other, false).unwrap();
    assert_eq!(engine.gamma_table_builds(), 2);
  }

  #[test]
  fn test_selection_order() {
    let chrm = Chromaticities {
      white_x: 31270,
      white_y: 32900,
      red_x: 64000,
      red_y: 33000,
      green_x: 30000,
      green_y: 60000,
      blue_x: 15000,
      blue_y: 6000,
    };
    let mut engine = ColorEngine::new(&Config::default());
    let both = ImageColorInfo { gamma: Some(45455), chrm: Some(&chrm), ..Default::default() };
    assert_eq!(engine.select(&both, false).unwrap(), CorrectionKind::Chromaticity);
    let gamma = ImageColorInfo { gamma: Some(45455), ..Default::default() };
    assert_eq!(engine.select(&gamma, false).unwrap(), CorrectionKind::Gamma);
    let srgb = ImageColorInfo {
      gamma: Some(45455),
      chrm: Some(&chrm),
      srgb: Some(RenderingIntent::Perceptual),
      ..Default::default()
    };
    assert_eq!(engine.select(&srgb, false).unwrap(), CorrectionKind::Identity);
    assert_eq!(engine.select(&ImageColorInfo::default(), true).unwrap(), CorrectionKind::Identity);
    let mut none = ColorEngine::new(&Config::default().with_color_mode(ColorMode::None));
    assert_eq!(none.select(&both, false).unwrap(), CorrectionKind::Identity);
  }
}

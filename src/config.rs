//! Decoder configuration.

use crate::{RenderingIntent, RGB8};

/// Which color correction the decoder runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorMode {
  /// Samples go to the canvas as they are.
  None,
  /// Only `gAMA` is honored.
  GammaOnly,
  /// ICC, sRGB, `cHRM`, and `gAMA`, best one available.
  #[default]
  Full,
  /// The host corrects each row itself, see
  /// [`Host::correct_row`](crate::Host::correct_row).
  AppManaged,
}

/// The byte layout of the host's canvas scanlines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CanvasStyle {
  /// 3 bytes per pixel.
  Rgb8,
  /// 4 bytes per pixel, alpha last.
  #[default]
  Rgba8,
  /// 4 bytes per pixel, blue first.
  Bgra8,
  /// 4 bytes per pixel, alpha first.
  Argb8,
}
impl CanvasStyle {
  /// Bytes per canvas pixel.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self) -> usize {
    match self {
      Self::Rgb8 => 3,
      Self::Rgba8 | Self::Bgra8 | Self::Argb8 => 4,
    }
  }
}

/// Settings for a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// Color correction mode.
  pub color_mode: ColorMode,
  /// Canvas pixel layout.
  pub canvas_style: CanvasStyle,
  /// Viewing condition gamma. 1.0 in most cases.
  pub view_gamma: f64,
  /// Gamma of the display device.
  pub display_gamma: f64,
  /// Rendering intent for ICC transforms, unless the stream gives one.
  pub rendering_intent: RenderingIntent,
  /// ICC profile of the output device. `None` means sRGB.
  pub output_profile: Option<Vec<u8>>,
  /// Keep every validated chunk, so it can be iterated or replayed later.
  pub store_chunks: bool,
  /// Check each chunk's CRC.
  pub check_crc: bool,
  /// Larger frames or images produce a warning.
  pub max_width: u32,
  /// Larger frames or images produce a warning.
  pub max_height: u32,
  /// Background when the stream and host give none.
  pub background: RGB8,
  /// Largest buffer that one-shot inflate will grow to.
  pub inflate_limit: usize,
}
impl Default for Config {
  #[inline]
  fn default() -> Self {
    Self {
      color_mode: ColorMode::default(),
      canvas_style: CanvasStyle::default(),
      view_gamma: 1.0,
      display_gamma: 2.2,
      rendering_intent: RenderingIntent::Perceptual,
      output_profile: None,
      store_chunks: false,
      check_crc: true,
      max_width: 10_000,
      max_height: 10_000,
      background: RGB8::default(),
      inflate_limit: 16 << 20,
    }
  }
}
#[allow(missing_docs)]
impl Config {
  #[inline]
  #[must_use]
  pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
    self.color_mode = color_mode;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_canvas_style(mut self, canvas_style: CanvasStyle) -> Self {
    self.canvas_style = canvas_style;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_gamma(mut self, view_gamma: f64, display_gamma: f64) -> Self {
    self.view_gamma = view_gamma;
    self.display_gamma = display_gamma;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_rendering_intent(mut self, intent: RenderingIntent) -> Self {
    self.rendering_intent = intent;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_output_profile(mut self, profile: Option<Vec<u8>>) -> Self {
    self.output_profile = profile;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_store_chunks(mut self, store_chunks: bool) -> Self {
    self.store_chunks = store_chunks;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_check_crc(mut self, check_crc: bool) -> Self {
    self.check_crc = check_crc;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_max_dimensions(mut self, max_width: u32, max_height: u32) -> Self {
    self.max_width = max_width;
    self.max_height = max_height;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_background(mut self, background: RGB8) -> Self {
    self.background = background;
    self
  }
  #[inline]
  #[must_use]
  pub fn with_inflate_limit(mut self, inflate_limit: usize) -> Self {
    self.inflate_limit = inflate_limit;
    self
  }
}

use crate::pixels::CanonicalRow;

/// Gamma lookup tables for one effective exponent.
///
/// The 16-bit table is only built the first time a 16-bit row needs it.
#[derive(Clone)]
pub struct GammaTable {
  exponent: f64,
  table8: [u8; 256],
  table16: Option<Vec<u16>>,
}
impl core::fmt::Debug for GammaTable {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("GammaTable")
      .field("exponent", &self.exponent)
      .field("has_table16", &self.table16.is_some())
      .finish()
  }
}
impl GammaTable {
  /// Builds the 8-bit table for `exponent`.
  #[must_use]
  pub fn new(exponent: f64) -> Self {
    let mut table8 = [0_u8; 256];
    for (i, t) in table8.iter_mut().enumerate() {
      *t = (((i as f64) / 255.0).powf(exponent) * 255.0 + 0.5) as u8;
    }
    Self { exponent, table8, table16: None }
  }

  /// The exponent the tables were built for.
  #[inline]
  #[must_use]
  pub const fn exponent(&self) -> f64 {
    self.exponent
  }

  /// If the tables change nothing.
  #[inline]
  #[must_use]
  pub fn is_identity(&self) -> bool {
    (self.exponent - 1.0).abs() < 1e-6
  }

  /// Corrects the color channels of a row, alpha is left alone.
  pub fn apply(&mut self, row: &mut CanonicalRow) {
    if self.is_identity() {
      return;
    }
    match row {
      CanonicalRow::Rgba8(px) => {
        for p in px.iter_mut() {
          p.r = self.table8[usize::from(p.r)];
          p.g = self.table8[usize::from(p.g)];
          p.b = self.table8[usize::from(p.b)];
        }
      }
      CanonicalRow::Rgba16(px) => {
        let exponent = self.exponent;
        let table = self.table16.get_or_insert_with(|| {
          (0..=u16::MAX).map(|i| (((i as f64) / 65535.0).powf(exponent) * 65535.0 + 0.5) as u16).collect()
        });
        for p in px.iter_mut() {
          p.r = table[usize::from(p.r)];
          p.g = table[usize::from(p.g)];
          p.b = table[usize::from(p.b)];
        }
      }
    }
  }
}

/// The exponent that takes file samples to display samples.
///
/// `file_gamma` is the `gAMA` value, times 100,000.
#[inline]
#[must_use]
pub fn effective_exponent(file_gamma: u32, view_gamma: f64, display_gamma: f64) -> f64 {
  let file = f64::from(file_gamma) / 100_000.0;
  if file <= 0.0 || display_gamma <= 0.0 {
    1.0
  } else {
    view_gamma / (file * display_gamma)
  }
}

#[test]
fn test_gamma_identity_for_matching_display() {
  let exponent = effective_exponent(45455, 1.0, 2.2);
  assert!((exponent - 1.0).abs() < 1e-3);
  let t = GammaTable::new(2.0);
  assert_eq!(t.table8[0], 0);
  assert_eq!(t.table8[255], 255);
  assert_eq!(t.table8[128], 64);
}

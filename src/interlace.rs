//! Adam7 pass geometry.
//!
//! ```txt
//! 1 6 4 6 2 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! 3 6 4 6 3 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! ```
//!
//! Pass numbers here are 1 through 7. "Pass 0" is used for the full,
//! non-interlaced image, so that both cases go through the same code.

/// First row of each pass.
pub const ROW_START: [u32; 8] = [0, 0, 0, 4, 0, 2, 0, 1];
/// Row step of each pass.
pub const ROW_INC: [u32; 8] = [1, 8, 8, 8, 4, 4, 2, 2];
/// First column of each pass.
pub const COL_START: [u32; 8] = [0, 0, 4, 0, 2, 0, 1, 0];
/// Column step of each pass.
pub const COL_INC: [u32; 8] = [1, 8, 8, 4, 4, 2, 2, 1];

/// Where a pass's samples land in the full image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PassGeometry {
  /// 0 for a non-interlaced image, otherwise 1 through 7.
  pub pass: usize,
  /// Full-image row of the pass's first row.
  pub row_start: u32,
  /// Full-image rows between pass rows.
  pub row_inc: u32,
  /// Full-image column of the pass's first sample.
  pub col_start: u32,
  /// Full-image columns between samples.
  pub col_inc: u32,
  /// Samples per pass row.
  pub width: u32,
  /// Rows in the pass.
  pub height: u32,
}
impl PassGeometry {
  /// Geometry of `pass` for an image of the given size.
  ///
  /// ## Panics
  /// * If the pass exceeds 7.
  #[inline]
  #[must_use]
  pub const fn new(pass: usize, full_width: u32, full_height: u32) -> Self {
    let row_start = ROW_START[pass];
    let row_inc = ROW_INC[pass];
    let col_start = COL_START[pass];
    let col_inc = COL_INC[pass];
    Self {
      pass,
      row_start,
      row_inc,
      col_start,
      col_inc,
      width: reduced_len(full_width, col_start, col_inc),
      height: reduced_len(full_height, row_start, row_inc),
    }
  }

  /// If the pass holds no samples at all.
  #[inline]
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  /// Full-image position of a reduced position.
  #[inline]
  #[must_use]
  pub const fn full_pos(&self, reduced_x: u32, reduced_y: u32) -> (u32, u32) {
    (self.col_start + reduced_x * self.col_inc, self.row_start + reduced_y * self.row_inc)
  }
}

#[inline]
const fn reduced_len(full: u32, start: u32, inc: u32) -> u32 {
  if full > start {
    (full - start + inc - 1) / inc
  } else {
    0
  }
}

/// Given the dimensions of the full image, computes the size of each reduced
/// image.
///
/// Index 0 is the base image size, indexes 1 through 7 are the sizes of the
/// seven Adam7 passes.
#[inline]
#[must_use]
pub const fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 8] {
  let mut out = [(0, 0); 8];
  let mut pass = 0;
  while pass < 8 {
    let g = PassGeometry::new(pass, full_width, full_height);
    out[pass] = (g.width, g.height);
    pass += 1;
  }
  out
}

/// The passes a decoder steps through, in order.
///
/// Non-interlaced images just have the one "pass 0". Empty passes are
/// skipped, since they have no rows (not even filter bytes).
pub fn passes(full_width: u32, full_height: u32, interlaced: bool) -> impl Iterator<Item = PassGeometry> {
  let range = if interlaced { 1..8 } else { 0..1 };
  range.map(move |p| PassGeometry::new(p, full_width, full_height)).filter(|g| !g.is_empty())
}

#[test]
fn test_reduced_image_dimensions() {
  assert_eq!(reduced_image_dimensions(0, 0), [(0, 0); 8]);
  for (w, ex) in (1..=8).zip([0, 0, 0, 0, 1, 1, 1, 1]) {
    assert_eq!(reduced_image_dimensions(w, 0)[2].0, ex, "failed w:{}", w);
  }
  for (h, ex) in (1..=8).zip([0, 0, 0, 0, 1, 1, 1, 1]) {
    assert_eq!(reduced_image_dimensions(0, h)[3].1, ex, "failed h: {}", h);
  }
  for (w, ex) in (1..=8).zip([0, 1, 1, 2, 2, 3, 3, 4]) {
    assert_eq!(reduced_image_dimensions(w, 0)[6].0, ex, "failed w: {}", w);
  }
  for (h, ex) in (1..=8).zip([0, 1, 1, 2, 2, 3, 3, 4]) {
    assert_eq!(reduced_image_dimensions(0, h)[7].1, ex, "failed h: {}", h);
  }
  assert_eq!(
    reduced_image_dimensions(8, 8),
    [(8, 8), (1, 1), (1, 1), (2, 1), (2, 2), (4, 2), (4, 4), (8, 4)]
  );
}

#[test]
fn test_passes_cover_every_pixel_once() {
  for (w, h) in [(1, 1), (3, 5), (8, 8), (13, 7), (32, 1)] {
    let mut seen = std::vec![0_u8; (w * h) as usize];
    for g in passes(w, h, true) {
      for ry in 0..g.height {
        for rx in 0..g.width {
          let (x, y) = g.full_pos(rx, ry);
          seen[(y * w + x) as usize] += 1;
        }
      }
    }
    assert!(seen.iter().all(|&n| n == 1), "{w}x{h}");
  }
}

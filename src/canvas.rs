//! Putting rows onto the host's canvas.
//!
//! The canvas itself belongs to the host: the decoder asks for one scanline
//! at a time and only ever touches the pixels it computed as visible.

use crate::{pixels::CanonicalRow, CanvasStyle, RGBA8};

/// A rectangle in frame coordinates. Right and bottom are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Rect {
  pub left: i32,
  pub right: i32,
  pub top: i32,
  pub bottom: i32,
}
impl Rect {
  /// The rectangle from the origin to `width` by `height`.
  #[inline]
  #[must_use]
  pub const fn of_size(width: u32, height: u32) -> Self {
    Self { left: 0, right: width as i32, top: 0, bottom: height as i32 }
  }

  /// From the MNG field order: left, right, top, bottom.
  #[inline]
  #[must_use]
  pub const fn from_lrtb([left, right, top, bottom]: [i32; 4]) -> Self {
    Self { left, right, top, bottom }
  }

  /// The area both rectangles cover.
  #[inline]
  #[must_use]
  pub fn intersect(self, other: Self) -> Self {
    Self {
      left: self.left.max(other.left),
      right: self.right.min(other.right),
      top: self.top.max(other.top),
      bottom: self.bottom.min(other.bottom),
    }
  }

  /// If there's no area at all.
  #[inline]
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.left >= self.right || self.top >= self.bottom
  }

  /// If the point is inside.
  #[inline]
  #[must_use]
  pub const fn contains(&self, x: i32, y: i32) -> bool {
    x >= self.left && x < self.right && y >= self.top && y < self.bottom
  }

  /// Width, or 0 when empty.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    if self.right > self.left {
      (self.right - self.left) as u32
    } else {
      0
    }
  }

  /// Height, or 0 when empty.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    if self.bottom > self.top {
      (self.bottom - self.top) as u32
    } else {
      0
    }
  }
}

/// Reads one canvas pixel.
#[inline]
#[must_use]
pub fn read_pixel(style: CanvasStyle, px: &[u8]) -> RGBA8 {
  match (style, px) {
    (CanvasStyle::Rgb8, [r, g, b, ..]) => RGBA8 { r: *r, g: *g, b: *b, a: 255 },
    (CanvasStyle::Rgba8, [r, g, b, a, ..]) => RGBA8 { r: *r, g: *g, b: *b, a: *a },
    (CanvasStyle::Bgra8, [b, g, r, a, ..]) => RGBA8 { r: *r, g: *g, b: *b, a: *a },
    (CanvasStyle::Argb8, [a, r, g, b, ..]) => RGBA8 { r: *r, g: *g, b: *b, a: *a },
    _ => RGBA8::default(),
  }
}

/// Writes one canvas pixel.
#[inline]
pub fn write_pixel(style: CanvasStyle, px: &mut [u8], c: RGBA8) {
  match (style, px) {
    (CanvasStyle::Rgb8, [r, g, b, ..]) => (*r, *g, *b) = (c.r, c.g, c.b),
    (CanvasStyle::Rgba8, [r, g, b, a, ..]) => (*r, *g, *b, *a) = (c.r, c.g, c.b, c.a),
    (CanvasStyle::Bgra8, [b, g, r, a, ..]) => (*r, *g, *b, *a) = (c.r, c.g, c.b, c.a),
    (CanvasStyle::Argb8, [a, r, g, b, ..]) => (*r, *g, *b, *a) = (c.r, c.g, c.b, c.a),
    _ => (),
  }
}

/// Alpha blends `src` over `dst`.
#[inline]
#[must_use]
pub fn blend(src: RGBA8, dst: RGBA8) -> RGBA8 {
  match src.a {
    255 => src,
    0 => dst,
    a => {
      let sa = u32::from(a);
      let da = u32::from(dst.a) * (255 - sa) / 255;
      let out_a = sa + da;
      let mix = |s: u8, d: u8| -> u8 { ((u32::from(s) * sa + u32::from(d) * da) / out_a) as u8 };
      RGBA8 { r: mix(src.r, dst.r), g: mix(src.g, dst.g), b: mix(src.b, dst.b), a: out_a as u8 }
    }
  }
}

/// Where a row of pixels lands on a canvas line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPlacement {
  /// Frame column of the row's first pixel.
  pub x: i32,
  /// Frame columns between neighboring pixels. More than 1 for interlace
  /// passes.
  pub step: u32,
  /// Frame row.
  pub y: i32,
}

/// Composites a corrected row onto a canvas line.
///
/// Only columns inside `clip` are written; the caller has already limited
/// `clip` to the canvas. Pixels are blended unless `replace` is set, in which
/// case they're copied alpha and all.
pub fn composite_row(
  style: CanvasStyle, line: &mut [u8], row: &CanonicalRow, at: RowPlacement, clip: Rect,
  replace: bool,
) {
  if !clip.contains(clip.left, at.y) {
    return;
  }
  let bpp = style.bytes_per_pixel();
  let step = i64::from(at.step.max(1));
  for i in 0..row.len() {
    let x = i64::from(at.x) + i as i64 * step;
    if x >= i64::from(clip.right) {
      break;
    }
    if x < i64::from(clip.left) {
      continue;
    }
    let Some(src) = row.get8(i) else { break };
    let start = x as usize * bpp;
    let Some(px) = line.get_mut(start..start + bpp) else { break };
    let out = if replace { src } else { blend(src, read_pixel(style, px)) };
    write_pixel(style, px, out);
  }
}

/// Fills columns `[left, right)` of a canvas line with one color.
pub fn fill_span(style: CanvasStyle, line: &mut [u8], left: u32, right: u32, color: RGBA8) {
  let bpp = style.bytes_per_pixel();
  let start = (left as usize * bpp).min(line.len());
  let end = (right as usize * bpp).min(line.len());
  for px in line[start..end].chunks_exact_mut(bpp) {
    write_pixel(style, px, color);
  }
}

/// Copies an RGBA8 background line (as given by the host) into columns
/// `[left, right)` of a canvas line.
pub fn copy_rgba_span(style: CanvasStyle, line: &mut [u8], rgba: &[u8], left: u32, right: u32) {
  let bpp = style.bytes_per_pixel();
  for x in left..right {
    let s = x as usize * 4;
    let d = x as usize * bpp;
    let (Some(src), Some(dst)) = (rgba.get(s..s + 4), line.get_mut(d..d + bpp)) else { break };
    write_pixel(style, dst, RGBA8 { r: src[0], g: src[1], b: src[2], a: src[3] });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_styles_round_trip_one_pixel() {
    let c = RGBA8 { r: 1, g: 2, b: 3, a: 4 };
    for style in [CanvasStyle::Rgba8, CanvasStyle::Bgra8, CanvasStyle::Argb8] {
      let mut px = [0; 4];
      write_pixel(style, &mut px, c);
      assert_eq!(read_pixel(style, &px), c);
    }
    let mut px = [0; 4];
    write_pixel(CanvasStyle::Bgra8, &mut px, c);
    assert_eq!(px, [3, 2, 1, 4]);
    write_pixel(CanvasStyle::Argb8, &mut px, c);
    assert_eq!(px, [4, 1, 2, 3]);
  }

  #[test]
  fn test_blend() {
    let red = RGBA8 { r: 255, g: 0, b: 0, a: 255 };
    let white = RGBA8 { r: 255, g: 255, b: 255, a: 255 };
    assert_eq!(blend(red, white), red);
    assert_eq!(blend(RGBA8 { a: 0, ..red }, white), white);
    let half = blend(RGBA8 { a: 128, ..red }, white);
    assert_eq!(half.r, 255);
    assert!((126..=128).contains(&half.g));
    assert_eq!(half.a, 255);
  }

  #[test]
  fn test_composite_respects_clip_and_step() {
    let row = CanonicalRow::Rgba8(vec![RGBA8 { r: 9, g: 9, b: 9, a: 255 }; 4]);
    let mut line = vec![0_u8; 8 * 3];
    let at = RowPlacement { x: -2, step: 2, y: 0 };
    composite_row(CanvasStyle::Rgb8, &mut line, &row, at, Rect::of_size(5, 1), false);
    // pixels land at -2, 0, 2, 4
    let written: Vec<bool> = line.chunks(3).map(|p| p[0] == 9).collect();
    assert_eq!(written, [true, false, true, false, true, false, false, false]);
  }

  #[test]
  fn test_rect_intersect() {
    let a = Rect::from_lrtb([0, 10, 0, 10]);
    let b = Rect::from_lrtb([5, 20, -5, 3]);
    assert_eq!(a.intersect(b), Rect::from_lrtb([5, 10, 0, 3]));
    assert!(a.intersect(Rect::from_lrtb([11, 12, 0, 1])).is_empty());
  }
}

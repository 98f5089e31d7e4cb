//! Undoing the per-row predictors.

use crate::{FormatError, PixelFormat};

const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: the order of these tests is fixed by the format, don't rearrange.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Unfilters one row in place.
///
/// * `filter` is the filter type byte that led the row.
/// * `row` is the row data after the filter byte.
/// * `prev` is the previous *unfiltered* row of the same pass. Pass an empty
///   slice for the first row, which acts as a row of zeros.
/// * `bpp` is the format's filter chunk size.
pub fn unfilter_row(filter: u8, row: &mut [u8], prev: &[u8], bpp: usize) -> Result<(), FormatError> {
  let up = |i: usize| prev.get(i).copied().unwrap_or(0);
  match filter {
    0 => (),
    1 => {
      for i in bpp..row.len() {
        row[i] = row[i].wrapping_add(row[i - bpp]);
      }
    }
    2 => {
      for (i, p) in row.iter_mut().enumerate() {
        *p = p.wrapping_add(up(i));
      }
    }
    3 => {
      for i in 0..row.len() {
        let a = if i >= bpp { row[i - bpp] } else { 0 };
        let avg = ((u16::from(a) + u16::from(up(i))) / 2) as u8;
        row[i] = row[i].wrapping_add(avg);
      }
    }
    4 => {
      for i in 0..row.len() {
        let (a, c) = if i >= bpp { (row[i - bpp], up(i - bpp)) } else { (0, 0) };
        row[i] = row[i].wrapping_add(paeth_predict(a, up(i), c));
      }
    }
    _ => return Err(FormatError::InvalidFilter),
  }
  Ok(())
}

/// Reverses MNG intrapixel differencing (filter method 64).
///
/// Only RGB and RGBA rows carry it: red and blue were stored minus green.
pub fn undo_intrapixel(row: &mut [u8], format: PixelFormat) {
  match format {
    PixelFormat::RGB8 | PixelFormat::RGBA8 => {
      for px in row.chunks_exact_mut(format.filter_chunk_size()) {
        px[0] = px[0].wrapping_add(px[1]);
        px[2] = px[2].wrapping_add(px[1]);
      }
    }
    PixelFormat::RGB16 | PixelFormat::RGBA16 => {
      for px in row.chunks_exact_mut(format.filter_chunk_size()) {
        let g = u16::from_be_bytes([px[2], px[3]]);
        let r = u16::from_be_bytes([px[0], px[1]]).wrapping_add(g);
        let b = u16::from_be_bytes([px[4], px[5]]).wrapping_add(g);
        px[0..2].copy_from_slice(&r.to_be_bytes());
        px[4..6].copy_from_slice(&b.to_be_bytes());
      }
    }
    _ => (),
  }
}

#[test]
fn test_paeth_predict() {
  assert_eq!(paeth_predict(10, 20, 10), 20);
  assert_eq!(paeth_predict(20, 10, 10), 20);
  assert_eq!(paeth_predict(0, 0, 0), 0);
  assert_eq!(paeth_predict(5, 9, 200), 5);
}

#[test]
fn test_unfilter_rows() {
  let prev = [10, 20, 30, 40];
  let mut sub = [1, 2, 3, 4];
  unfilter_row(1, &mut sub, &prev, 2).unwrap();
  assert_eq!(sub, [1, 2, 4, 6]);
  let mut upr = [1, 2, 3, 4];
  unfilter_row(2, &mut upr, &prev, 2).unwrap();
  assert_eq!(upr, [11, 22, 33, 44]);
  let mut avg = [1, 1, 1, 1];
  unfilter_row(3, &mut avg, &[], 1).unwrap();
  assert_eq!(avg, [1, 1, 1, 1]);
  let mut bad = [0_u8; 2];
  assert_eq!(unfilter_row(5, &mut bad, &[], 1), Err(FormatError::InvalidFilter));
}

#[test]
fn test_undo_intrapixel() {
  let mut row = [10, 100, 20, 255];
  undo_intrapixel(&mut row, PixelFormat::RGBA8);
  assert_eq!(row, [110, 100, 120, 255]);
  let mut gray = [1, 2];
  undo_intrapixel(&mut gray, PixelFormat::Y8);
  assert_eq!(gray, [1, 2]);
}

use super::*;

use crate::{
  filter::{undo_intrapixel, unfilter_row},
  interlace::passes,
  ImageHeader, MngResult,
};

/// Where the row just taken sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPos {
  /// The pass geometry the row belongs to.
  pub pass: PassGeometry,
  /// Row within the pass.
  pub reduced_y: u32,
}
impl RowPos {
  /// Full-image row.
  #[inline]
  #[must_use]
  pub const fn full_y(&self) -> u32 {
    self.pass.full_pos(0, self.reduced_y).1
  }
}

/// Working state while one image's rows are decoded.
#[derive(Debug, Clone)]
pub struct RowState {
  /// The strategy for this image's format.
  pub strategy: RowStrategy,
  header: ImageHeader,
  passes: Vec<PassGeometry>,
  pass_index: usize,
  reduced_y: u32,
  consumed: usize,
  work_row: Vec<u8>,
  prev_row: Vec<u8>,
  /// The row produced by the last `process` or `retrieve`.
  pub canonical: CanonicalRow,
  /// Cleared when any decoded row had a pixel that isn't fully opaque.
  pub all_opaque: bool,
}
impl RowState {
  /// Sets up for an image with this header.
  pub fn new(header: ImageHeader) -> MngResult<Self> {
    let passes: Vec<PassGeometry> = passes(header.width, header.height, header.interlaced).collect();
    let widest = passes.iter().map(|g| header.format.bytes_per_scanline(g.width)).max().unwrap_or(0);
    let mut work_row = Vec::new();
    work_row.try_reserve_exact(widest)?;
    let mut prev_row = Vec::new();
    prev_row.try_reserve_exact(widest)?;
    Ok(Self {
      strategy: RowStrategy::for_format(header.format),
      header,
      passes,
      pass_index: 0,
      reduced_y: 0,
      consumed: 0,
      work_row,
      prev_row,
      canonical: CanonicalRow::default(),
      all_opaque: true,
    })
  }

  /// The header the state was made for.
  #[inline]
  #[must_use]
  pub const fn header(&self) -> &ImageHeader {
    &self.header
  }

  /// If every row of every pass has been taken.
  #[inline]
  #[must_use]
  pub fn is_complete(&self) -> bool {
    self.pass_index >= self.passes.len()
  }

  /// Takes the next row out of the inflated bytes, if enough are there.
  ///
  /// `inflated` is everything inflated so far for this image. The row is
  /// unfiltered into [`work_row`](Self::work_row).
  pub fn take_row(&mut self, inflated: &[u8]) -> Result<Option<RowPos>, FormatError> {
    let Some(&pass) = self.passes.get(self.pass_index) else { return Ok(None) };
    let row_bytes = self.header.format.bytes_per_scanline(pass.width);
    let Some(line) = inflated.get(self.consumed..self.consumed + 1 + row_bytes) else {
      return Ok(None);
    };
    let (filter, data) = (line[0], &line[1..]);
    self.work_row.clear();
    self.work_row.extend_from_slice(data);
    unfilter_row(filter, &mut self.work_row, &self.prev_row, self.header.format.filter_chunk_size())?;
    self.consumed += 1 + row_bytes;
    let pos = RowPos { pass, reduced_y: self.reduced_y };

    // the filter history wants the row before intrapixel undoing
    core::mem::swap(&mut self.work_row, &mut self.prev_row);
    self.work_row.clear();
    self.work_row.extend_from_slice(&self.prev_row);
    if self.header.intrapixel {
      undo_intrapixel(&mut self.work_row, self.header.format);
    }

    self.reduced_y += 1;
    if self.reduced_y >= pass.height {
      self.pass_index += 1;
      self.reduced_y = 0;
      self.prev_row.clear();
    }
    Ok(Some(pos))
  }

  /// The last unfiltered row.
  #[inline]
  #[must_use]
  pub fn work_row(&self) -> &[u8] {
    &self.work_row
  }

  /// Runs `process` over the current work row.
  pub fn process(&mut self, pos: &RowPos, colors: RowColors<'_>) -> Result<(), FormatError> {
    let opaque =
      self.strategy.process(&self.work_row, pos.pass.width as usize, colors, &mut self.canonical)?;
    self.all_opaque &= opaque;
    Ok(())
  }

  /// Runs `store` with the current work row.
  pub fn store(&self, pos: &RowPos, buffer: &mut [u8]) {
    self.strategy.store(&self.work_row, &pos.pass, pos.reduced_y, self.header.width, buffer);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(w: u32, h: u32, format: PixelFormat, interlaced: bool) -> ImageHeader {
    ImageHeader { width: w, height: h, format, intrapixel: false, interlaced }
  }

  #[test]
  fn test_take_rows_in_pieces() {
    let h = header(2, 2, PixelFormat::Y8, false);
    let mut rs = RowState::new(h).unwrap();
    let data = [0, 1, 2, 2, 1, 1];
    assert_eq!(rs.take_row(&data[..2]).unwrap(), None);
    let pos = rs.take_row(&data[..3]).unwrap().unwrap();
    assert_eq!((pos.full_y(), rs.work_row()), (0, &[1_u8, 2][..]));
    let pos = rs.take_row(&data).unwrap().unwrap();
    assert_eq!((pos.full_y(), rs.work_row()), (1, &[2_u8, 3][..]));
    assert!(rs.is_complete());
  }

  #[test]
  fn test_interlaced_rows_cover_image() {
    let (w, hgt) = (5_u32, 3_u32);
    let h = header(w, hgt, PixelFormat::Y8, true);
    let mut data = Vec::new();
    for g in passes(w, hgt, true) {
      for ry in 0..g.height {
        data.push(0);
        for rx in 0..g.width {
          let (x, y) = g.full_pos(rx, ry);
          data.push((y * w + x) as u8);
        }
      }
    }
    assert_eq!(data.len(), h.zlib_decompression_requirement());
    let mut rs = RowState::new(h).unwrap();
    let mut buffer = vec![0xEE_u8; (w * hgt) as usize];
    while let Some(pos) = rs.take_row(&data).unwrap() {
      rs.store(&pos, &mut buffer);
    }
    let expected: Vec<u8> = (0..(w * hgt) as u8).collect();
    assert_eq!(buffer, expected);
  }
}

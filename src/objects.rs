//! Image objects and their pixel data.
//!
//! An [`ImageObject`] is a numbered, positioned, clippable handle. The pixels
//! live in an [`ImageData`] behind an `Rc<RefCell<_>>`, since a partial
//! clone shares its source's pixels. The data is freed when the last object
//! (or animation snapshot) holding it goes away.
//!
//! Object 0 always exists. It holds whatever image was decoded without a
//! `DEFI`, and can't be discarded.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use crate::{
  color::ImageColorInfo,
  pixels::{fill_samples, CanonicalRow, RowColors, RowStrategy},
  Background, Chromaticities, CloneKind, DeltaType, FormatError, IccProfile, ImageHeader, MngResult,
  RenderingIntent, Transparency, BASI, CLON, DEFI, RGB8,
};

/// The color chunks attached to one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ImageColors {
  pub palette: Vec<RGB8>,
  pub trns: Option<Transparency>,
  pub gamma: Option<u32>,
  pub chrm: Option<Chromaticities>,
  pub srgb: Option<RenderingIntent>,
  pub iccp: Option<IccProfile>,
  pub bkgd: Option<Background>,
}
impl ImageColors {
  /// Palette and transparency, as rows need them.
  #[inline]
  #[must_use]
  pub fn row_colors(&self) -> RowColors<'_> {
    RowColors { palette: &self.palette, trns: self.trns.as_ref() }
  }

  /// What color correction needs.
  #[inline]
  #[must_use]
  pub fn color_info(&self) -> ImageColorInfo<'_> {
    ImageColorInfo {
      gamma: self.gamma,
      chrm: self.chrm.as_ref(),
      srgb: self.srgb,
      iccp: self.iccp.as_ref(),
    }
  }

  /// Fills anything unset from the global values.
  pub fn inherit_from(&mut self, globals: &ImageColors) {
    if self.palette.is_empty() {
      self.palette.clone_from(&globals.palette);
    }
    if self.gamma.is_none() {
      self.gamma = globals.gamma;
    }
    if self.chrm.is_none() {
      self.chrm = globals.chrm;
    }
    if self.srgb.is_none() {
      self.srgb = globals.srgb;
    }
    if self.iccp.is_none() {
      self.iccp.clone_from(&globals.iccp);
    }
  }
}

/// The pixels of one image, plus the color chunks that go with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
  /// The image header.
  pub header: ImageHeader,
  /// One byte per sample (two for 16-bit), rows top to bottom.
  pub samples: Vec<u8>,
  /// Color chunks.
  pub colors: ImageColors,
  /// If no pixel has any transparency.
  pub fully_opaque: bool,
  /// If every row has been decoded.
  pub complete: bool,
}
impl ImageData {
  /// Allocates a zeroed image.
  pub fn new(header: ImageHeader) -> MngResult<Self> {
    let strategy = RowStrategy::for_format(header.format);
    let len = (header.width as usize)
      .checked_mul(header.height as usize)
      .and_then(|n| n.checked_mul(strategy.stored_bytes_per_pixel()))
      .ok_or(crate::ResourceError::ImageTooBig)?;
    let mut samples = Vec::new();
    samples.try_reserve_exact(len)?;
    samples.resize(len, 0);
    Ok(Self { header, samples, colors: ImageColors::default(), fully_opaque: true, complete: false })
  }

  /// Makes a `BASI` image, filled with its color.
  pub fn from_basi(basi: &BASI) -> MngResult<Self> {
    let mut out = Self::new(basi.header)?;
    fill_samples(out.strategy(), basi.rgb, basi.alpha, &mut out.samples);
    let max = if out.header.format.is_16bit() { u16::MAX } else { 255 };
    out.fully_opaque = basi.alpha.map_or(true, |a| a >= max);
    out.complete = true;
    Ok(out)
  }

  /// The row strategy for this image's format.
  #[inline]
  #[must_use]
  pub const fn strategy(&self) -> RowStrategy {
    RowStrategy::for_format(self.header.format)
  }

  /// Bytes per stored row.
  #[inline]
  #[must_use]
  pub const fn row_bytes(&self) -> usize {
    self.header.width as usize * self.strategy().stored_bytes_per_pixel()
  }

  /// Runs `retrieve` for row `y`.
  pub fn retrieve_row(&self, y: u32, out: &mut CanonicalRow) -> Result<bool, FormatError> {
    let rb = self.row_bytes();
    let start = y as usize * rb;
    let row = self.samples.get(start..start + rb).ok_or(FormatError::InvalidLength)?;
    self.strategy().retrieve(row, self.header.width as usize, self.colors.row_colors(), out)
  }
}

/// Shared pixel data.
pub type SharedImageData = Rc<RefCell<ImageData>>;

/// A numbered image on the frame.
#[derive(Debug, Clone)]
pub struct ImageObject {
  /// Object id.
  pub id: u16,
  /// Position of the top left corner on the frame.
  pub location: (i32, i32),
  /// Clipping, in frame coordinates: left, right, top, bottom.
  pub clip: Option<[i32; 4]>,
  /// Shown when displayed.
  pub visible: bool,
  /// Has complete data that can be shown.
  pub viewable: bool,
  /// Survives `SEEK`.
  pub frozen: bool,
  /// Data must stay concrete.
  pub concrete: bool,
  /// The pixels, if any were decoded yet.
  pub data: Option<SharedImageData>,
}
impl ImageObject {
  /// A fresh, visible, empty object.
  #[inline]
  #[must_use]
  pub const fn new(id: u16) -> Self {
    Self {
      id,
      location: (0, 0),
      clip: None,
      visible: true,
      viewable: false,
      frozen: false,
      concrete: false,
      data: None,
    }
  }

  /// Applies `DEFI` settings.
  pub fn apply_defi(&mut self, defi: &DEFI) {
    self.visible = !defi.do_not_show;
    self.concrete = defi.concrete;
    self.location = defi.location;
    self.clip = defi.clip;
  }
}

/// All objects, by id.
#[derive(Debug, Clone)]
pub struct ObjectStore {
  objects: BTreeMap<u16, ImageObject>,
}
impl Default for ObjectStore {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl ObjectStore {
  /// A store holding only object 0.
  #[must_use]
  pub fn new() -> Self {
    let mut objects = BTreeMap::new();
    objects.insert(0, ImageObject::new(0));
    Self { objects }
  }

  /// Drops everything but a fresh object 0.
  pub fn reset(&mut self) {
    *self = Self::new();
  }

  /// Looks up an object.
  #[inline]
  #[must_use]
  pub fn get(&self, id: u16) -> Option<&ImageObject> {
    self.objects.get(&id)
  }

  /// Looks up an object.
  #[inline]
  pub fn get_mut(&mut self, id: u16) -> Option<&mut ImageObject> {
    self.objects.get_mut(&id)
  }

  /// Looks up an object, making a fresh one if needed.
  #[inline]
  pub fn get_or_create(&mut self, id: u16) -> &mut ImageObject {
    self.objects.entry(id).or_insert_with(|| ImageObject::new(id))
  }

  /// Object count, including object 0.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.objects.len()
  }

  /// Never true, object 0 is always there.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.objects.is_empty()
  }

  /// All ids, ascending.
  #[inline]
  pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
    self.objects.keys().copied()
  }

  /// Ids in `first..=last`, ascending. The range is taken either way around.
  #[must_use]
  pub fn ids_in(&self, first: u16, last: u16) -> Vec<u16> {
    let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
    self.objects.range(lo..=hi).map(|(&id, _)| id).collect()
  }

  /// The first existing id greater than `id` and at most `last`.
  #[must_use]
  pub fn next_id_after(&self, id: u16, last: u16) -> Option<u16> {
    if id >= last {
      return None;
    }
    self.objects.range(id + 1..=last).next().map(|(&id, _)| id)
  }

  /// `DEFI`: creates (or resets) an object.
  pub fn define(&mut self, defi: &DEFI) -> &mut ImageObject {
    let obj = self.get_or_create(defi.object_id);
    obj.apply_defi(defi);
    obj
  }

  /// `CLON`: copies, shares, or renumbers an object.
  ///
  /// The clone id has to be free. Nothing changes on an error.
  pub fn clone_object(&mut self, clon: &CLON) -> Result<(), FormatError> {
    if clon.clone == 0 || clon.source == clon.clone {
      return Err(FormatError::InvalidFieldValue);
    }
    if clon.kind == CloneKind::Renumber && clon.source == 0 {
      return Err(FormatError::InvalidFieldValue);
    }
    if self.objects.contains_key(&clon.clone) {
      return Err(FormatError::ObjectExists);
    }
    let source = self.objects.get(&clon.source).ok_or(FormatError::ObjectUnknown)?;
    let mut new_obj = ImageObject {
      id: clon.clone,
      location: source.location,
      clip: source.clip,
      visible: source.visible,
      viewable: source.viewable,
      frozen: false,
      concrete: source.concrete,
      data: None,
    };
    new_obj.data = match clon.kind {
      CloneKind::Full => {
        source.data.as_ref().map(|d| Rc::new(RefCell::new(d.borrow().clone())))
      }
      CloneKind::Partial => source.data.clone(),
      CloneKind::Renumber => {
        let old = self.objects.remove(&clon.source).ok_or(FormatError::ObjectUnknown)?;
        new_obj.frozen = old.frozen;
        old.data
      }
    };
    if let Some(dns) = clon.do_not_show {
      new_obj.visible = !dns;
    }
    if let Some(c) = clon.concrete {
      new_obj.concrete = c;
    }
    if let Some((delta, x, y)) = clon.location {
      new_obj.location = match delta {
        DeltaType::Absolute => (x, y),
        DeltaType::Relative => (new_obj.location.0.wrapping_add(x), new_obj.location.1.wrapping_add(y)),
      };
    }
    log::debug!("object {} cloned into {} ({:?})", clon.source, clon.clone, clon.kind);
    self.objects.insert(clon.clone, new_obj);
    Ok(())
  }

  /// `DISC`: discards the listed objects, or all of them for an empty list.
  ///
  /// Object 0 and frozen objects are never discarded.
  pub fn discard(&mut self, ids: &[u16]) {
    if ids.is_empty() {
      self.objects.retain(|&id, obj| id == 0 || obj.frozen);
    } else {
      for id in ids {
        if *id != 0 && self.objects.get(id).is_some_and(|o| !o.frozen) {
          self.objects.remove(id);
        }
      }
    }
  }

  /// `SAVE`: freezes every object that exists now.
  pub fn freeze_all(&mut self) {
    for obj in self.objects.values_mut() {
      obj.frozen = true;
    }
  }

  /// `SEEK`: discards everything that isn't frozen.
  pub fn discard_unfrozen(&mut self) {
    self.objects.retain(|&id, obj| id == 0 || obj.frozen);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::PixelFormat;

  fn header() -> ImageHeader {
    ImageHeader { width: 2, height: 2, format: PixelFormat::RGB8, intrapixel: false, interlaced: false }
  }

  #[test]
  fn test_object_zero_survives_discard() {
    let mut store = ObjectStore::new();
    store.get_or_create(3);
    store.get_or_create(7);
    store.discard(&[0, 3]);
    assert_eq!(store.ids().collect::<Vec<_>>(), [0, 7]);
    store.discard(&[]);
    assert_eq!(store.ids().collect::<Vec<_>>(), [0]);
  }

  #[test]
  fn test_clone_kinds_share_or_copy() {
    let mut store = ObjectStore::new();
    let data = Rc::new(RefCell::new(ImageData::new(header()).unwrap()));
    store.get_or_create(1).data = Some(data.clone());
    let clon = |clone, kind| CLON { source: 1, clone, kind, ..CLON::default() };
    store.clone_object(&clon(2, CloneKind::Partial)).unwrap();
    store.clone_object(&clon(3, CloneKind::Full)).unwrap();
    assert_eq!(Rc::strong_count(&data), 3);
    data.borrow_mut().samples[0] = 9;
    assert_eq!(store.get(2).unwrap().data.as_ref().unwrap().borrow().samples[0], 9);
    assert_eq!(store.get(3).unwrap().data.as_ref().unwrap().borrow().samples[0], 0);
    store.clone_object(&clon(4, CloneKind::Renumber)).unwrap();
    assert!(store.get(1).is_none());
    assert!(store.get(4).is_some());
    assert_eq!(store.clone_object(&clon(5, CloneKind::Full)), Err(FormatError::ObjectUnknown));
    drop(store);
    assert_eq!(Rc::strong_count(&data), 1);
  }

  #[test]
  fn test_clone_onto_frozen_fails() {
    let mut store = ObjectStore::new();
    store.get_or_create(1).location = (4, 5);
    store.get_or_create(2);
    store.freeze_all();
    let clon = CLON { source: 2, clone: 1, kind: CloneKind::Full, ..CLON::default() };
    assert_eq!(store.clone_object(&clon), Err(FormatError::ObjectExists));
    let renumber = CLON { kind: CloneKind::Renumber, ..clon };
    assert_eq!(store.clone_object(&renumber), Err(FormatError::ObjectExists));
    let kept = store.get(1).unwrap();
    assert_eq!(kept.location, (4, 5));
    assert!(kept.frozen);
    assert!(store.get(2).is_some());
  }

  #[test]
  fn test_seek_keeps_frozen() {
    let mut store = ObjectStore::new();
    store.get_or_create(1);
    store.freeze_all();
    store.get_or_create(2);
    store.discard_unfrozen();
    assert_eq!(store.ids().collect::<Vec<_>>(), [0, 1]);
  }

  #[test]
  fn test_next_id_after() {
    let mut store = ObjectStore::new();
    for id in [1, 3, 5] {
      store.get_or_create(id);
    }
    assert_eq!(store.next_id_after(1, 5), Some(3));
    assert_eq!(store.next_id_after(5, 5), None);
    assert_eq!(store.ids_in(5, 2), [3, 5]);
  }
}

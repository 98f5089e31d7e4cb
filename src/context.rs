//! The per-stream processing context.
//!
//! This is everything the validator needs to know about the chunks seen so
//! far: which header is open, which chunks the current image already has, the
//! global color values, the open loops, and the object ids in use. It's only
//! ever changed by [`ProcessContext::commit`], after a chunk fully validated.

use std::collections::BTreeMap;

use crate::{
  objects::ImageColors, Chunk, ChunkTag, CloneKind, ColorType, ErrorRecord, ImageHeader, PhysicalDims,
  Scoped, SignatureType, DHDR, JHDR, MHDR,
};

/// The image header chunk that's currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveHeader {
  /// Between images.
  #[default]
  None,
  /// `IHDR`
  Png(ImageHeader),
  /// `BASI`
  Basi(ImageHeader),
  /// `JHDR`
  Jng(JHDR),
  /// `DHDR`
  Delta(DHDR),
}
impl ActiveHeader {
  /// If any header is open.
  #[inline]
  #[must_use]
  pub const fn is_active(&self) -> bool {
    !matches!(self, Self::None)
  }

  /// The PNG style header, for `IHDR` and `BASI` images.
  #[inline]
  #[must_use]
  pub const fn image_header(&self) -> Option<&ImageHeader> {
    match self {
      Self::Png(h) | Self::Basi(h) => Some(h),
      _ => None,
    }
  }

  /// The color type that local color chunks have to fit.
  ///
  /// JNG color types are mapped onto their PNG equivalents.
  #[must_use]
  pub fn color_type(&self) -> Option<ColorType> {
    match self {
      Self::Png(h) | Self::Basi(h) => Some(h.format.color_type()),
      Self::Jng(j) => Some(match j.color_type {
        8 => ColorType::Y,
        12 => ColorType::YA,
        14 => ColorType::RGBA,
        _ => ColorType::RGB,
      }),
      _ => None,
    }
  }

  /// Bits per channel of the open image.
  #[must_use]
  pub fn bit_depth(&self) -> Option<u8> {
    match self {
      Self::Png(h) | Self::Basi(h) => Some(h.format.bits_per_channel()),
      Self::Jng(j) => Some(j.sample_depth),
      _ => None,
    }
  }
}

/// Which chunks the open image has had so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct LocalFlags {
  pub has_plte: bool,
  pub has_trns: bool,
  pub has_gama: bool,
  pub has_chrm: bool,
  pub has_srgb: bool,
  pub has_iccp: bool,
  pub has_bkgd: bool,
  pub has_sbit: bool,
  pub has_hist: bool,
  pub has_idat: bool,
  pub has_jdat: bool,
  pub has_jdaa: bool,
  pub has_jsep: bool,
}

/// Validation state for one stream.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
  /// Set once the signature was read.
  pub signature: Option<SignatureType>,
  /// The MNG header, for MNG streams.
  pub mhdr: Option<MHDR>,
  /// The header of the image being read.
  pub active: ActiveHeader,
  /// What the current image has had.
  pub local: LocalFlags,
  /// Color values of the current image. Only meaningful while a header is
  /// open.
  pub local_colors: ImageColors,
  /// Color values set at the top level of an MNG.
  pub globals: ImageColors,
  /// `pHYg`
  pub global_phys: Option<PhysicalDims>,
  /// Nest levels of the `LOOP`s not yet closed, outermost first.
  pub loop_levels: Vec<u8>,
  /// Object ids defined by `DEFI` or `CLON` and not discarded since, with
  /// whether a `SAVE` froze them. Object 0 is always there and isn't listed.
  pub objects: BTreeMap<u16, bool>,
  /// A `TERM` was seen.
  pub has_term: bool,
  /// A `SAVE` was seen.
  pub has_save: bool,
  /// The final chunk (`IEND` of a PNG or JNG, `MEND` of an MNG) was seen.
  pub ended: bool,
  /// How many chunks were committed.
  pub chunk_seq: u32,
  /// The previous chunk's tag.
  pub last_tag: Option<ChunkTag>,
  /// The last problem reported.
  pub last_error: Option<ErrorRecord>,
}
impl ProcessContext {
  /// A context for a stream with the given signature.
  #[inline]
  #[must_use]
  pub fn new(signature: SignatureType) -> Self {
    Self { signature: Some(signature), ..Self::default() }
  }

  /// If this is an MNG stream.
  #[inline]
  #[must_use]
  pub fn is_mng(&self) -> bool {
    self.signature == Some(SignatureType::Mng)
  }

  /// The frame size: from `MHDR`, or the single image's header.
  #[must_use]
  pub fn frame_size(&self) -> Option<(u32, u32)> {
    if let Some(m) = &self.mhdr {
      return Some((m.frame_width, m.frame_height));
    }
    match &self.active {
      ActiveHeader::Png(h) | ActiveHeader::Basi(h) => Some((h.width, h.height)),
      ActiveHeader::Jng(j) => Some((j.width, j.height)),
      _ => None,
    }
  }

  /// Ticks per second, treating 0 (unspecified) as 1000.
  #[inline]
  #[must_use]
  pub fn ticks_per_second(&self) -> u32 {
    match self.mhdr {
      Some(MHDR { ticks_per_second: tps @ 1.., .. }) => tps,
      _ => 1000,
    }
  }

  /// If an object with this id exists, as of the first pass through the
  /// stream.
  #[inline]
  #[must_use]
  pub fn has_object(&self, id: u16) -> bool {
    id == 0 || self.objects.contains_key(&id)
  }

  /// The color values an image decoded now would use: its local values, with
  /// anything missing taken from the globals.
  #[must_use]
  pub fn effective_colors(&self) -> ImageColors {
    let mut colors = self.local_colors.clone();
    colors.inherit_from(&self.globals);
    colors
  }

  fn open_header(&mut self, header: ActiveHeader) {
    self.active = header;
    self.local = LocalFlags::default();
    self.local_colors = ImageColors::default();
  }

  /// Applies a validated chunk.
  pub fn commit(&mut self, chunk: &Chunk) {
    log::trace!("commit {:?} (#{})", chunk.tag(), self.chunk_seq);
    match chunk {
      Chunk::IHDR(h) => self.open_header(ActiveHeader::Png(*h)),
      Chunk::BASI(b) => self.open_header(ActiveHeader::Basi(b.header)),
      Chunk::JHDR(j) => self.open_header(ActiveHeader::Jng(*j)),
      Chunk::DHDR(d) => self.open_header(ActiveHeader::Delta(*d)),
      Chunk::IEND => {
        self.open_header(ActiveHeader::None);
        if !self.is_mng() {
          self.ended = true;
        }
      }
      Chunk::MHDR(m) => self.mhdr = Some(*m),
      Chunk::MEND => {
        self.ended = true;
        self.loop_levels.clear();
      }
      Chunk::IDAT(_) => self.local.has_idat = true,
      Chunk::JDAT(_) => self.local.has_jdat = true,
      Chunk::JDAA(_) => self.local.has_jdaa = true,
      Chunk::JSEP => self.local.has_jsep = true,
      Chunk::sBIT(_) => self.local.has_sbit = true,
      Chunk::hIST(_) => self.local.has_hist = true,
      Chunk::PLTE(s) => {
        commit_scoped(s, &mut self.local.has_plte, &mut self.globals.palette, &mut self.local_colors.palette)
      }
      Chunk::tRNS(s) => {
        commit_scoped_opt(s, &mut self.local.has_trns, &mut self.globals.trns, &mut self.local_colors.trns)
      }
      Chunk::gAMA(s) => {
        commit_scoped_opt(s, &mut self.local.has_gama, &mut self.globals.gamma, &mut self.local_colors.gamma)
      }
      Chunk::cHRM(s) => {
        commit_scoped_opt(s, &mut self.local.has_chrm, &mut self.globals.chrm, &mut self.local_colors.chrm)
      }
      Chunk::sRGB(s) => {
        commit_scoped_opt(s, &mut self.local.has_srgb, &mut self.globals.srgb, &mut self.local_colors.srgb)
      }
      Chunk::iCCP(s) => {
        commit_scoped_opt(s, &mut self.local.has_iccp, &mut self.globals.iccp, &mut self.local_colors.iccp)
      }
      Chunk::bKGD(s) => {
        commit_scoped_opt(s, &mut self.local.has_bkgd, &mut self.globals.bkgd, &mut self.local_colors.bkgd)
      }
      Chunk::pHYg(p) => self.global_phys = *p,
      Chunk::LOOP(l) => self.loop_levels.push(l.level),
      Chunk::ENDL(level) => {
        if let Some(i) = self.loop_levels.iter().rposition(|l| l == level) {
          self.loop_levels.truncate(i);
        }
      }
      Chunk::DEFI(d) if d.object_id != 0 => {
        self.objects.entry(d.object_id).or_insert(false);
      }
      Chunk::CLON(c) => {
        let frozen = match c.kind {
          CloneKind::Renumber => self.objects.remove(&c.source).unwrap_or(false),
          _ => false,
        };
        self.objects.insert(c.clone, frozen);
      }
      Chunk::DISC(ids) if ids.is_empty() => self.objects.retain(|_, frozen| *frozen),
      Chunk::DISC(ids) => {
        for id in ids {
          if self.objects.get(id) == Some(&false) {
            self.objects.remove(id);
          }
        }
      }
      Chunk::TERM(_) => self.has_term = true,
      Chunk::SAVE(_) => {
        self.has_save = true;
        self.objects.values_mut().for_each(|frozen| *frozen = true);
      }
      Chunk::SEEK(_) => self.objects.retain(|_, frozen| *frozen),
      _ => (),
    }
    self.last_tag = Some(chunk.tag());
    self.chunk_seq += 1;
  }
}

fn commit_scoped<T: Clone + Default>(s: &Scoped<T>, flag: &mut bool, global: &mut T, local: &mut T) {
  match s {
    Scoped::Global(v) => *global = v.clone().unwrap_or_default(),
    Scoped::Local(v) | Scoped::Inherited(v) => {
      *flag = true;
      *local = v.clone();
    }
  }
}

fn commit_scoped_opt<T: Clone>(
  s: &Scoped<T>, flag: &mut bool, global: &mut Option<T>, local: &mut Option<T>,
) {
  match s {
    Scoped::Global(v) => global.clone_from(v),
    Scoped::Local(v) | Scoped::Inherited(v) => {
      *flag = true;
      *local = Some(v.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{PixelFormat, RGB8};

  #[test]
  fn test_header_resets_local_state() {
    let mut ctx = ProcessContext::new(SignatureType::Mng);
    let pal = vec![RGB8 { r: 1, g: 2, b: 3 }];
    ctx.commit(&Chunk::PLTE(Scoped::Global(Some(pal.clone()))));
    assert_eq!(ctx.globals.palette, pal);
    let h = ImageHeader { width: 1, height: 1, format: PixelFormat::I8, intrapixel: false, interlaced: false };
    ctx.commit(&Chunk::IHDR(h));
    ctx.commit(&Chunk::PLTE(Scoped::Inherited(pal.clone())));
    assert!(ctx.local.has_plte);
    ctx.commit(&Chunk::IEND);
    assert!(!ctx.local.has_plte);
    assert!(ctx.local_colors.palette.is_empty());
    assert!(!ctx.ended);
    ctx.commit(&Chunk::PLTE(Scoped::Global(None)));
    assert!(ctx.globals.palette.is_empty());
    assert_eq!(ctx.chunk_seq, 5);
  }

  #[test]
  fn test_object_ids_follow_defi_clon_disc() {
    let mut ctx = ProcessContext::new(SignatureType::Mng);
    let defi = |object_id| Chunk::DEFI(crate::DEFI { object_id, ..crate::DEFI::default() });
    let clon = |source, clone, kind| Chunk::CLON(crate::CLON { source, clone, kind, ..crate::CLON::default() });
    ctx.commit(&defi(1));
    ctx.commit(&defi(2));
    ctx.commit(&Chunk::SAVE(crate::SAVE::default()));
    ctx.commit(&clon(2, 3, CloneKind::Renumber));
    ctx.commit(&clon(1, 4, CloneKind::Partial));
    assert!(!ctx.has_object(2));
    assert_eq!(ctx.objects.get(&3), Some(&true));
    assert_eq!(ctx.objects.get(&4), Some(&false));
    ctx.commit(&Chunk::DISC(vec![1, 4]));
    assert!(ctx.has_object(1));
    assert!(!ctx.has_object(4));
    ctx.commit(&defi(5));
    ctx.commit(&Chunk::SEEK(String::new()));
    assert_eq!(ctx.objects.keys().copied().collect::<Vec<_>>(), [1, 3]);
    assert!(ctx.has_object(0));
  }

  #[test]
  fn test_loop_levels() {
    let mut ctx = ProcessContext::new(SignatureType::Mng);
    let lp = |level: u8| Chunk::LOOP(crate::LOOP::try_from(&[level, 0, 0, 0, 2][..]).unwrap());
    ctx.commit(&lp(0));
    ctx.commit(&lp(1));
    ctx.commit(&Chunk::ENDL(1));
    assert_eq!(ctx.loop_levels, [0]);
    ctx.commit(&lp(1));
    ctx.commit(&Chunk::ENDL(0));
    assert!(ctx.loop_levels.is_empty());
  }
}

#![allow(non_camel_case_types)]
#![allow(nonstandard_style)]

//! The chunk types of PNG, JNG, and MNG streams.
//!
//! Every stream is a signature followed by chunks. Each chunk is a big-endian
//! `u32` length, a four byte tag, that many bytes of payload, and a CRC32 of
//! the tag and payload.
//!
//! The types here are the *parsed* payloads. They're produced by the
//! validator (which also checks them against the stream's grammar) and are
//! what gets kept when chunk storage is turned on.

use core::fmt::{Debug, Write};

use crate::{parser_helpers::*, pixel_formats::*, FormatError, RenderingIntent};

mod raw;
pub use raw::*;

mod png;
pub use png::*;

mod mng;
pub use mng::*;

mod jng_delta;
pub use jng_delta::*;

/// A four byte chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkTag(pub [u8; 4]);
#[allow(missing_docs)]
impl ChunkTag {
  // PNG
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const cHRM: Self = Self(*b"cHRM");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const iCCP: Self = Self(*b"iCCP");
  pub const bKGD: Self = Self(*b"bKGD");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const zTXt: Self = Self(*b"zTXt");
  pub const iTXt: Self = Self(*b"iTXt");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const sBIT: Self = Self(*b"sBIT");
  pub const sPLT: Self = Self(*b"sPLT");
  pub const hIST: Self = Self(*b"hIST");
  pub const tIME: Self = Self(*b"tIME");
  // MNG
  pub const MHDR: Self = Self(*b"MHDR");
  pub const MEND: Self = Self(*b"MEND");
  pub const LOOP: Self = Self(*b"LOOP");
  pub const ENDL: Self = Self(*b"ENDL");
  pub const DEFI: Self = Self(*b"DEFI");
  pub const BASI: Self = Self(*b"BASI");
  pub const CLON: Self = Self(*b"CLON");
  pub const PAST: Self = Self(*b"PAST");
  pub const DISC: Self = Self(*b"DISC");
  pub const BACK: Self = Self(*b"BACK");
  pub const FRAM: Self = Self(*b"FRAM");
  pub const MOVE: Self = Self(*b"MOVE");
  pub const CLIP: Self = Self(*b"CLIP");
  pub const SHOW: Self = Self(*b"SHOW");
  pub const TERM: Self = Self(*b"TERM");
  pub const SAVE: Self = Self(*b"SAVE");
  pub const SEEK: Self = Self(*b"SEEK");
  pub const eXPI: Self = Self(*b"eXPI");
  pub const fPRI: Self = Self(*b"fPRI");
  pub const nEED: Self = Self(*b"nEED");
  pub const pHYg: Self = Self(*b"pHYg");
  pub const MAGN: Self = Self(*b"MAGN");
  // JNG
  pub const JHDR: Self = Self(*b"JHDR");
  pub const JDAT: Self = Self(*b"JDAT");
  pub const JDAA: Self = Self(*b"JDAA");
  pub const JSEP: Self = Self(*b"JSEP");
  // Delta-PNG
  pub const DHDR: Self = Self(*b"DHDR");
  pub const PROM: Self = Self(*b"PROM");
  pub const IPNG: Self = Self(*b"IPNG");
  pub const PPLT: Self = Self(*b"PPLT");
  pub const IJNG: Self = Self(*b"IJNG");
  pub const DROP: Self = Self(*b"DROP");
  pub const DBYK: Self = Self(*b"DBYK");
  pub const ORDR: Self = Self(*b"ORDR");

  /// Critical chunks have an uppercase first letter.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0x20) == 0
  }
}
impl Debug for ChunkTag {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char(self.0[0] as char)?;
    f.write_char(self.0[1] as char)?;
    f.write_char(self.0[2] as char)?;
    f.write_char(self.0[3] as char)?;
    Ok(())
  }
}

/// Where a color chunk's value applies.
///
/// The color chunks can appear at the top level of an MNG, where they set a
/// global default, or inside an image, where they only affect that image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scoped<T> {
  /// Sets the global value. `None` means an empty chunk cleared it.
  Global(Option<T>),
  /// Applies to the current image only.
  Local(T),
  /// An empty local chunk picking up the global value.
  Inherited(T),
}
impl<T> Scoped<T> {
  /// The value, for a local or inherited chunk.
  #[inline]
  #[must_use]
  pub fn local(&self) -> Option<&T> {
    match self {
      Self::Local(t) | Self::Inherited(t) => Some(t),
      Self::Global(_) => None,
    }
  }
}

/// A parsed and validated chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Chunk {
  IHDR(ImageHeader),
  PLTE(Scoped<Vec<RGB8>>),
  IDAT(Vec<u8>),
  IEND,
  tRNS(Scoped<Transparency>),
  gAMA(Scoped<u32>),
  cHRM(Scoped<Chromaticities>),
  sRGB(Scoped<RenderingIntent>),
  iCCP(Scoped<IccProfile>),
  bKGD(Scoped<Background>),
  /// `tEXt`, `zTXt`, and `iTXt`, already decompressed.
  Text(TextChunk),
  pHYs(PhysicalDims),
  sBIT(Vec<u8>),
  sPLT(SuggestedPalette),
  hIST(Vec<u16>),
  tIME(Time),
  MHDR(MHDR),
  MEND,
  LOOP(LOOP),
  ENDL(u8),
  DEFI(DEFI),
  BASI(BASI),
  CLON(CLON),
  PAST(PAST),
  DISC(Vec<u16>),
  BACK(BACK),
  FRAM(FRAM),
  MOVE(MOVE),
  CLIP(CLIP),
  SHOW(SHOW),
  TERM(TERM),
  SAVE(SAVE),
  SEEK(String),
  eXPI(EXPI),
  fPRI(FPRI),
  nEED(Vec<String>),
  /// Empty payload clears the global physical dimensions.
  pHYg(Option<PhysicalDims>),
  MAGN(MAGN),
  JHDR(JHDR),
  JDAT(Vec<u8>),
  JDAA(Vec<u8>),
  JSEP,
  DHDR(DHDR),
  PROM(PROM),
  IPNG,
  PPLT(PPLT),
  IJNG,
  DROP(Vec<ChunkTag>),
  DBYK(DBYK),
  ORDR(Vec<(ChunkTag, u8)>),
  /// An ancillary chunk this decoder doesn't interpret.
  Unknown {
    tag: ChunkTag,
    data: Vec<u8>,
  },
}
impl Chunk {
  /// The tag this chunk had in the stream.
  #[must_use]
  pub fn tag(&self) -> ChunkTag {
    match self {
      Self::IHDR(_) => ChunkTag::IHDR,
      Self::PLTE(_) => ChunkTag::PLTE,
      Self::IDAT(_) => ChunkTag::IDAT,
      Self::IEND => ChunkTag::IEND,
      Self::tRNS(_) => ChunkTag::tRNS,
      Self::gAMA(_) => ChunkTag::gAMA,
      Self::cHRM(_) => ChunkTag::cHRM,
      Self::sRGB(_) => ChunkTag::sRGB,
      Self::iCCP(_) => ChunkTag::iCCP,
      Self::bKGD(_) => ChunkTag::bKGD,
      Self::Text(t) => t.kind.tag(),
      Self::pHYs(_) => ChunkTag::pHYs,
      Self::sBIT(_) => ChunkTag::sBIT,
      Self::sPLT(_) => ChunkTag::sPLT,
      Self::hIST(_) => ChunkTag::hIST,
      Self::tIME(_) => ChunkTag::tIME,
      Self::MHDR(_) => ChunkTag::MHDR,
      Self::MEND => ChunkTag::MEND,
      Self::LOOP(_) => ChunkTag::LOOP,
      Self::ENDL(_) => ChunkTag::ENDL,
      Self::DEFI(_) => ChunkTag::DEFI,
      Self::BASI(_) => ChunkTag::BASI,
      Self::CLON(_) => ChunkTag::CLON,
      Self::PAST(_) => ChunkTag::PAST,
      Self::DISC(_) => ChunkTag::DISC,
      Self::BACK(_) => ChunkTag::BACK,
      Self::FRAM(_) => ChunkTag::FRAM,
      Self::MOVE(_) => ChunkTag::MOVE,
      Self::CLIP(_) => ChunkTag::CLIP,
      Self::SHOW(_) => ChunkTag::SHOW,
      Self::TERM(_) => ChunkTag::TERM,
      Self::SAVE(_) => ChunkTag::SAVE,
      Self::SEEK(_) => ChunkTag::SEEK,
      Self::eXPI(_) => ChunkTag::eXPI,
      Self::fPRI(_) => ChunkTag::fPRI,
      Self::nEED(_) => ChunkTag::nEED,
      Self::pHYg(_) => ChunkTag::pHYg,
      Self::MAGN(_) => ChunkTag::MAGN,
      Self::JHDR(_) => ChunkTag::JHDR,
      Self::JDAT(_) => ChunkTag::JDAT,
      Self::JDAA(_) => ChunkTag::JDAA,
      Self::JSEP => ChunkTag::JSEP,
      Self::DHDR(_) => ChunkTag::DHDR,
      Self::PROM(_) => ChunkTag::PROM,
      Self::IPNG => ChunkTag::IPNG,
      Self::PPLT(_) => ChunkTag::PPLT,
      Self::IJNG => ChunkTag::IJNG,
      Self::DROP(_) => ChunkTag::DROP,
      Self::DBYK(_) => ChunkTag::DBYK,
      Self::ORDR(_) => ChunkTag::ORDR,
      Self::Unknown { tag, .. } => *tag,
    }
  }
}

#[test]
fn test_chunk_tag_critical_bit() {
  assert!(ChunkTag::IHDR.is_critical());
  assert!(ChunkTag::MHDR.is_critical());
  assert!(!ChunkTag::tRNS.is_critical());
  assert!(!ChunkTag::eXPI.is_critical());
  assert_eq!(std::format!("{:?}", ChunkTag::pHYg), "pHYg");
}

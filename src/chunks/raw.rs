use super::*;

/// The reflected CRC32 polynomial PNG uses.
const CRC_POLY: u32 = 0xEDB8_8320;

/// The register after shifting each possible low byte out of it.
const CRC_TABLE: [u32; 256] = {
  let mut table = [0_u32; 256];
  let mut b = 0;
  while b < table.len() {
    let mut reg = b as u32;
    let mut bit = 0;
    while bit < 8 {
      // all ones when the bit shifted out is set
      let mask = (reg & 1).wrapping_neg();
      reg = (reg >> 1) ^ (CRC_POLY & mask);
      bit += 1;
    }
    table[b] = reg;
    b += 1;
  }
  table
};

/// The CRC32 of a chunk, which covers the tag and the payload.
#[inline]
#[must_use]
pub fn chunk_crc(tag: ChunkTag, data: &[u8]) -> u32 {
  let reg = tag.0.iter().chain(data).fold(u32::MAX, |reg, &byte| {
    CRC_TABLE[usize::from(reg as u8 ^ byte)] ^ (reg >> 8)
  });
  !reg
}

/// Which flavor of stream the signature announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignatureType {
  /// A single PNG image.
  Png,
  /// A single JPEG Network Graphics image.
  Jng,
  /// A Multiple-image Network Graphics stream.
  Mng,
}
impl SignatureType {
  /// The eight signature bytes for this stream type.
  #[inline]
  #[must_use]
  pub const fn signature(self) -> [u8; 8] {
    match self {
      Self::Png => PNG_SIGNATURE,
      Self::Jng => JNG_SIGNATURE,
      Self::Mng => MNG_SIGNATURE,
    }
  }
}

/// The first eight bytes of a PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
/// The first eight bytes of a JNG datastream.
pub const JNG_SIGNATURE: [u8; 8] = [139, 74, 78, 71, 13, 10, 26, 10];
/// The first eight bytes of an MNG datastream.
pub const MNG_SIGNATURE: [u8; 8] = [138, 77, 78, 71, 13, 10, 26, 10];

/// Works out the stream type from its first eight bytes.
#[inline]
#[must_use]
pub const fn detect_signature(bytes: &[u8]) -> Option<SignatureType> {
  match bytes {
    [137, 80, 78, 71, 13, 10, 26, 10, ..] => Some(SignatureType::Png),
    [139, 74, 78, 71, 13, 10, 26, 10, ..] => Some(SignatureType::Jng),
    [138, 77, 78, 71, 13, 10, 26, 10, ..] => Some(SignatureType::Mng),
    _ => None,
  }
}

/// An unparsed chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  /// The chunk's tag.
  pub tag: ChunkTag,
  /// The chunk's payload.
  pub data: &'b [u8],
  /// The CRC value written in the stream.
  pub declared_crc: u32,
}
impl RawChunk<'_> {
  /// If the declared CRC matches the computed one.
  #[inline]
  #[must_use]
  pub fn crc_is_correct(&self) -> bool {
    chunk_crc(self.tag, self.data) == self.declared_crc
  }
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("tag", &self.tag)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// An iterator that produces successive raw chunks from in-memory bytes.
///
/// The decoder itself pulls bytes through the [`Host`](crate::Host), this is
/// for inspecting a stream you already have as a slice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RawChunkIter<'b>(pub(crate) &'b [u8]);
impl<'b> RawChunkIter<'b> {
  /// Pass the full stream bytes, it will remove the signature automatically.
  #[inline]
  pub const fn new(bytes: &'b [u8]) -> Self {
    match bytes {
      [_, _, _, _, _, _, _, _, rest @ ..] => Self(rest),
      _ => Self(&[]),
    }
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = RawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let (len_bytes, rest) = try_pull_byte_array::<4>(self.0).ok()?;
    let chunk_len = u32::from_be_bytes(len_bytes) as usize;
    let (tag_bytes, rest) = try_pull_byte_array::<4>(rest).ok()?;
    if rest.len() < chunk_len {
      self.0 = &[];
      return None;
    }
    let (data, rest) = rest.split_at(chunk_len);
    let (crc_bytes, rest) = try_pull_byte_array::<4>(rest).ok()?;
    self.0 = rest;
    Some(RawChunk { tag: ChunkTag(tag_bytes), data, declared_crc: u32::from_be_bytes(crc_bytes) })
  }
}

#[test]
fn test_crc_of_iend() {
  // every PNG ends with this exact chunk
  assert_eq!(chunk_crc(ChunkTag::IEND, &[]), 0xAE42_6082);
  // the usual CRC32 check value, split across tag and data
  assert_eq!(chunk_crc(ChunkTag(*b"1234"), b"56789"), 0xCBF4_3926);
}

#[test]
fn test_detect_signature() {
  assert_eq!(detect_signature(&MNG_SIGNATURE), Some(SignatureType::Mng));
  assert_eq!(detect_signature(&JNG_SIGNATURE), Some(SignatureType::Jng));
  assert_eq!(detect_signature(&PNG_SIGNATURE), Some(SignatureType::Png));
  assert_eq!(detect_signature(&[1, 2, 3]), None);
}

//! Shorthands for pulling big-endian fields off the front of chunk payloads.

use crate::FormatError;

#[inline]
pub(crate) fn try_pull_byte_array<const N: usize>(
  bytes: &[u8],
) -> Result<([u8; N], &[u8]), FormatError> {
  if bytes.len() >= N {
    let (head, tail) = bytes.split_at(N);
    let a: [u8; N] = head.try_into().map_err(|_| FormatError::InvalidLength)?;
    Ok((a, tail))
  } else {
    Err(FormatError::InvalidLength)
  }
}

#[inline]
pub(crate) fn try_pull_u8(bytes: &[u8]) -> Result<(u8, &[u8]), FormatError> {
  match bytes {
    [u, rest @ ..] => Ok((*u, rest)),
    [] => Err(FormatError::InvalidLength),
  }
}

#[inline]
pub(crate) fn try_pull_u16_be(bytes: &[u8]) -> Result<(u16, &[u8]), FormatError> {
  let (a, rest) = try_pull_byte_array::<2>(bytes)?;
  Ok((u16::from_be_bytes(a), rest))
}

#[inline]
pub(crate) fn try_pull_u32_be(bytes: &[u8]) -> Result<(u32, &[u8]), FormatError> {
  let (a, rest) = try_pull_byte_array::<4>(bytes)?;
  Ok((u32::from_be_bytes(a), rest))
}

#[inline]
pub(crate) fn try_pull_i32_be(bytes: &[u8]) -> Result<(i32, &[u8]), FormatError> {
  let (a, rest) = try_pull_byte_array::<4>(bytes)?;
  Ok((i32::from_be_bytes(a), rest))
}

/// Reads a big-endian `u32` at `offset`, or 0 past the end.
///
/// Only for payloads whose length was already checked.
#[inline]
#[must_use]
pub(crate) fn u32_be_at(bytes: &[u8], offset: usize) -> u32 {
  match bytes.get(offset..offset + 4) {
    Some([a, b, c, d]) => u32::from_be_bytes([*a, *b, *c, *d]),
    _ => 0,
  }
}

/// Reads a big-endian `u16` at `offset`, or 0 past the end.
#[inline]
#[must_use]
pub(crate) fn u16_be_at(bytes: &[u8], offset: usize) -> u16 {
  match bytes.get(offset..offset + 2) {
    Some([a, b]) => u16::from_be_bytes([*a, *b]),
    _ => 0,
  }
}

/// Reads a big-endian `i32` at `offset`, or 0 past the end.
#[inline]
#[must_use]
pub(crate) fn i32_be_at(bytes: &[u8], offset: usize) -> i32 {
  u32_be_at(bytes, offset) as i32
}

/// Splits a null terminated keyword off the front of the bytes.
///
/// PNG keywords are 1 to 79 bytes long.
pub(crate) fn split_keyword(bytes: &[u8]) -> Result<(&[u8], &[u8]), FormatError> {
  let nul = bytes.iter().position(|&u| u == 0).ok_or(FormatError::NullNotFound)?;
  if nul == 0 {
    return Err(FormatError::KeywordNull);
  }
  if nul > 79 {
    return Err(FormatError::InvalidLength);
  }
  Ok((&bytes[..nul], &bytes[nul + 1..]))
}

/// Latin-1 bytes to a `String`, one `char` per byte.
#[must_use]
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
  bytes.iter().map(|&u| u as char).collect()
}

#[test]
fn test_split_keyword() {
  assert_eq!(split_keyword(b"Title\0hello"), Ok((&b"Title"[..], &b"hello"[..])));
  assert_eq!(split_keyword(b"\0hello"), Err(FormatError::KeywordNull));
  assert_eq!(split_keyword(b"Title"), Err(FormatError::NullNotFound));
  assert_eq!(split_keyword(b"T\0"), Ok((&b"T"[..], &b""[..])));
}

#[test]
fn test_pull_fields() {
  let bytes = [0, 0, 1, 0, 0xFF, 0xFE, 7];
  let (a, rest) = try_pull_u32_be(&bytes).unwrap();
  assert_eq!(a, 256);
  let (b, rest) = try_pull_u16_be(rest).unwrap();
  assert_eq!(b, 0xFFFE);
  let (c, rest) = try_pull_u8(rest).unwrap();
  assert_eq!(c, 7);
  assert!(rest.is_empty());
  assert_eq!(try_pull_u8(rest), Err(FormatError::InvalidLength));
  assert_eq!(u32_be_at(&bytes, 0), 256);
  assert_eq!(u32_be_at(&bytes, 5), 0);
  assert_eq!(i32_be_at(&[0xFF, 0xFF, 0xFF, 0xFE], 0), -2);
}

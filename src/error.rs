use core::{
  fmt,
  num::{ParseIntError, TryFromIntError},
  str::Utf8Error,
};

use crate::chunks::ChunkTag;

/// A grammar, length, sequence, or value violation in the datastream.
///
/// When one of these comes back from a chunk, none of that chunk's effects
/// were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FormatError {
  InvalidSignature,
  CrcMismatch,
  InvalidLength,
  SequenceError,
  ChunkNotAllowed,
  MultipleError,
  InvalidColortype,
  InvalidBitdepth,
  InvalidCompress,
  InvalidFilter,
  InvalidInterlace,
  CannotBeEmpty,
  GlobalLengthErr,
  NullNotFound,
  KeywordNull,
  PLTEMissing,
  IDATMissing,
  /// A palette index went past the end of the palette.
  PLTEIndexError,
  /// An `ENDL` with no open `LOOP` at the same nest level.
  NoMatchingLoop,
  /// A field holds a value outside of its allowed set.
  InvalidFieldValue,
  /// An object id that was never defined, or was discarded.
  ObjectUnknown,
  /// A new object would take an id that's already in use.
  ObjectExists,
  /// A critical chunk this decoder doesn't know about.
  UnknownCritical,
  /// The stream ended (or a chunk arrived) before any header chunk.
  NoHeader,
  /// The stream ended in the middle of a chunk or image.
  UnexpectedEnd,
}
impl FormatError {
  /// A short human readable description.
  #[inline]
  #[must_use]
  pub const fn message(self) -> &'static str {
    match self {
      Self::InvalidSignature => "invalid stream signature",
      Self::CrcMismatch => "chunk CRC does not match",
      Self::InvalidLength => "invalid chunk length",
      Self::SequenceError => "chunk out of sequence",
      Self::ChunkNotAllowed => "chunk not allowed here",
      Self::MultipleError => "chunk may only appear once",
      Self::InvalidColortype => "invalid color type",
      Self::InvalidBitdepth => "invalid bit depth",
      Self::InvalidCompress => "invalid compression method",
      Self::InvalidFilter => "invalid filter method",
      Self::InvalidInterlace => "invalid interlace method",
      Self::CannotBeEmpty => "chunk cannot be empty without a global value",
      Self::GlobalLengthErr => "global chunk does not fit the local image",
      Self::NullNotFound => "null separator not found",
      Self::KeywordNull => "keyword is empty",
      Self::PLTEMissing => "palette missing",
      Self::IDATMissing => "image data missing",
      Self::PLTEIndexError => "palette index out of range",
      Self::NoMatchingLoop => "no matching LOOP for ENDL",
      Self::InvalidFieldValue => "invalid field value",
      Self::ObjectUnknown => "object does not exist",
      Self::ObjectExists => "object id already in use",
      Self::UnknownCritical => "unknown critical chunk",
      Self::NoHeader => "no header chunk",
      Self::UnexpectedEnd => "unexpected end of stream",
    }
  }
}
impl fmt::Display for FormatError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.message())
  }
}

/// Running out of something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceError {
  /// The allocator couldn't give us enough space.
  OutOfMemory,
  /// An inflate output buffer would have to grow past the configured limit.
  BufferOverflow,
  /// The image is larger than the configured limits and the host declined to
  /// continue.
  ImageTooBig,
}

/// A host callback reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IoError {
  OpenStream,
  CloseStream,
  ReadData,
  ProcessHeader,
  ProcessText,
  CanvasLine,
  Refresh,
  SetTimer,
  CorrectRow,
}

/// Features this decoder knows about but does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsupported {
  /// JNG pixel data needs a JPEG decoder.
  Jpeg,
  /// Delta-PNG images.
  Delta,
  /// PAST composition.
  Past,
  /// MAGN object magnification.
  Magnification,
  /// A `nEED` keyword the decoder can't satisfy.
  Need,
  /// The requested operation needs stored chunks.
  NoStorage,
  /// Writing streams is not implemented.
  Write,
}

/// An error from the `mngine` crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MngError {
  /// The datastream broke a rule.
  Format(FormatError),
  /// Memory or buffer limits.
  Resource(ResourceError),
  /// A host callback failed.
  Io(IoError),
  /// Something we don't do (yet).
  Unsupported(Unsupported),
  /// The zlib stream was corrupt.
  Inflate,
  /// The ICC library rejected a profile or transform.
  Profile(String),
  /// The call doesn't fit the decoder's current state (eg: `resume` when not
  /// suspended).
  InvalidState,
}
impl fmt::Display for MngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Format(e) => write!(f, "format error: {e}"),
      Self::Resource(e) => write!(f, "resource error: {e:?}"),
      Self::Io(e) => write!(f, "host callback failed: {e:?}"),
      Self::Unsupported(u) => write!(f, "unsupported: {u:?}"),
      Self::Inflate => f.write_str("corrupt zlib stream"),
      Self::Profile(msg) => write!(f, "color profile error: {msg}"),
      Self::InvalidState => f.write_str("invalid decoder state for this call"),
    }
  }
}
impl std::error::Error for MngError {}
impl From<FormatError> for MngError {
  #[inline]
  fn from(e: FormatError) -> Self {
    Self::Format(e)
  }
}
impl From<ResourceError> for MngError {
  #[inline]
  fn from(e: ResourceError) -> Self {
    Self::Resource(e)
  }
}
impl From<IoError> for MngError {
  #[inline]
  fn from(e: IoError) -> Self {
    Self::Io(e)
  }
}
impl From<Unsupported> for MngError {
  #[inline]
  fn from(u: Unsupported) -> Self {
    Self::Unsupported(u)
  }
}
impl From<std::collections::TryReserveError> for MngError {
  #[inline]
  fn from(_: std::collections::TryReserveError) -> Self {
    Self::Resource(ResourceError::OutOfMemory)
  }
}
impl From<Utf8Error> for MngError {
  #[inline]
  fn from(_: Utf8Error) -> Self {
    Self::Format(FormatError::InvalidFieldValue)
  }
}
impl From<ParseIntError> for MngError {
  #[inline]
  fn from(_: ParseIntError) -> Self {
    Self::Format(FormatError::InvalidFieldValue)
  }
}
impl From<TryFromIntError> for MngError {
  #[inline]
  fn from(_: TryFromIntError) -> Self {
    Self::Format(FormatError::InvalidFieldValue)
  }
}

/// Result alias used throughout the crate.
pub type MngResult<T> = Result<T, MngError>;

/// How bad a reported problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
  /// Informational, decoding carries on.
  Warning,
  /// The current call failed.
  Error,
}

/// The record of the most recent problem, retrievable after a failing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
  /// Warning or error.
  pub severity: Severity,
  /// The error itself.
  pub error: MngError,
  /// The chunk being handled at the time, if any.
  pub chunk: Option<ChunkTag>,
  /// Zero-based sequence number of that chunk within the stream.
  pub chunk_seq: u32,
  /// Error specific detail (eg: the offending length).
  pub extra1: i64,
  /// Error specific detail (eg: the expected length).
  pub extra2: i64,
  /// Human readable text.
  pub message: String,
}
impl ErrorRecord {
  /// Builds a record for `error` raised while handling `chunk`.
  #[must_use]
  pub fn new(
    severity: Severity, error: MngError, chunk: Option<ChunkTag>, chunk_seq: u32,
  ) -> Self {
    let message = match chunk {
      Some(tag) => std::format!("{tag:?} (#{chunk_seq}): {error}"),
      None => std::format!("{error}"),
    };
    Self { severity, error, chunk, chunk_seq, extra1: 0, extra2: 0, message }
  }

  /// Attaches the two numeric extras.
  #[inline]
  #[must_use]
  pub fn with_extras(mut self, extra1: i64, extra2: i64) -> Self {
    self.extra1 = extra1;
    self.extra2 = extra2;
    self
  }
}
impl fmt::Display for ErrorRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}: {}", self.severity, self.message)
  }
}

//! The callbacks a decoder makes into its host application.

use crate::{pixels::CanonicalRow, ErrorRecord, IoError, Severity, TextChunk};

/// Everything the decoder needs from the outside world.
///
/// Methods with defaults can be skipped. The required ones are for getting
/// bytes in and pixels out.
///
/// Timing uses milliseconds throughout. The decoder never sleeps: when a
/// frame has to wait it calls [`set_timer`](Host::set_timer), returns from
/// the call that was running, and expects the host to call
/// [`Decoder::resume`](crate::Decoder::resume) once the timer fires.
pub trait Host {
  /// Called once before the first read.
  #[inline]
  fn open_stream(&mut self) -> bool {
    true
  }

  /// Called once the stream has ended.
  #[inline]
  fn close_stream(&mut self) -> bool {
    true
  }

  /// Fills `buf` with stream bytes.
  ///
  /// Returns how many bytes were written. 0 means the stream ended.
  fn read_data(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

  /// The stream header gave the canvas size.
  ///
  /// Returning `false` stops decoding.
  #[inline]
  fn process_header(&mut self, width: u32, height: u32) -> bool {
    let _ = (width, height);
    true
  }

  /// A text chunk was found.
  #[inline]
  fn process_text(&mut self, text: &TextChunk) -> bool {
    log::debug!("text chunk {:?}: {:?}", text.keyword, text.text);
    true
  }

  /// The canvas scanline for `row`, in the configured
  /// [`CanvasStyle`](crate::CanvasStyle).
  ///
  /// `None` means the host has no canvas for that row. That's reported as an
  /// error.
  fn canvas_line(&mut self, row: u32) -> Option<&mut [u8]>;

  /// Lets the host provide its own background for `row`, as RGBA8 bytes.
  ///
  /// Returning `false` (the default) means the decoder should use the
  /// stream's background instead.
  #[inline]
  fn background_line(&mut self, row: u32, dst: &mut [u8]) -> bool {
    let _ = (row, dst);
    false
  }

  /// This area of the canvas changed and should be shown.
  #[inline]
  fn refresh(&mut self, x: u32, y: u32, width: u32, height: u32) -> bool {
    let _ = (x, y, width, height);
    true
  }

  /// Milliseconds since some fixed point.
  fn tick_count(&mut self) -> u32;

  /// Asks for a [`Decoder::resume`](crate::Decoder::resume) call after this
  /// many milliseconds.
  fn set_timer(&mut self, ms: u32) -> bool;

  /// A warning was raised. Returning `false` turns it into an error.
  #[inline]
  fn warning(&mut self, record: &ErrorRecord) -> bool {
    debug_assert_eq!(record.severity, Severity::Warning);
    log::warn!("{record}");
    true
  }

  /// Color corrects a row when the color mode is
  /// [`AppManaged`](crate::ColorMode::AppManaged).
  #[inline]
  fn correct_row(&mut self, row: &mut CanonicalRow) -> bool {
    let _ = row;
    true
  }
}

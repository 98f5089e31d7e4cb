//! The recorded animation script.
//!
//! While a `LOOP` is open, or once a `TERM` was seen, every display chunk is
//! also kept here as an [`AnimationObject`]. A matching `ENDL` rewinds the
//! replay cursor to just after its `LOOP`, and `TERM` can replay the whole
//! list from the top once the stream ends.
//!
//! The script only knows the loop bookkeeping. Running an object is up to the
//! display, which uses the same code for live chunks and replays.

use crate::{objects::SharedImageData, FormatError, BACK, CLIP, CLON, DEFI, FRAM, LOOP, MOVE, SHOW, TERM};

/// An image as it was when it finished decoding.
#[derive(Debug, Clone)]
pub struct ImageSnapshot {
  /// The object it was decoded into.
  pub id: u16,
  /// Its pixels. Holding this keeps them alive after the object is gone.
  pub data: SharedImageData,
}

/// A `LOOP` with its running count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopState {
  /// Nest level.
  pub level: u8,
  /// Total passes, see [`LOOP::effective_repeat`].
  pub repeat: u32,
  /// Passes still to go, counting the current one.
  pub remaining: u32,
  /// How many loops were open around this one.
  pub depth: u32,
  /// Layer count when the current pass started.
  pub layers_at_start: u32,
}
impl LoopState {
  /// Starts the loop state for a `LOOP` chunk.
  #[must_use]
  pub fn new(chunk: &LOOP, depth: u32) -> Self {
    let repeat = chunk.effective_repeat();
    Self { level: chunk.level, repeat, remaining: repeat, depth, layers_at_start: 0 }
  }

  /// If the loop never ends by count.
  #[inline]
  #[must_use]
  pub const fn is_infinite(&self) -> bool {
    self.repeat >= LOOP::INFINITE
  }
}

/// One recorded display instruction.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum AnimationObject {
  Image(ImageSnapshot),
  Basi(ImageSnapshot),
  Loop(LoopState),
  Endl(u8),
  Defi(DEFI),
  Clon(CLON),
  Back(BACK),
  Fram(FRAM),
  Move(MOVE),
  Clip(CLIP),
  Show(SHOW),
  Term(TERM),
  Disc(Vec<u16>),
}

/// What an `ENDL` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndlOutcome {
  /// Another pass: replay from this index.
  Rewind(usize),
  /// The loop is done.
  Finished {
    /// It was not nested in another loop.
    outermost: bool,
  },
  /// An infinite loop made a whole pass without showing anything, and was
  /// stopped.
  Broken {
    /// It was not nested in another loop.
    outermost: bool,
  },
}

/// The recorded objects and the replay cursor.
#[derive(Debug, Clone, Default)]
pub struct AnimationScript {
  objects: Vec<AnimationObject>,
  cursor: Option<usize>,
  open_loops: u32,
  term_active: bool,
}
impl AnimationScript {
  /// An empty script.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { objects: Vec::new(), cursor: None, open_loops: 0, term_active: false }
  }

  /// The recorded objects.
  #[inline]
  #[must_use]
  pub fn objects(&self) -> &[AnimationObject] {
    &self.objects
  }

  /// If live chunks are being recorded.
  #[inline]
  #[must_use]
  pub const fn is_recording(&self) -> bool {
    self.cursor.is_none() && (self.term_active || self.open_loops > 0)
  }

  /// If a replay is in progress.
  #[inline]
  #[must_use]
  pub const fn is_replaying(&self) -> bool {
    self.cursor.is_some()
  }

  /// If a `TERM` keeps the script alive past its loops.
  #[inline]
  #[must_use]
  pub const fn term_active(&self) -> bool {
    self.term_active
  }

  /// Live loops opened and not yet closed.
  #[inline]
  #[must_use]
  pub const fn open_loops(&self) -> u32 {
    self.open_loops
  }

  /// Keeps a live object, if recording. Returns its index.
  pub fn record(&mut self, obj: AnimationObject) -> Option<usize> {
    if !self.is_recording() {
      return None;
    }
    log::trace!("record animation object #{}", self.objects.len());
    self.objects.push(obj);
    Some(self.objects.len() - 1)
  }

  /// A live `TERM`: from now on the whole script is kept.
  pub fn activate_term(&mut self) {
    self.term_active = true;
  }

  /// A live `LOOP` was seen. Returns the recorded loop state's index.
  pub fn open_loop(&mut self, chunk: &LOOP, layers: u32) -> Option<usize> {
    let mut state = LoopState::new(chunk, self.open_loops);
    state.layers_at_start = layers;
    self.open_loops += 1;
    self.record(AnimationObject::Loop(state))
  }

  /// A live `ENDL` closed the innermost loop.
  pub fn close_loop(&mut self) {
    self.open_loops = self.open_loops.saturating_sub(1);
  }

  /// Replaying a `LOOP` object: arms it for a fresh set of passes.
  pub fn rearm_loop(&mut self, index: usize, layers: u32) {
    if let Some(AnimationObject::Loop(state)) = self.objects.get_mut(index) {
      state.remaining = state.repeat;
      state.layers_at_start = layers;
    }
  }

  /// Runs the loop bookkeeping for the `ENDL` at `endl_index`.
  ///
  /// `layers` is how many layers were shown so far, for spotting infinite
  /// loops that don't show anything.
  pub fn end_loop(&mut self, endl_index: usize, level: u8, layers: u32) -> Result<EndlOutcome, FormatError> {
    let loop_index = self.objects[..endl_index.min(self.objects.len())]
      .iter()
      .rposition(|o| matches!(o, AnimationObject::Loop(s) if s.level == level))
      .ok_or(FormatError::NoMatchingLoop)?;
    let Some(AnimationObject::Loop(state)) = self.objects.get_mut(loop_index) else {
      return Err(FormatError::NoMatchingLoop);
    };
    let outermost = state.depth == 0;
    if state.is_infinite() {
      if layers == state.layers_at_start {
        log::warn!("infinite loop at level {level} showed nothing, stopping it");
        return Ok(EndlOutcome::Broken { outermost });
      }
      state.layers_at_start = layers;
      return Ok(EndlOutcome::Rewind(loop_index + 1));
    }
    state.remaining = state.remaining.saturating_sub(1);
    log::trace!("ENDL level {level}: {} passes left", state.remaining);
    if state.remaining > 0 {
      state.layers_at_start = layers;
      Ok(EndlOutcome::Rewind(loop_index + 1))
    } else {
      Ok(EndlOutcome::Finished { outermost })
    }
  }

  /// Moves the cursor.
  #[inline]
  pub fn set_cursor(&mut self, cursor: Option<usize>) {
    self.cursor = cursor;
  }

  /// Hands out the object under the cursor and steps past it.
  ///
  /// Once the cursor runs off the end the replay is over and `None` comes
  /// back.
  pub fn next_replay(&mut self) -> Option<(usize, AnimationObject)> {
    let i = self.cursor?;
    match self.objects.get(i) {
      Some(obj) => {
        self.cursor = Some(i + 1);
        Some((i, obj.clone()))
      }
      None => {
        self.cursor = None;
        None
      }
    }
  }

  /// Drops every recorded object.
  pub fn clear(&mut self) {
    log::debug!("discarding {} animation objects", self.objects.len());
    self.objects.clear();
    self.cursor = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lp(level: u8, repeat: u32) -> LOOP {
    let mut bytes = vec![level];
    bytes.extend_from_slice(&repeat.to_be_bytes());
    LOOP::try_from(bytes.as_slice()).unwrap()
  }

  /// Plays a script the way the display does, counting `Disc` objects run.
  fn run(script: &mut AnimationScript, endl_index: usize, level: u8) -> u32 {
    let mut runs = 0;
    let mut outcome = script.end_loop(endl_index, level, 1).unwrap();
    loop {
      match outcome {
        EndlOutcome::Rewind(i) => script.set_cursor(Some(i)),
        EndlOutcome::Finished { .. } | EndlOutcome::Broken { .. } => return runs,
      }
      loop {
        let Some((i, obj)) = script.next_replay() else { return runs };
        match obj {
          AnimationObject::Disc(_) => runs += 1,
          AnimationObject::Endl(level) => {
            outcome = script.end_loop(i, level, 1).unwrap();
            break;
          }
          _ => (),
        }
      }
    }
  }

  #[test]
  fn test_loop_replays_repeat_minus_one_times() {
    for repeat in [1, 2, 5] {
      let mut script = AnimationScript::new();
      script.open_loop(&lp(0, repeat), 0);
      script.record(AnimationObject::Disc(vec![]));
      script.record(AnimationObject::Disc(vec![]));
      let endl = script.record(AnimationObject::Endl(0)).unwrap();
      script.close_loop();
      // the live pass already ran both objects once
      assert_eq!(run(&mut script, endl, 0) + 2, 2 * repeat);
    }
  }

  #[test]
  fn test_not_recording_without_loop_or_term() {
    let mut script = AnimationScript::new();
    assert_eq!(script.record(AnimationObject::Endl(0)), None);
    script.activate_term();
    assert_eq!(script.record(AnimationObject::Endl(0)), Some(0));
  }

  #[test]
  fn test_infinite_loop_without_layers_is_broken() {
    let mut script = AnimationScript::new();
    script.open_loop(&lp(0, LOOP::INFINITE), 1);
    let endl = script.record(AnimationObject::Endl(0)).unwrap();
    assert_eq!(script.end_loop(endl, 0, 1), Ok(EndlOutcome::Broken { outermost: true }));
    assert_eq!(script.end_loop(endl, 0, 2), Ok(EndlOutcome::Rewind(1)));
  }

  #[test]
  fn test_end_loop_without_loop() {
    let mut script = AnimationScript::new();
    script.activate_term();
    script.record(AnimationObject::Endl(3));
    assert_eq!(script.end_loop(0, 3, 0), Err(FormatError::NoMatchingLoop));
  }
}

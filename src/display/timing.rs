use crate::{canvas::Rect, FramChange, FRAM};

/// Frame boundaries, delays, and the frame clip.
///
/// Framing modes, as set by `FRAM`:
/// * 1: every layer is its own frame.
/// * 2: layers pile up, a `FRAM` starts the next frame.
/// * 3: like 1, and the background is restored before each layer.
/// * 4: like 2, and the background is restored at each frame start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTiming {
  /// 1 to 4.
  pub framing_mode: u8,
  ticks_per_second: u32,
  default_delay: u32,
  next_delay: Option<u32>,
  current_delay: u32,
  default_clip: Option<Rect>,
  next_clip: Option<Rect>,
  frame_clip: Option<Rect>,
  boundary_pending: bool,
  /// The wait before the next frame already happened.
  waited: bool,
  last_frame_tick: u32,
  /// Frames started so far.
  pub frames_shown: u32,
  /// Layers started so far.
  pub layers_shown: u32,
}
impl FrameTiming {
  /// Fresh timing, with a default delay of one tick.
  #[must_use]
  pub const fn new(ticks_per_second: u32) -> Self {
    Self {
      framing_mode: 1,
      ticks_per_second: if ticks_per_second == 0 { 1000 } else { ticks_per_second },
      default_delay: 1,
      next_delay: None,
      current_delay: 1,
      default_clip: None,
      next_clip: None,
      frame_clip: None,
      boundary_pending: false,
      waited: false,
      last_frame_tick: 0,
      frames_shown: 0,
      layers_shown: 0,
    }
  }

  /// Back to the state before the first frame, keeping the tick rate.
  pub fn restart(&mut self) {
    let layers = self.layers_shown;
    *self = Self::new(self.ticks_per_second);
    self.layers_shown = layers;
  }

  /// Ticks per second.
  #[inline]
  #[must_use]
  pub const fn ticks_per_second(&self) -> u32 {
    self.ticks_per_second
  }

  /// Converts ticks to milliseconds.
  #[inline]
  #[must_use]
  pub const fn ticks_to_ms(&self, ticks: u32) -> u32 {
    let ms = ticks as u64 * 1000 / self.ticks_per_second as u64;
    if ms > u32::MAX as u64 {
      u32::MAX
    } else {
      ms as u32
    }
  }

  /// The delay after the current frame, in ticks.
  #[inline]
  #[must_use]
  pub const fn current_delay(&self) -> u32 {
    self.current_delay
  }

  /// The current frame's clip, if any.
  #[inline]
  #[must_use]
  pub const fn frame_clip(&self) -> Option<Rect> {
    self.frame_clip
  }

  /// Applies a `FRAM`.
  pub fn apply_fram(&mut self, fram: &FRAM) {
    if fram.mode != 0 {
      self.framing_mode = fram.mode;
    }
    match fram.delay {
      (FramChange::None, _) => (),
      (FramChange::NextSubframe, d) => self.next_delay = Some(d),
      (FramChange::Default, d) => {
        self.default_delay = d;
        self.next_delay = Some(d);
      }
    }
    let (change, delta, bounds) = fram.clip;
    if change != FramChange::None {
      let old = self.next_clip.or(self.default_clip).or(self.frame_clip).unwrap_or_default();
      let clip = Rect {
        left: delta.apply(old.left, bounds[0]),
        right: delta.apply(old.right, bounds[1]),
        top: delta.apply(old.top, bounds[2]),
        bottom: delta.apply(old.bottom, bounds[3]),
      };
      self.next_clip = Some(clip);
      if change == FramChange::Default {
        self.default_clip = Some(clip);
      }
    }
    if matches!(self.framing_mode, 2 | 4) {
      self.boundary_pending = true;
    }
    log::trace!("FRAM: mode {} delay {:?}", self.framing_mode, fram.delay);
  }

  /// If the next layer starts a new frame.
  #[inline]
  #[must_use]
  pub const fn starts_new_frame(&self) -> bool {
    self.frames_shown == 0 || matches!(self.framing_mode, 1 | 3) || self.boundary_pending
  }

  /// If starting a new frame now also restores the background.
  #[inline]
  #[must_use]
  pub const fn restores_background(&self) -> bool {
    self.frames_shown == 0 || matches!(self.framing_mode, 3 | 4)
  }

  /// Milliseconds until the next frame may start, if it has to wait at all.
  #[must_use]
  pub fn time_left(&self, now: u32) -> Option<u32> {
    if self.frames_shown == 0 || self.waited {
      return None;
    }
    let target = self.last_frame_tick.wrapping_add(self.ticks_to_ms(self.current_delay));
    let left = target.wrapping_sub(now);
    // a "negative" difference means the target is already behind us
    if left == 0 || left > i32::MAX as u32 {
      None
    } else {
      Some(left)
    }
  }

  /// Marks the frame wait as done.
  #[inline]
  pub fn set_waited(&mut self) {
    self.waited = true;
  }

  /// A new frame starts at `now`.
  pub fn begin_frame(&mut self, now: u32) {
    self.frames_shown += 1;
    self.last_frame_tick = now;
    self.current_delay = self.next_delay.take().unwrap_or(self.default_delay);
    self.frame_clip = self.next_clip.take().or(self.default_clip);
    self.boundary_pending = false;
    self.waited = false;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::DeltaType;

  fn fram(mode: u8, delay: (FramChange, u32)) -> FRAM {
    FRAM { mode, delay, ..FRAM::default() }
  }

  #[test]
  fn test_delay_waits_from_frame_start() {
    let mut t = FrameTiming::new(100);
    assert_eq!(t.time_left(0), None);
    t.apply_fram(&fram(1, (FramChange::Default, 5)));
    t.begin_frame(1000);
    assert_eq!(t.time_left(1000), Some(50));
    assert_eq!(t.time_left(1030), Some(20));
    assert_eq!(t.time_left(1050), None);
    assert_eq!(t.time_left(1070), None);
    t.set_waited();
    assert_eq!(t.time_left(1000), None);
  }

  #[test]
  fn test_next_subframe_delay_lasts_one_frame() {
    let mut t = FrameTiming::new(1000);
    t.apply_fram(&fram(0, (FramChange::NextSubframe, 7)));
    t.begin_frame(0);
    assert_eq!(t.current_delay(), 7);
    t.begin_frame(0);
    assert_eq!(t.current_delay(), 1);
  }

  #[test]
  fn test_framing_modes() {
    let mut t = FrameTiming::new(10);
    t.begin_frame(0);
    assert!(t.starts_new_frame());
    assert!(!t.restores_background());
    t.apply_fram(&fram(2, (FramChange::None, 0)));
    assert!(t.starts_new_frame());
    t.begin_frame(0);
    assert!(!t.starts_new_frame());
    t.apply_fram(&fram(4, (FramChange::None, 0)));
    assert!(t.starts_new_frame());
    assert!(t.restores_background());
  }

  #[test]
  fn test_relative_frame_clip() {
    let mut t = FrameTiming::new(10);
    let mut f = fram(0, (FramChange::None, 0));
    f.clip = (FramChange::Default, DeltaType::Absolute, [0, 10, 0, 10]);
    t.apply_fram(&f);
    f.clip = (FramChange::NextSubframe, DeltaType::Relative, [1, 1, 2, 2]);
    t.apply_fram(&f);
    t.begin_frame(0);
    assert_eq!(t.frame_clip(), Some(Rect::from_lrtb([1, 11, 2, 12])));
    t.begin_frame(0);
    assert_eq!(t.frame_clip(), Some(Rect::from_lrtb([0, 10, 0, 10])));
  }
}

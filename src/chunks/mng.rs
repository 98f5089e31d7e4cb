use super::*;

/// MNG header, the first chunk of every MNG stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct MHDR {
  pub frame_width: u32,
  pub frame_height: u32,
  /// Zero means "not given", and is played as 1000.
  pub ticks_per_second: u32,
  pub nominal_layer_count: u32,
  pub nominal_frame_count: u32,
  pub nominal_play_time: u32,
  pub simplicity_profile: u32,
}
impl TryFrom<&[u8]> for MHDR {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() != 28 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self {
      frame_width: u32_be_at(data, 0),
      frame_height: u32_be_at(data, 4),
      ticks_per_second: u32_be_at(data, 8),
      nominal_layer_count: u32_be_at(data, 12),
      nominal_frame_count: u32_be_at(data, 16),
      nominal_play_time: u32_be_at(data, 20),
      simplicity_profile: u32_be_at(data, 24),
    })
  }
}

/// How a `LOOP` decides to stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoopTermination {
  /// Exactly the iteration count.
  #[default]
  Deterministic,
  /// Decoder's choice, within the min/max bounds.
  Decoder,
  /// User's choice, within the min/max bounds.
  User,
  /// An external signal, within the min/max bounds.
  External,
}

/// Start of a loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LOOP {
  /// Nest level, matched by the closing `ENDL`.
  pub level: u8,
  /// How many times the body runs.
  pub repeat: u32,
  /// Stopping rule.
  pub termination: LoopTermination,
  /// Lower bound for non-deterministic loops.
  pub iteration_min: u32,
  /// Upper bound for non-deterministic loops.
  pub iteration_max: u32,
  /// Signal numbers. These are parsed and kept but don't affect playback.
  pub signals: Vec<u32>,
}
impl LOOP {
  /// The iteration count value that means "forever".
  pub const INFINITE: u32 = 0x7FFF_FFFF;

  /// The repeat count playback actually uses.
  ///
  /// A count of 0 still runs the body once. Non-deterministic loops are
  /// clamped to their bounds.
  #[inline]
  #[must_use]
  pub fn effective_repeat(&self) -> u32 {
    let r = self.repeat.max(1);
    match self.termination {
      LoopTermination::Deterministic => r,
      _ => r.clamp(self.iteration_min.max(1), self.iteration_max.max(self.iteration_min.max(1))),
    }
  }
}
impl TryFrom<&[u8]> for LOOP {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let len = data.len();
    if len < 5 || (len > 6 && len < 14) || (len > 14 && (len - 14) % 4 != 0) {
      return Err(FormatError::InvalidLength);
    }
    let (level, rest) = try_pull_u8(data)?;
    let (repeat, rest) = try_pull_u32_be(rest)?;
    if repeat > Self::INFINITE {
      return Err(FormatError::InvalidFieldValue);
    }
    let mut out = Self {
      level,
      repeat,
      termination: LoopTermination::Deterministic,
      iteration_min: 1,
      iteration_max: Self::INFINITE,
      signals: Vec::new(),
    };
    let Ok((term, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.termination = match term {
      0 => LoopTermination::Deterministic,
      1 => LoopTermination::Decoder,
      2 => LoopTermination::User,
      3 => LoopTermination::External,
      _ => return Err(FormatError::InvalidFieldValue),
    };
    let Ok((min, rest)) = try_pull_u32_be(rest) else { return Ok(out) };
    let (max, rest) = try_pull_u32_be(rest)?;
    if min > max {
      return Err(FormatError::InvalidFieldValue);
    }
    out.iteration_min = min;
    out.iteration_max = max;
    out.signals = rest.chunks_exact(4).map(|c| u32_be_at(c, 0)).collect();
    Ok(out)
  }
}

/// Defines the "current object" for following image chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DEFI {
  /// Object id, 0 being the abstract "image 0".
  pub object_id: u16,
  /// If the object starts out hidden.
  pub do_not_show: bool,
  /// If the object's data must stay concrete (not abstract).
  pub concrete: bool,
  /// Position on the frame.
  pub location: (i32, i32),
  /// Clipping boundaries: left, right, top, bottom.
  pub clip: Option<[i32; 4]>,
}
impl TryFrom<&[u8]> for DEFI {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if !matches!(data.len(), 2 | 3 | 4 | 12 | 28) {
      return Err(FormatError::InvalidLength);
    }
    let (object_id, rest) = try_pull_u16_be(data)?;
    let mut out = Self { object_id, ..Self::default() };
    let Ok((do_not_show, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.do_not_show = flag_byte(do_not_show)?;
    let Ok((concrete, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.concrete = flag_byte(concrete)?;
    if rest.len() >= 8 {
      out.location = (i32_be_at(rest, 0), i32_be_at(rest, 4));
    }
    if rest.len() >= 24 {
      out.clip = Some([i32_be_at(rest, 8), i32_be_at(rest, 12), i32_be_at(rest, 16), i32_be_at(rest, 20)]);
    }
    Ok(out)
  }
}

/// A 0 or 1 byte.
#[inline]
fn flag_byte(u: u8) -> Result<bool, FormatError> {
  match u {
    0 => Ok(false),
    1 => Ok(true),
    _ => Err(FormatError::InvalidFieldValue),
  }
}

/// Basic image: an image filled with one color, no pixel chunks needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BASI {
  /// Same header as an `IHDR`.
  pub header: ImageHeader,
  /// Fill color, in the image's sample depth. Gray images use only red.
  pub rgb: [u16; 3],
  /// Fill alpha. Defaults to fully opaque.
  pub alpha: Option<u16>,
  /// If the image is viewable right away.
  pub viewable: bool,
}
impl TryFrom<&[u8]> for BASI {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if !matches!(data.len(), 13 | 19 | 21 | 22) {
      return Err(FormatError::InvalidLength);
    }
    let header = ImageHeader::parse(&data[..13], true)?;
    let rest = &data[13..];
    let rgb = if rest.len() >= 6 {
      [u16_be_at(rest, 0), u16_be_at(rest, 2), u16_be_at(rest, 4)]
    } else {
      [0; 3]
    };
    let alpha = if rest.len() >= 8 { Some(u16_be_at(rest, 6)) } else { None };
    let viewable = match rest.get(8) {
      Some(&v) => flag_byte(v)?,
      None => false,
    };
    Ok(Self { header, rgb, alpha, viewable })
  }
}

/// How a `CLON` shares data with its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CloneKind {
  /// A new object with its own copy of the pixel data.
  #[default]
  Full,
  /// A new object sharing the source's pixel data.
  Partial,
  /// The source object just gets a new id.
  Renumber,
}

/// Whether a position is absolute or relative to the old one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeltaType {
  /// Replace the old value.
  #[default]
  Absolute,
  /// Add to the old value.
  Relative,
}
impl TryFrom<u8> for DeltaType {
  type Error = FormatError;
  #[inline]
  fn try_from(u: u8) -> Result<Self, Self::Error> {
    match u {
      0 => Ok(Self::Absolute),
      1 => Ok(Self::Relative),
      _ => Err(FormatError::InvalidFieldValue),
    }
  }
}
impl DeltaType {
  /// Applies a delta to an old value.
  #[inline]
  #[must_use]
  pub const fn apply(self, old: i32, new: i32) -> i32 {
    match self {
      Self::Absolute => new,
      Self::Relative => old.wrapping_add(new),
    }
  }
}

/// Clone an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct CLON {
  pub source: u16,
  pub clone: u16,
  pub kind: CloneKind,
  /// `None` copies the source's visibility.
  pub do_not_show: Option<bool>,
  pub concrete: Option<bool>,
  pub location: Option<(DeltaType, i32, i32)>,
}
impl TryFrom<&[u8]> for CLON {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if !matches!(data.len(), 4 | 5 | 6 | 7 | 16) {
      return Err(FormatError::InvalidLength);
    }
    let (source, rest) = try_pull_u16_be(data)?;
    let (clone, rest) = try_pull_u16_be(rest)?;
    let mut out = Self { source, clone, ..Self::default() };
    let Ok((kind, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.kind = match kind {
      0 => CloneKind::Full,
      1 => CloneKind::Partial,
      2 => CloneKind::Renumber,
      _ => return Err(FormatError::InvalidFieldValue),
    };
    let Ok((do_not_show, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.do_not_show = Some(flag_byte(do_not_show)?);
    let Ok((concrete, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.concrete = Some(flag_byte(concrete)?);
    let Ok((delta, rest)) = try_pull_u8(rest) else { return Ok(out) };
    out.location = Some((DeltaType::try_from(delta)?, i32_be_at(rest, 0), i32_be_at(rest, 4)));
    Ok(out)
  }
}

/// One source image of a `PAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct PastSource {
  pub source_id: u16,
  pub composition_mode: u8,
  pub orientation: u8,
  pub offset_origin: u8,
  pub offset: (i32, i32),
  pub boundary_origin: u8,
  pub clip: [i32; 4],
}

/// Paste images into a target image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct PAST {
  pub target_id: u16,
  pub target_delta: DeltaType,
  pub target: (i32, i32),
  pub sources: Vec<PastSource>,
}
impl TryFrom<&[u8]> for PAST {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() < 41 || (data.len() - 11) % 30 != 0 {
      return Err(FormatError::InvalidLength);
    }
    let (target_id, rest) = try_pull_u16_be(data)?;
    if target_id == 0 {
      return Err(FormatError::InvalidFieldValue);
    }
    let (delta, rest) = try_pull_u8(rest)?;
    let target = (i32_be_at(rest, 0), i32_be_at(rest, 4));
    let mut sources = Vec::new();
    for s in rest[8..].chunks_exact(30) {
      if s[2] > 8 || s[3] > 8 || s[4] > 1 || s[13] > 1 {
        return Err(FormatError::InvalidFieldValue);
      }
      sources.push(PastSource {
        source_id: u16_be_at(s, 0),
        composition_mode: s[2],
        orientation: s[3],
        offset_origin: s[4],
        offset: (i32_be_at(s, 5), i32_be_at(s, 9)),
        boundary_origin: s[13],
        clip: [i32_be_at(s, 14), i32_be_at(s, 18), i32_be_at(s, 22), i32_be_at(s, 26)],
      });
    }
    Ok(Self { target_id, target_delta: DeltaType::try_from(delta)?, target, sources })
  }
}

/// Background for the whole animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BACK {
  /// Background color, 16 bits per channel.
  pub rgb: [u16; 3],
  /// 0: advisory, 1: the color is mandatory, 2/3: the image is too.
  pub mandatory: u8,
  /// Background image object, 0 for none.
  pub image_id: u16,
  /// Tile the background image over the frame.
  pub tile: bool,
}
impl TryFrom<&[u8]> for BACK {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if !matches!(data.len(), 6 | 7 | 9 | 10) {
      return Err(FormatError::InvalidLength);
    }
    let mut out = Self { rgb: [u16_be_at(data, 0), u16_be_at(data, 2), u16_be_at(data, 4)], ..Self::default() };
    if let Some(&m) = data.get(6) {
      if m > 3 {
        return Err(FormatError::InvalidFieldValue);
      }
      out.mandatory = m;
    }
    if data.len() >= 9 {
      out.image_id = u16_be_at(data, 7);
    }
    if let Some(&t) = data.get(9) {
      out.tile = flag_byte(t)?;
    }
    Ok(out)
  }
}

/// How long a `FRAM` change lasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FramChange {
  /// The value stays as it was.
  #[default]
  None,
  /// Only for the next subframe.
  NextSubframe,
  /// For the next subframe and every one after.
  Default,
}
impl TryFrom<u8> for FramChange {
  type Error = FormatError;
  #[inline]
  fn try_from(u: u8) -> Result<Self, Self::Error> {
    match u {
      0 => Ok(Self::None),
      1 => Ok(Self::NextSubframe),
      2 => Ok(Self::Default),
      _ => Err(FormatError::InvalidFieldValue),
    }
  }
}

/// Frame boundary and framing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FRAM {
  /// 1 to 4, or 0 for "keep the current mode".
  pub mode: u8,
  /// Subframe name (Latin-1).
  pub name: String,
  /// Inter-frame delay change, in ticks.
  pub delay: (FramChange, u32),
  /// Timeout change, in ticks.
  pub timeout: (FramChange, u32),
  /// Frame clipping change: delta type and left, right, top, bottom.
  pub clip: (FramChange, DeltaType, [i32; 4]),
  /// Sync ids. Parsed, otherwise ignored.
  pub sync: (FramChange, Vec<u32>),
}
impl TryFrom<&[u8]> for FRAM {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let mut out = Self::default();
    let Ok((mode, rest)) = try_pull_u8(data) else { return Ok(out) };
    if mode > 4 {
      return Err(FormatError::InvalidFieldValue);
    }
    out.mode = mode;
    if rest.is_empty() {
      return Ok(out);
    }
    let nul = rest.iter().position(|&u| u == 0).unwrap_or(rest.len());
    if nul > 79 {
      return Err(FormatError::InvalidLength);
    }
    out.name = latin1_to_string(&rest[..nul]);
    let rest = rest.get(nul + 1..).unwrap_or(&[]);
    if rest.is_empty() {
      return Ok(out);
    }
    let (change_delay, rest) = try_pull_u8(rest)?;
    let (change_timeout, rest) = try_pull_u8(rest)?;
    let (change_clip, rest) = try_pull_u8(rest)?;
    let (change_sync, mut rest) = try_pull_u8(rest)?;
    let change_delay = FramChange::try_from(change_delay)?;
    let change_timeout = FramChange::try_from(change_timeout)?;
    let change_clip = FramChange::try_from(change_clip)?;
    let change_sync = FramChange::try_from(change_sync)?;
    if change_delay != FramChange::None {
      let (d, r) = try_pull_u32_be(rest)?;
      out.delay = (change_delay, d);
      rest = r;
    }
    if change_timeout != FramChange::None {
      let (t, r) = try_pull_u32_be(rest)?;
      out.timeout = (change_timeout, t);
      rest = r;
    }
    if change_clip != FramChange::None {
      let (delta, r) = try_pull_u8(rest)?;
      let (bounds, r) = try_pull_byte_array::<16>(r)?;
      out.clip = (
        change_clip,
        DeltaType::try_from(delta)?,
        [i32_be_at(&bounds, 0), i32_be_at(&bounds, 4), i32_be_at(&bounds, 8), i32_be_at(&bounds, 12)],
      );
      rest = r;
    }
    if change_sync != FramChange::None {
      if rest.len() % 4 != 0 {
        return Err(FormatError::InvalidLength);
      }
      out.sync = (change_sync, rest.chunks_exact(4).map(|c| u32_be_at(c, 0)).collect());
    } else if !rest.is_empty() {
      return Err(FormatError::InvalidLength);
    }
    Ok(out)
  }
}

/// Move a range of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct MOVE {
  pub first: u16,
  pub last: u16,
  pub delta: DeltaType,
  pub x: i32,
  pub y: i32,
}
impl TryFrom<&[u8]> for MOVE {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() != 13 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self {
      first: u16_be_at(data, 0),
      last: u16_be_at(data, 2),
      delta: DeltaType::try_from(data[4])?,
      x: i32_be_at(data, 5),
      y: i32_be_at(data, 9),
    })
  }
}

/// Change the clipping of a range of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct CLIP {
  pub first: u16,
  pub last: u16,
  pub delta: DeltaType,
  /// left, right, top, bottom
  pub bounds: [i32; 4],
}
impl TryFrom<&[u8]> for CLIP {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() != 21 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self {
      first: u16_be_at(data, 0),
      last: u16_be_at(data, 2),
      delta: DeltaType::try_from(data[4])?,
      bounds: [i32_be_at(data, 5), i32_be_at(data, 9), i32_be_at(data, 13), i32_be_at(data, 17)],
    })
  }
}

/// Show (or hide) a range of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SHOW {
  /// First id of the range.
  pub first: u16,
  /// Last id of the range, inclusive. Can be less than `first`.
  pub last: u16,
  /// 0 to 7, see [`ShowMode`](crate::display::ShowMode).
  pub mode: u8,
}
impl Default for SHOW {
  #[inline]
  fn default() -> Self {
    Self { first: 1, last: u16::MAX, mode: 0 }
  }
}
impl TryFrom<&[u8]> for SHOW {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let mut out = Self::default();
    match data.len() {
      0 => (),
      2 => {
        out.first = u16_be_at(data, 0);
        out.last = out.first;
      }
      4 | 5 => {
        out.first = u16_be_at(data, 0);
        out.last = u16_be_at(data, 2);
        if let Some(&mode) = data.get(4) {
          out.mode = mode;
        }
      }
      _ => return Err(FormatError::InvalidLength),
    }
    if out.mode > 7 {
      return Err(FormatError::InvalidFieldValue);
    }
    Ok(out)
  }
}

/// What happens once `MEND` is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TERM {
  /// 0: show the last frame forever, 1: clear the display, 2: show the first
  /// frame after the `TERM`, 3: repeat the sequence.
  pub action: u8,
  /// Action 3 only: what to do after the last repeat.
  pub after_action: u8,
  /// Action 3 only: ticks to wait between repeats.
  pub delay: u32,
  /// Action 3 only: how many times the sequence runs.
  pub max: u32,
}
impl TryFrom<&[u8]> for TERM {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let out = match *data {
      [action] => Self { action, ..Self::default() },
      [action, after_action, ..] if data.len() == 10 => {
        Self { action, after_action, delay: u32_be_at(data, 2), max: u32_be_at(data, 6) }
      }
      _ => return Err(FormatError::InvalidLength),
    };
    if out.action > 3 || out.after_action > 2 {
      return Err(FormatError::InvalidFieldValue);
    }
    Ok(out)
  }
}

/// One entry in the `SAVE` index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct SaveEntry {
  /// 0: segment, 1: subframe, 2: exported image, 3: other.
  pub entry_type: u8,
  /// Offset, start time, layer, and frame. Only for segments and subframes.
  pub position: Option<(u64, u64, u32, u32)>,
  pub name: String,
}

/// Marks the end of the "prologue" and indexes the segments after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SAVE {
  /// 4 or 8, the width of offsets and times.
  pub offset_size: u8,
  /// The index entries.
  pub entries: Vec<SaveEntry>,
}
impl<'a> TryFrom<&'a [u8]> for SAVE {
  type Error = FormatError;
  fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
    let Ok((offset_size, mut rest)) = try_pull_u8(data) else { return Ok(Self::default()) };
    if offset_size != 4 && offset_size != 8 {
      return Err(FormatError::InvalidFieldValue);
    }
    let mut entries = Vec::new();
    let pull_wide = |b: &'a [u8]| -> Result<(u64, &'a [u8]), FormatError> {
      if offset_size == 4 {
        try_pull_u32_be(b).map(|(v, r)| (u64::from(v), r))
      } else {
        try_pull_byte_array::<8>(b).map(|(a, r)| (u64::from_be_bytes(a), r))
      }
    };
    while !rest.is_empty() {
      let (entry_type, r) = try_pull_u8(rest)?;
      if entry_type > 3 {
        return Err(FormatError::InvalidFieldValue);
      }
      let mut r = r;
      let position = if entry_type <= 1 {
        let (offset, r2) = pull_wide(r)?;
        let (start_time, r2) = pull_wide(r2)?;
        let (layer, r2) = try_pull_u32_be(r2)?;
        let (frame, r2) = try_pull_u32_be(r2)?;
        r = r2;
        Some((offset, start_time, layer, frame))
      } else {
        None
      };
      let nul = r.iter().position(|&u| u == 0).unwrap_or(r.len());
      entries.push(SaveEntry { entry_type, position, name: latin1_to_string(&r[..nul]) });
      rest = r.get(nul + 1..).unwrap_or(&[]);
    }
    Ok(Self { offset_size, entries })
  }
}

/// Exports a snapshot id under a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct EXPI {
  pub snapshot_id: u16,
  pub name: String,
}
impl TryFrom<&[u8]> for EXPI {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    let (snapshot_id, name) = try_pull_u16_be(data)?;
    if name.is_empty() || name.len() > 79 {
      return Err(FormatError::InvalidLength);
    }
    Ok(Self { snapshot_id, name: latin1_to_string(name) })
  }
}

/// Frame priority, a hint for players that skip frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct FPRI {
  pub delta: DeltaType,
  pub priority: u8,
}
impl TryFrom<&[u8]> for FPRI {
  type Error = FormatError;
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    match *data {
      [delta, priority] => Ok(Self { delta: DeltaType::try_from(delta)?, priority }),
      _ => Err(FormatError::InvalidLength),
    }
  }
}

/// Magnification of a range of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct MAGN {
  pub first: u16,
  pub last: u16,
  pub x_method: u8,
  /// x, y, left, right, top, bottom
  pub factors: [u16; 6],
  pub y_method: u8,
}
impl TryFrom<&[u8]> for MAGN {
  type Error = FormatError;
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    if data.len() > 20 || (data.len() % 2 == 1 && data.len() != 5) {
      return Err(FormatError::InvalidLength);
    }
    let get16 = |off: usize, default: u16| if data.len() >= off + 2 { u16_be_at(data, off) } else { default };
    let first = get16(0, 0);
    let last = get16(2, first);
    let x_method = data.get(4).copied().unwrap_or(0);
    let mx = get16(5, 1);
    let my = get16(7, mx);
    let ml = get16(9, mx);
    let mr = get16(11, ml);
    let mt = get16(13, my);
    let mb = get16(15, mt);
    let y_method = data.get(17).copied().unwrap_or(x_method);
    if x_method > 5 || y_method > 5 || last < first {
      return Err(FormatError::InvalidFieldValue);
    }
    Ok(Self { first, last, x_method, factors: [mx, my, ml, mr, mt, mb], y_method })
  }
}

#[test]
fn test_loop_lengths() {
  assert_eq!(LOOP::try_from(&[0, 0, 0, 0][..]), Err(FormatError::InvalidLength));
  let l = LOOP::try_from(&[1, 0, 0, 0, 3][..]).unwrap();
  assert_eq!((l.level, l.repeat, l.effective_repeat()), (1, 3, 3));
  assert_eq!(LOOP::try_from(&[1, 0, 0, 0, 3, 0, 0][..]), Err(FormatError::InvalidLength));
  let l = LOOP::try_from(&[0, 0, 0, 0, 50, 1, 0, 0, 0, 2, 0, 0, 0, 9, 0, 0, 0, 7][..]).unwrap();
  assert_eq!(l.termination, LoopTermination::Decoder);
  assert_eq!(l.effective_repeat(), 9);
  assert_eq!(l.signals, [7]);
  assert_eq!(LOOP::try_from(&[0, 0, 0, 0, 0][..]).unwrap().effective_repeat(), 1);
}

#[test]
fn test_show_defaults() {
  assert_eq!(SHOW::try_from(&[][..]), Ok(SHOW { first: 1, last: 65535, mode: 0 }));
  assert_eq!(SHOW::try_from(&[0, 4][..]), Ok(SHOW { first: 4, last: 4, mode: 0 }));
  assert_eq!(SHOW::try_from(&[0, 1, 0, 5, 6][..]), Ok(SHOW { first: 1, last: 5, mode: 6 }));
  assert_eq!(SHOW::try_from(&[0, 1, 0, 5, 8][..]), Err(FormatError::InvalidFieldValue));
  assert_eq!(SHOW::try_from(&[0][..]), Err(FormatError::InvalidLength));
}

#[test]
fn test_fram_optional_fields() {
  assert_eq!(FRAM::try_from(&[][..]).unwrap().mode, 0);
  let f = FRAM::try_from(&[3, b'a', 0, 2, 0, 0, 0, 0, 0, 0, 10][..]).unwrap();
  assert_eq!(f.mode, 3);
  assert_eq!(f.name, "a");
  assert_eq!(f.delay, (FramChange::Default, 10));
  assert_eq!(f.timeout.0, FramChange::None);
  assert_eq!(FRAM::try_from(&[5][..]), Err(FormatError::InvalidFieldValue));
}

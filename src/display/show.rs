use crate::{objects::ObjectStore, FormatError, SHOW};

/// What a `SHOW` does to each object in its range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShowMode {
  /// Make visible, and display.
  #[default]
  Show,
  /// Make invisible.
  Hide,
  /// Display the ones already visible.
  DisplayVisible,
  /// Make visible without displaying.
  MarkVisible,
  /// Flip visibility, display the ones now visible.
  Toggle,
  /// Flip visibility without displaying.
  ToggleQuiet,
  /// Make the next object in the range visible and the current one
  /// invisible, and display it.
  Cycle,
  /// As [`Cycle`](Self::Cycle), without displaying.
  CycleQuiet,
}
impl TryFrom<u8> for ShowMode {
  type Error = FormatError;
  #[inline]
  fn try_from(u: u8) -> Result<Self, Self::Error> {
    Ok(match u {
      0 => Self::Show,
      1 => Self::Hide,
      2 => Self::DisplayVisible,
      3 => Self::MarkVisible,
      4 => Self::Toggle,
      5 => Self::ToggleQuiet,
      6 => Self::Cycle,
      7 => Self::CycleQuiet,
      _ => return Err(FormatError::InvalidFieldValue),
    })
  }
}
impl ShowMode {
  /// If visible objects get drawn.
  #[inline]
  #[must_use]
  pub const fn displays(self) -> bool {
    matches!(self, Self::Show | Self::DisplayVisible | Self::Toggle | Self::Cycle)
  }

  /// If this is one of the cycle modes.
  #[inline]
  #[must_use]
  pub const fn is_cycle(self) -> bool {
    matches!(self, Self::Cycle | Self::CycleQuiet)
  }

  /// The visibility an object ends up with, given the one it had.
  ///
  /// Cycle modes don't change anything here, see [`cycle_nominee`].
  #[inline]
  #[must_use]
  pub const fn new_visibility(self, visible: bool) -> bool {
    match self {
      Self::Show | Self::MarkVisible => true,
      Self::Hide => false,
      Self::Toggle | Self::ToggleQuiet => !visible,
      Self::DisplayVisible | Self::Cycle | Self::CycleQuiet => visible,
    }
  }
}

/// Where a suspended `SHOW` picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowResume {
  /// The `SHOW`, with `first <= last`.
  pub show: SHOW,
  /// The object that was about to be drawn. Its visibility was already
  /// updated.
  pub cursor: u16,
}

/// Puts the range the right way around.
#[inline]
#[must_use]
pub const fn normalized(show: SHOW) -> SHOW {
  if show.first <= show.last {
    show
  } else {
    SHOW { first: show.last, last: show.first, mode: show.mode }
  }
}

/// Cycle modes: makes the object after the first visible one in the range
/// visible, and hides that one. Returns the newly visible object.
///
/// The scan wraps from the end of the range back to its start at most once.
/// If nothing in the range was visible, the first object becomes visible.
pub fn cycle_nominee(objects: &mut ObjectStore, first: u16, last: u16) -> Option<u16> {
  let ids = objects.ids_in(first, last);
  let visible = |objects: &ObjectStore, id: u16| objects.get(id).is_some_and(|o| o.visible);
  let mut previous: Option<usize> = None;
  let mut nominee: Option<u16> = None;
  'scan: for pass in 0..2 {
    for (i, &id) in ids.iter().enumerate() {
      match previous {
        None if pass == 0 => {
          if visible(&*objects, id) {
            previous = Some(i);
          }
        }
        None => {
          nominee = Some(id);
          break 'scan;
        }
        Some(p) if pass == 1 || i > p => {
          nominee = Some(id);
          break 'scan;
        }
        Some(_) => (),
      }
    }
  }
  let nominee = nominee?;
  if let Some(prev) = previous.map(|p| ids[p]) {
    if prev != nominee {
      if let Some(o) = objects.get_mut(prev) {
        o.visible = false;
      }
    }
  }
  if let Some(o) = objects.get_mut(nominee) {
    o.visible = true;
  }
  log::trace!("SHOW cycle: {previous:?} -> {nominee}");
  Some(nominee)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store_with(visible: &[u16]) -> ObjectStore {
    let mut store = ObjectStore::new();
    for id in 1..=5 {
      store.get_or_create(id).visible = visible.contains(&id);
    }
    store
  }

  fn visible_ids(store: &ObjectStore) -> Vec<u16> {
    store.ids().filter(|&id| id != 0 && store.get(id).is_some_and(|o| o.visible)).collect()
  }

  #[test]
  fn test_cycle_steps_to_next() {
    let mut store = store_with(&[3]);
    assert_eq!(cycle_nominee(&mut store, 1, 5), Some(4));
    assert_eq!(visible_ids(&store), [4]);
    assert_eq!(cycle_nominee(&mut store, 1, 5), Some(5));
    assert_eq!(cycle_nominee(&mut store, 1, 5), Some(1));
    assert_eq!(visible_ids(&store), [1]);
  }

  #[test]
  fn test_cycle_with_nothing_visible_picks_first() {
    let mut store = store_with(&[]);
    assert_eq!(cycle_nominee(&mut store, 2, 4), Some(2));
    assert_eq!(visible_ids(&store), [2]);
  }

  #[test]
  fn test_cycle_single_object_stays_visible() {
    let mut store = store_with(&[2]);
    assert_eq!(cycle_nominee(&mut store, 2, 2), Some(2));
    assert_eq!(visible_ids(&store), [2]);
    assert_eq!(cycle_nominee(&mut store, 10, 20), None);
  }

  #[test]
  fn test_mode_visibility() {
    assert!(ShowMode::Toggle.new_visibility(false));
    assert!(!ShowMode::Toggle.new_visibility(true));
    assert!(!ShowMode::Hide.new_visibility(true));
    assert!(ShowMode::DisplayVisible.new_visibility(true));
    assert!(!ShowMode::ToggleQuiet.displays());
    assert_eq!(ShowMode::try_from(8), Err(FormatError::InvalidFieldValue));
  }
}

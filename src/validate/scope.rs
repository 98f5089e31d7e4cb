//! Global versus local resolution of the color chunks.

use crate::{context::ProcessContext, FormatError, Scoped};

/// How one color chunk type reads its payload.
pub(crate) struct ScopeRules<'g, T, PG, PL, FG> {
  /// The global value, if one is set.
  pub global: Option<&'g T>,
  /// Parses a non-empty top level payload.
  pub parse_global: PG,
  /// Parses a non-empty payload inside an image.
  pub parse_local: PL,
  /// Adapts the global value to the open image, or says it doesn't fit.
  pub fit_global: FG,
}

/// Decides the scope of a color chunk and parses it for that scope.
///
/// * With a header open the chunk is local. An empty payload picks up the
///   global value: that has to exist ([`CannotBeEmpty`]) and has to fit the
///   image ([`GlobalLengthErr`]).
/// * Otherwise the chunk is global, and an empty payload clears the global
///   value.
///
/// [`CannotBeEmpty`]: FormatError::CannotBeEmpty
/// [`GlobalLengthErr`]: FormatError::GlobalLengthErr
pub(crate) fn resolve<T, PG, PL, FG>(
  ctx: &ProcessContext, data: &[u8], rules: ScopeRules<'_, T, PG, PL, FG>,
) -> Result<Scoped<T>, FormatError>
where
  PG: FnOnce(&[u8]) -> Result<T, FormatError>,
  PL: FnOnce(&[u8]) -> Result<T, FormatError>,
  FG: FnOnce(&T) -> Result<T, FormatError>,
{
  if ctx.active.is_active() {
    if data.is_empty() {
      let global = rules.global.ok_or(FormatError::CannotBeEmpty)?;
      let fitted = (rules.fit_global)(global).map_err(|_| FormatError::GlobalLengthErr)?;
      Ok(Scoped::Inherited(fitted))
    } else {
      Ok(Scoped::Local((rules.parse_local)(data)?))
    }
  } else if data.is_empty() {
    Ok(Scoped::Global(None))
  } else {
    Ok(Scoped::Global(Some((rules.parse_global)(data)?)))
  }
}

/// The ordering rules shared by `gAMA`, `cHRM`, `sRGB`, and `iCCP`: once per
/// image, before `PLTE` and before the image data.
pub(crate) fn check_pre_palette(ctx: &ProcessContext, already: bool) -> Result<(), FormatError> {
  if !ctx.active.is_active() {
    return Ok(());
  }
  let l = &ctx.local;
  if l.has_plte || l.has_idat || l.has_jdat {
    return Err(FormatError::SequenceError);
  }
  if already {
    return Err(FormatError::MultipleError);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{context::ActiveHeader, ImageHeader, PixelFormat, SignatureType};

  type Parse = fn(&[u8]) -> Result<u32, FormatError>;
  type Fit = fn(&u32) -> Result<u32, FormatError>;

  fn rules(global: Option<&u32>) -> ScopeRules<'_, u32, Parse, Parse, Fit> {
    ScopeRules {
      global,
      parse_global: |d: &[u8]| Ok(d.len() as u32 + 100),
      parse_local: |d: &[u8]| Ok(d.len() as u32),
      fit_global: |g: &u32| if *g < 105 { Ok(*g) } else { Err(FormatError::InvalidLength) },
    }
  }

  #[test]
  fn test_resolve_scopes() {
    let mut ctx = ProcessContext::new(SignatureType::Mng);
    assert_eq!(resolve(&ctx, &[1, 2], rules(None)), Ok(Scoped::Global(Some(102))));
    assert_eq!(resolve(&ctx, &[], rules(Some(&102))), Ok(Scoped::Global(None)));
    ctx.active = ActiveHeader::Png(ImageHeader {
      width: 1,
      height: 1,
      format: PixelFormat::RGB8,
      intrapixel: false,
      interlaced: false,
    });
    assert_eq!(resolve(&ctx, &[1, 2, 3], rules(None)), Ok(Scoped::Local(3)));
    assert_eq!(resolve(&ctx, &[], rules(None)), Err(FormatError::CannotBeEmpty));
    assert_eq!(resolve(&ctx, &[], rules(Some(&102))), Ok(Scoped::Inherited(102)));
    assert_eq!(resolve(&ctx, &[], rules(Some(&200))), Err(FormatError::GlobalLengthErr));
  }
}

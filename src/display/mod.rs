//! Playing validated chunks onto the host's canvas.
//!
//! The [`Display`] owns the image objects and the animation script, and
//! turns each chunk into object changes and canvas writes. Live chunks and
//! replayed [`AnimationObject`]s run through the same code.
//!
//! Nothing here ever sleeps. When a frame has to wait, the display asks the
//! host for a timer, remembers what it was about to do as a [`Resume`], and
//! returns [`Flow::Suspend`].

use std::{cell::RefCell, rc::Rc};

use crate::{
  animation::{AnimationObject, AnimationScript, EndlOutcome, ImageSnapshot},
  canvas::{composite_row, copy_rgba_span, fill_span, Rect, RowPlacement},
  color::ColorEngine,
  context::ProcessContext,
  inflate::IdatInflater,
  objects::{ImageData, ObjectStore, SharedImageData},
  pixels::{CanonicalRow, RowState},
  CanvasStyle, Chunk, ChunkTag, Config, DeltaType, ErrorRecord, Host, ImageHeader, IoError, MngError,
  MngResult, Severity, Unsupported, BACK, BASI, CLIP, LOOP, MOVE, RGB8, RGBA8, SHOW, TERM,
};

mod show;
pub use show::*;

mod timing;
pub use timing::*;

/// What a display call left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  /// Carry on with the next chunk.
  Continue,
  /// Waiting for the host's timer.
  Suspend,
}

/// The work a suspended display picks up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
  /// Start the layer of the image being decoded, then draw its rows.
  LiveImage,
  /// Start a layer and draw one whole object.
  DrawObject(u16),
  /// Carry on with a `SHOW`.
  Show(ShowResume),
  /// `TERM` is ready to play the script again.
  TermRestart,
}

/// The image whose chunks are arriving.
#[derive(Debug)]
struct LiveImage {
  id: u16,
  data: SharedImageData,
  rows: RowState,
  inflater: IdatInflater,
  basi: bool,
  visible: bool,
  /// The first `IDAT` was seen.
  started: bool,
  /// Rows go to the canvas as they're decoded.
  draw: bool,
  x: i32,
  y: i32,
  clip: Rect,
}

/// Plays chunks onto the canvas.
#[derive(Debug)]
pub struct Display {
  style: CanvasStyle,
  fallback_background: RGB8,
  frame: (u32, u32),
  objects: ObjectStore,
  script: AnimationScript,
  engine: ColorEngine,
  timing: FrameTiming,
  back: Option<BACK>,
  image_background: Option<RGB8>,
  next_image_id: u16,
  live: Option<LiveImage>,
  pending: Option<Resume>,
  term: Option<TERM>,
  term_runs: u32,
  term_layers: u32,
  at_end: bool,
  finished: bool,
  dirty: Option<Rect>,
  scratch: CanonicalRow,
  chunk: (Option<ChunkTag>, u32),
}
impl Display {
  /// A display with an empty canvas and only object 0.
  #[must_use]
  pub fn new(config: &Config) -> Self {
    Self {
      style: config.canvas_style,
      fallback_background: config.background,
      frame: (0, 0),
      objects: ObjectStore::new(),
      script: AnimationScript::new(),
      engine: ColorEngine::new(config),
      timing: FrameTiming::new(1000),
      back: None,
      image_background: None,
      next_image_id: 0,
      live: None,
      pending: None,
      term: None,
      term_runs: 0,
      term_layers: 0,
      at_end: false,
      finished: false,
      dirty: None,
      scratch: CanonicalRow::default(),
      chunk: (None, 0),
    }
  }

  /// The image objects.
  #[inline]
  #[must_use]
  pub const fn objects(&self) -> &ObjectStore {
    &self.objects
  }

  /// The recorded animation.
  #[inline]
  #[must_use]
  pub const fn script(&self) -> &AnimationScript {
    &self.script
  }

  /// Frame and layer timing.
  #[inline]
  #[must_use]
  pub const fn timing(&self) -> &FrameTiming {
    &self.timing
  }

  /// The color engine.
  #[inline]
  #[must_use]
  pub const fn color_engine(&self) -> &ColorEngine {
    &self.engine
  }

  /// What's waiting for [`resume`](Self::resume), if anything.
  #[inline]
  #[must_use]
  pub const fn pending(&self) -> Option<Resume> {
    self.pending
  }

  /// If playback reached its end: the last image of a PNG, or `MEND` and
  /// whatever `TERM` asked for.
  #[inline]
  #[must_use]
  pub const fn is_finished(&self) -> bool {
    self.finished
  }

  /// Displays one chunk. `pctx` must be the context from before the chunk
  /// was committed.
  pub fn process<H: Host>(
    &mut self, chunk: &Chunk, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    if self.pending.is_some() {
      return Err(MngError::InvalidState);
    }
    self.chunk = (Some(chunk.tag()), pctx.chunk_seq);
    let flow = match chunk {
      Chunk::MHDR(m) => {
        self.frame = (m.frame_width, m.frame_height);
        self.timing = FrameTiming::new(m.ticks_per_second);
        Flow::Continue
      }
      Chunk::IHDR(h) => self.start_image(*h, None)?,
      Chunk::BASI(b) => self.start_image(b.header, Some(b))?,
      Chunk::IDAT(data) => self.feed_image(data, pctx, host)?,
      Chunk::IEND => self.end_image(pctx, host)?,
      Chunk::JHDR(j) => {
        if self.frame == (0, 0) {
          self.frame = (j.width, j.height);
        }
        self.warn(host, Unsupported::Jpeg.into())?;
        Flow::Continue
      }
      Chunk::DHDR(_) => {
        self.warn(host, Unsupported::Delta.into())?;
        Flow::Continue
      }
      Chunk::PAST(_) => {
        self.warn(host, Unsupported::Past.into())?;
        Flow::Continue
      }
      Chunk::MAGN(_) => {
        self.warn(host, Unsupported::Magnification.into())?;
        Flow::Continue
      }
      Chunk::SAVE(_) => {
        self.objects.freeze_all();
        Flow::Continue
      }
      Chunk::SEEK(name) => {
        log::debug!("SEEK {name:?}");
        self.objects.discard_unfrozen();
        Flow::Continue
      }
      Chunk::TERM(t) => {
        self.term = Some(*t);
        self.script.activate_term();
        self.run_live(AnimationObject::Term(*t), pctx, host)?
      }
      Chunk::LOOP(l) => {
        self.script.open_loop(l, self.timing.layers_shown);
        Flow::Continue
      }
      Chunk::ENDL(level) => {
        let index = self.script.record(AnimationObject::Endl(*level));
        self.script.close_loop();
        match index {
          Some(i) => self.run_endl(i, *level, false, pctx, host)?,
          None => Flow::Continue,
        }
      }
      Chunk::DEFI(d) => self.run_live(AnimationObject::Defi(*d), pctx, host)?,
      Chunk::CLON(c) => self.run_live(AnimationObject::Clon(*c), pctx, host)?,
      Chunk::BACK(b) => self.run_live(AnimationObject::Back(*b), pctx, host)?,
      Chunk::FRAM(f) => self.run_live(AnimationObject::Fram(f.clone()), pctx, host)?,
      Chunk::MOVE(m) => self.run_live(AnimationObject::Move(*m), pctx, host)?,
      Chunk::CLIP(c) => self.run_live(AnimationObject::Clip(*c), pctx, host)?,
      Chunk::SHOW(s) => self.run_live(AnimationObject::Show(*s), pctx, host)?,
      Chunk::DISC(ids) => self.run_live(AnimationObject::Disc(ids.clone()), pctx, host)?,
      Chunk::MEND => {
        self.at_end = true;
        self.end_of_stream(pctx, host)?
      }
      _ => Flow::Continue,
    };
    Ok(flow)
  }

  /// Finishes what a suspension left undone, then carries on with any
  /// replay in progress.
  ///
  /// `pctx` is the context after the suspending chunk was committed. None
  /// of the pending kinds read anything that chunk changed.
  pub fn resume<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    let Some(pending) = self.pending.take() else { return Err(MngError::InvalidState) };
    log::trace!("resuming {pending:?}");
    let flow = match pending {
      Resume::LiveImage => self.begin_live_layer(pctx, host)?,
      Resume::DrawObject(id) => self.draw_with_layer(id, pctx, host)?,
      Resume::Show(r) => self.continue_show(r.show, Some(r.cursor), true, pctx, host)?,
      Resume::TermRestart => return self.restart_term(pctx, host),
    };
    if flow == Flow::Suspend {
      return Ok(Flow::Suspend);
    }
    if self.script.is_replaying() {
      return self.continue_replay(pctx, host);
    }
    Ok(Flow::Continue)
  }

  fn warn<H: Host>(&self, host: &mut H, error: MngError) -> MngResult<()> {
    let record = ErrorRecord::new(Severity::Warning, error.clone(), self.chunk.0, self.chunk.1);
    if host.warning(&record) {
      Ok(())
    } else {
      Err(error)
    }
  }

  fn run_live<H: Host>(
    &mut self, obj: AnimationObject, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    self.script.record(obj.clone());
    self.run_object(obj, None, pctx, host)
  }

  /// Runs one animation object. `index` is its place in the script when
  /// it's being replayed.
  fn run_object<H: Host>(
    &mut self, obj: AnimationObject, index: Option<usize>, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    match obj {
      AnimationObject::Image(snap) | AnimationObject::Basi(snap) => {
        let o = self.objects.get_or_create(snap.id);
        o.data = Some(snap.data);
        o.viewable = true;
        return self.draw_with_layer(snap.id, pctx, host);
      }
      AnimationObject::Loop(_) => {
        if let Some(i) = index {
          self.script.rearm_loop(i, self.timing.layers_shown);
        }
      }
      AnimationObject::Endl(level) => {
        if let Some(i) = index {
          return self.run_endl(i, level, true, pctx, host);
        }
      }
      AnimationObject::Defi(defi) => {
        self.objects.define(&defi);
        self.next_image_id = defi.object_id;
      }
      AnimationObject::Clon(clon) => self.objects.clone_object(&clon)?,
      AnimationObject::Back(back) => self.back = Some(back),
      AnimationObject::Fram(fram) => self.timing.apply_fram(&fram),
      AnimationObject::Move(m) => self.move_objects(&m),
      AnimationObject::Clip(c) => self.clip_objects(&c),
      AnimationObject::Show(show) => return self.start_show(show, pctx, host),
      AnimationObject::Term(_) => (),
      AnimationObject::Disc(ids) => self.objects.discard(&ids),
    }
    Ok(Flow::Continue)
  }

  fn run_endl<H: Host>(
    &mut self, index: usize, level: u8, replaying: bool, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    match self.script.end_loop(index, level, self.timing.layers_shown)? {
      EndlOutcome::Rewind(at) => {
        self.script.set_cursor(Some(at));
        if replaying {
          // the replay loop that's running picks up the new cursor
          Ok(Flow::Continue)
        } else {
          self.continue_replay(pctx, host)
        }
      }
      EndlOutcome::Finished { outermost } | EndlOutcome::Broken { outermost } => {
        if outermost && !self.script.term_active() {
          self.script.clear();
        }
        Ok(Flow::Continue)
      }
    }
  }

  fn continue_replay<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    while let Some((i, obj)) = self.script.next_replay() {
      if self.run_object(obj, Some(i), pctx, host)? == Flow::Suspend {
        return Ok(Flow::Suspend);
      }
    }
    if self.at_end {
      return self.end_of_stream(pctx, host);
    }
    Ok(Flow::Continue)
  }

  fn move_objects(&mut self, m: &MOVE) {
    for id in self.objects.ids_in(m.first, m.last) {
      if let Some(o) = self.objects.get_mut(id) {
        o.location = (m.delta.apply(o.location.0, m.x), m.delta.apply(o.location.1, m.y));
      }
    }
  }

  fn clip_objects(&mut self, c: &CLIP) {
    for id in self.objects.ids_in(c.first, c.last) {
      let Some(o) = self.objects.get_mut(id) else { continue };
      o.clip = Some(match (c.delta, o.clip) {
        (DeltaType::Relative, Some(old)) => {
          [0, 1, 2, 3].map(|i| old[i].wrapping_add(c.bounds[i]))
        }
        (DeltaType::Relative, None) => {
          let (x, y) = o.location;
          let (w, h) = o.data.as_ref().map_or((0, 0), |d| {
            let d = d.borrow();
            (d.header.width as i32, d.header.height as i32)
          });
          let old = [x, x.wrapping_add(w), y, y.wrapping_add(h)];
          [0, 1, 2, 3].map(|i| old[i].wrapping_add(c.bounds[i]))
        }
        (DeltaType::Absolute, _) => c.bounds,
      });
    }
  }

  /// The frame, limited by the current frame clip.
  fn frame_rect(&self) -> Rect {
    let frame = Rect::of_size(self.frame.0, self.frame.1);
    match self.timing.frame_clip() {
      Some(clip) => frame.intersect(clip),
      None => frame,
    }
  }

  /// Where an image at `(x, y)` may draw.
  fn clip_for(&self, x: i32, y: i32, width: u32, height: u32, clip: Option<[i32; 4]>) -> Rect {
    let extent = Rect {
      left: x,
      right: x.saturating_add(i32::try_from(width).unwrap_or(i32::MAX)),
      top: y,
      bottom: y.saturating_add(i32::try_from(height).unwrap_or(i32::MAX)),
    };
    let out = self.frame_rect().intersect(extent);
    match clip {
      Some(c) => out.intersect(Rect::from_lrtb(c)),
      None => out,
    }
  }

  fn mark_dirty(&mut self, r: Rect) {
    if r.is_empty() {
      return;
    }
    self.dirty = Some(match self.dirty {
      Some(d) => Rect {
        left: d.left.min(r.left),
        right: d.right.max(r.right),
        top: d.top.min(r.top),
        bottom: d.bottom.max(r.bottom),
      },
      None => r,
    });
  }

  fn refresh<H: Host>(&mut self, host: &mut H) -> MngResult<()> {
    let Some(d) = self.dirty.take() else { return Ok(()) };
    let (x, y) = (d.left.max(0) as u32, d.top.max(0) as u32);
    if host.refresh(x, y, d.width(), d.height()) {
      Ok(())
    } else {
      Err(IoError::Refresh.into())
    }
  }

  /// Gets ready to put a layer on the canvas. This is where frames wait out
  /// their delay.
  fn layer_start<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    if self.timing.starts_new_frame() {
      if let Some(wait) = self.timing.time_left(host.tick_count()) {
        self.refresh(host)?;
        if !host.set_timer(wait) {
          return Err(IoError::SetTimer.into());
        }
        self.timing.set_waited();
        log::trace!("frame {} waits {wait}ms", self.timing.frames_shown + 1);
        return Ok(Flow::Suspend);
      }
      let restore = self.timing.restores_background();
      self.timing.begin_frame(host.tick_count());
      if restore {
        self.restore_background(self.frame_rect(), pctx, host)?;
      }
    }
    self.timing.layers_shown += 1;
    Ok(Flow::Continue)
  }

  fn background_color(&self, pctx: &ProcessContext) -> RGBA8 {
    let rgb = if let Some(b) = self.back {
      RGB8 { r: (b.rgb[0] >> 8) as u8, g: (b.rgb[1] >> 8) as u8, b: (b.rgb[2] >> 8) as u8 }
    } else if let Some(c) = self.image_background {
      c
    } else if let Some(b) = pctx.globals.bkgd {
      b.to_rgb8(16, &pctx.globals.palette)
    } else {
      self.fallback_background
    };
    RGBA8 { r: rgb.r, g: rgb.g, b: rgb.b, a: 255 }
  }

  /// Puts the background back over `rect`: the host's own background if it
  /// has one, else a color, then the `BACK` image if there is one.
  fn restore_background<H: Host>(
    &mut self, rect: Rect, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<()> {
    let rect = rect.intersect(Rect::of_size(self.frame.0, self.frame.1));
    if rect.is_empty() {
      return Ok(());
    }
    let color = self.background_color(pctx);
    let mut from_host = Vec::new();
    from_host.try_reserve_exact(self.frame.0 as usize * 4)?;
    from_host.resize(self.frame.0 as usize * 4, 0);
    let (left, right) = (rect.left as u32, rect.right as u32);
    for y in rect.top as u32..rect.bottom as u32 {
      let have = host.background_line(y, &mut from_host);
      let line = host.canvas_line(y).ok_or(IoError::CanvasLine)?;
      if have {
        copy_rgba_span(self.style, line, &from_host, left, right);
      } else {
        fill_span(self.style, line, left, right, color);
      }
    }
    if let Some(back) = self.back.filter(|b| b.image_id != 0) {
      self.draw_back_image(back, rect, host)?;
    }
    self.mark_dirty(rect);
    Ok(())
  }

  fn draw_back_image<H: Host>(&mut self, back: BACK, rect: Rect, host: &mut H) -> MngResult<()> {
    let Some(obj) = self.objects.get(back.image_id) else { return Ok(()) };
    let Some(data) = obj.data.clone() else { return Ok(()) };
    let (x0, y0) = obj.location;
    if !back.tile {
      return self.draw_data(&data, x0, y0, rect, host);
    }
    let (w, h) = {
      let d = data.borrow();
      (i32::try_from(d.header.width)?, i32::try_from(d.header.height)?)
    };
    if w == 0 || h == 0 {
      return Ok(());
    }
    let mut ty = rect.top - (rect.top.wrapping_sub(y0)).rem_euclid(h);
    while ty < rect.bottom {
      let mut tx = rect.left - (rect.left.wrapping_sub(x0)).rem_euclid(w);
      while tx < rect.right {
        self.draw_data(&data, tx, ty, rect, host)?;
        tx = tx.saturating_add(w);
      }
      ty = ty.saturating_add(h);
    }
    Ok(())
  }

  /// Composites stored image data at `(x, y)`, within `clip`.
  fn draw_data<H: Host>(
    &mut self, data: &SharedImageData, x: i32, y: i32, clip: Rect, host: &mut H,
  ) -> MngResult<()> {
    let data = data.borrow();
    let header = data.header;
    let clip = clip.intersect(Rect {
      left: x,
      right: x.saturating_add(i32::try_from(header.width)?),
      top: y,
      bottom: y.saturating_add(i32::try_from(header.height)?),
    });
    if clip.is_empty() {
      return Ok(());
    }
    self.engine.select(&data.colors.color_info(), data.strategy().is_wide())?;
    for row in 0..header.height {
      let fy = y.saturating_add(row as i32);
      if fy < clip.top {
        continue;
      }
      if fy >= clip.bottom {
        break;
      }
      data.retrieve_row(row, &mut self.scratch)?;
      self.engine.correct(&mut self.scratch, host)?;
      let line = host.canvas_line(fy as u32).ok_or(IoError::CanvasLine)?;
      composite_row(self.style, line, &self.scratch, RowPlacement { x, step: 1, y: fy }, clip, false);
    }
    drop(data);
    self.mark_dirty(clip);
    Ok(())
  }

  fn draw_object<H: Host>(&mut self, id: u16, host: &mut H) -> MngResult<()> {
    let Some(obj) = self.objects.get(id) else { return Ok(()) };
    let Some(data) = obj.data.clone() else { return Ok(()) };
    let (x, y) = obj.location;
    let clip = match obj.clip {
      Some(c) => self.frame_rect().intersect(Rect::from_lrtb(c)),
      None => self.frame_rect(),
    };
    log::trace!("drawing object {id} at {x},{y}");
    self.draw_data(&data, x, y, clip, host)
  }

  /// Draws an object as a layer of its own, if it's visible.
  fn draw_with_layer<H: Host>(
    &mut self, id: u16, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    let drawable = self.objects.get(id).is_some_and(|o| o.visible && o.data.is_some());
    if !drawable {
      return Ok(Flow::Continue);
    }
    if self.layer_start(pctx, host)? == Flow::Suspend {
      self.pending = Some(Resume::DrawObject(id));
      return Ok(Flow::Suspend);
    }
    self.draw_object(id, host)?;
    Ok(Flow::Continue)
  }

  fn start_show<H: Host>(
    &mut self, show: SHOW, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    let show = normalized(show);
    let mode = ShowMode::try_from(show.mode)?;
    if mode.is_cycle() {
      let Some(id) = cycle_nominee(&mut self.objects, show.first, show.last) else {
        return Ok(Flow::Continue);
      };
      if !mode.displays() {
        return Ok(Flow::Continue);
      }
      return self.continue_show(show, Some(id), true, pctx, host);
    }
    let first = self.objects.ids_in(show.first, show.last).first().copied();
    self.continue_show(show, first, false, pctx, host)
  }

  /// Runs a `SHOW` from object `cursor` on. If `updated`, that first
  /// object's visibility was already changed.
  fn continue_show<H: Host>(
    &mut self, show: SHOW, mut cursor: Option<u16>, mut updated: bool, pctx: &ProcessContext,
    host: &mut H,
  ) -> MngResult<Flow> {
    let mode = ShowMode::try_from(show.mode)?;
    while let Some(id) = cursor {
      let draw = match self.objects.get_mut(id) {
        Some(obj) => {
          if !updated {
            obj.visible = mode.new_visibility(obj.visible);
          }
          mode.displays() && obj.visible && obj.data.is_some()
        }
        None => false,
      };
      updated = false;
      if draw {
        if self.layer_start(pctx, host)? == Flow::Suspend {
          self.pending = Some(Resume::Show(ShowResume { show, cursor: id }));
          return Ok(Flow::Suspend);
        }
        self.draw_object(id, host)?;
      }
      if mode.is_cycle() {
        break;
      }
      cursor = self.objects.next_id_after(id, show.last);
    }
    Ok(Flow::Continue)
  }

  fn start_image(&mut self, header: ImageHeader, basi: Option<&BASI>) -> MngResult<Flow> {
    if self.frame == (0, 0) {
      self.frame = (header.width, header.height);
    }
    let id = self.next_image_id;
    let data = match basi {
      Some(b) => ImageData::from_basi(b)?,
      None => ImageData::new(header)?,
    };
    let data = Rc::new(RefCell::new(data));
    let obj = self.objects.get_or_create(id);
    obj.data = Some(Rc::clone(&data));
    obj.viewable = basi.is_some_and(|b| b.viewable);
    let (visible, (x, y), obj_clip) = (obj.visible, obj.location, obj.clip);
    let clip = self.clip_for(x, y, header.width, header.height, obj_clip);
    log::debug!("image {}x{} into object {id}", header.width, header.height);
    self.live = Some(LiveImage {
      id,
      data,
      rows: RowState::new(header)?,
      inflater: IdatInflater::new(header.zlib_decompression_requirement())?,
      basi: basi.is_some(),
      visible,
      started: false,
      draw: false,
      x,
      y,
      clip,
    });
    Ok(Flow::Continue)
  }

  fn feed_image<H: Host>(
    &mut self, idat: &[u8], pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    let Some(live) = self.live.as_mut() else { return Ok(Flow::Continue) };
    live.inflater.feed(idat)?;
    if live.started {
      self.pump_rows(host)?;
      return Ok(Flow::Continue);
    }
    live.started = true;
    let colors = pctx.effective_colors();
    if !pctx.is_mng() {
      let depth = live.rows.header().format.bits_per_channel();
      self.image_background = colors.bkgd.map(|b| b.to_rgb8(depth, &colors.palette));
    }
    live.data.borrow_mut().colors = colors;
    if live.basi || !live.visible {
      self.pump_rows(host)?;
      return Ok(Flow::Continue);
    }
    self.begin_live_layer(pctx, host)
  }

  /// The live image's first layer, then whatever rows are ready.
  fn begin_live_layer<H: Host>(
    &mut self, pctx: &ProcessContext, host: &mut H,
  ) -> MngResult<Flow> {
    if self.layer_start(pctx, host)? == Flow::Suspend {
      self.pending = Some(Resume::LiveImage);
      return Ok(Flow::Suspend);
    }
    if let Some(live) = self.live.as_mut() {
      live.draw = true;
      let data = live.data.borrow();
      self.engine.select(&data.colors.color_info(), data.strategy().is_wide())?;
    }
    self.pump_rows(host)?;
    Ok(Flow::Continue)
  }

  /// Stores, and maybe draws, every row the inflated data has so far.
  fn pump_rows<H: Host>(&mut self, host: &mut H) -> MngResult<()> {
    let Some(live) = self.live.as_mut() else { return Ok(()) };
    while let Some(pos) = live.rows.take_row(live.inflater.output())? {
      {
        let mut data = live.data.borrow_mut();
        live.rows.store(&pos, &mut data.samples);
        live.rows.process(&pos, data.colors.row_colors())?;
      }
      if !live.draw {
        continue;
      }
      let fy = live.y.saturating_add(pos.full_y() as i32);
      if fy < live.clip.top || fy >= live.clip.bottom {
        continue;
      }
      self.engine.correct(&mut live.rows.canonical, host)?;
      let line = host.canvas_line(fy as u32).ok_or(IoError::CanvasLine)?;
      let at = RowPlacement {
        x: live.x.saturating_add(pos.pass.col_start as i32),
        step: pos.pass.col_inc,
        y: fy,
      };
      composite_row(self.style, line, &live.rows.canonical, at, live.clip, false);
    }
    Ok(())
  }

  fn end_image<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    self.next_image_id = 0;
    let Some(live) = self.live.take() else { return Ok(Flow::Continue) };
    {
      let mut data = live.data.borrow_mut();
      if !live.started {
        data.colors = pctx.effective_colors();
      }
      if live.basi {
        data.fully_opaque &= live.rows.all_opaque;
      } else {
        data.complete = live.rows.is_complete();
        data.fully_opaque = live.rows.all_opaque;
        if !data.complete {
          log::warn!("image in object {} ended with rows missing", live.id);
        }
      }
    }
    if let Some(o) = self.objects.get_mut(live.id) {
      o.viewable = true;
    }
    if live.draw {
      self.mark_dirty(live.clip);
    }
    let snapshot = ImageSnapshot { id: live.id, data: live.data };
    let flow = if live.basi {
      self.script.record(AnimationObject::Basi(snapshot));
      self.draw_with_layer(live.id, pctx, host)?
    } else {
      self.script.record(AnimationObject::Image(snapshot));
      Flow::Continue
    };
    if !pctx.is_mng() {
      self.refresh(host)?;
      self.finished = true;
    }
    Ok(flow)
  }

  /// `MEND`, or the end of a `TERM` replay.
  fn end_of_stream<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    self.refresh(host)?;
    let Some(term) = self.term else {
      self.finished = true;
      return Ok(Flow::Continue);
    };
    let replay =
      term.action == 3 && (term.max >= LOOP::INFINITE || self.term_runs.saturating_add(1) < term.max);
    // a script that shows nothing would replay forever
    let idle = self.term_runs > 0 && self.timing.layers_shown == self.term_layers;
    if replay && idle {
      log::warn!("TERM replay showed nothing, stopping");
    }
    let action = if replay && !idle {
      let wait = self.timing.ticks_to_ms(term.delay);
      if !host.set_timer(wait) {
        return Err(IoError::SetTimer.into());
      }
      self.pending = Some(Resume::TermRestart);
      log::debug!("TERM: replaying in {wait}ms");
      return Ok(Flow::Suspend);
    } else if term.action == 3 {
      term.after_action
    } else {
      term.action
    };
    if action == 1 {
      let all = Rect::of_size(self.frame.0, self.frame.1);
      self.restore_background(all, pctx, host)?;
      self.refresh(host)?;
    }
    self.finished = true;
    Ok(Flow::Continue)
  }

  fn restart_term<H: Host>(&mut self, pctx: &ProcessContext, host: &mut H) -> MngResult<Flow> {
    self.term_runs += 1;
    self.term_layers = self.timing.layers_shown;
    self.objects.discard_unfrozen();
    self.timing.restart();
    self.next_image_id = 0;
    self.script.set_cursor(Some(0));
    self.continue_replay(pctx, host)
  }
}

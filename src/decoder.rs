//! The call surface a host drives.

use crate::{
  context::ProcessContext,
  display::{Display, Flow},
  objects::ObjectStore,
  u32_be_at, validate::validate,
  Chunk, ChunkTag, Config, ErrorRecord, FormatError, Host, IoError, MngError, MngResult, RawChunk,
  ResourceError, Severity, Unsupported, detect_signature,
};

/// Where a [`Decoder`] is at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DecoderState {
  /// Nothing read yet.
  #[default]
  Idle,
  /// Inside a read or display call.
  Displaying,
  /// Waiting for the host's timer, see [`Decoder::resume`].
  Suspended,
  /// The stream (and any playback) is over, or a call failed.
  Done,
}

/// Where display chunks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
  Stream,
  Stored(usize),
}

/// Bytes read from the host but not used yet.
#[derive(Debug, Default)]
struct StreamBuffer {
  bytes: Vec<u8>,
  pos: usize,
  opened: bool,
  eof: bool,
  closed: bool,
}
impl StreamBuffer {
  #[inline]
  fn available(&self) -> usize {
    self.bytes.len() - self.pos
  }

  /// Reads until `want` bytes are available. `false` if the stream ended
  /// first.
  fn fill<H: Host>(&mut self, host: &mut H, want: usize) -> MngResult<bool> {
    let mut buf = [0_u8; 4096];
    while self.available() < want {
      if self.eof {
        return Ok(false);
      }
      let n = host.read_data(&mut buf)?;
      if n == 0 {
        self.eof = true;
      } else {
        let n = n.min(buf.len());
        self.bytes.try_reserve(n)?;
        self.bytes.extend_from_slice(&buf[..n]);
      }
    }
    Ok(true)
  }

  #[inline]
  fn unread(&self) -> &[u8] {
    &self.bytes[self.pos..]
  }

  fn consume(&mut self, n: usize) {
    self.pos += n;
    if self.pos >= 1 << 16 {
      self.bytes.drain(..self.pos);
      self.pos = 0;
    }
  }
}

/// Decodes and plays one PNG, JNG, or MNG stream.
///
/// ```no_run
/// # use mngine::*;
/// # fn demo<H: Host>(host: H) -> MngResult<()> {
/// let mut decoder = Decoder::new(host, Config::default());
/// let mut state = decoder.read_display()?;
/// while state == DecoderState::Suspended {
///   // wait for the timer that was set, then
///   state = decoder.resume()?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Decoder<H: Host> {
  host: H,
  config: Config,
  ctx: ProcessContext,
  stream: StreamBuffer,
  chunks: Vec<Chunk>,
  display: Option<Display>,
  state: DecoderState,
  source: Source,
  header_seen: bool,
  current: Option<(ChunkTag, usize)>,
}
impl<H: Host> Decoder<H> {
  /// A fresh decoder. Nothing is read until a read call.
  #[inline]
  #[must_use]
  pub fn new(host: H, config: Config) -> Self {
    Self {
      host,
      config,
      ctx: ProcessContext::default(),
      stream: StreamBuffer::default(),
      chunks: Vec::new(),
      display: None,
      state: DecoderState::Idle,
      source: Source::Stream,
      header_seen: false,
      current: None,
    }
  }

  /// The settings in use.
  #[inline]
  #[must_use]
  pub const fn config(&self) -> &Config {
    &self.config
  }

  /// The current state.
  #[inline]
  #[must_use]
  pub const fn state(&self) -> DecoderState {
    self.state
  }

  /// The host.
  #[inline]
  #[must_use]
  pub const fn host(&self) -> &H {
    &self.host
  }

  /// The host.
  #[inline]
  pub fn host_mut(&mut self) -> &mut H {
    &mut self.host
  }

  /// The stream state so far.
  #[inline]
  #[must_use]
  pub const fn context(&self) -> &ProcessContext {
    &self.ctx
  }

  /// The record of the last failure, if a call failed.
  #[inline]
  #[must_use]
  pub fn last_error(&self) -> Option<&ErrorRecord> {
    self.ctx.last_error.as_ref()
  }

  /// Every chunk validated so far, in stream order. Empty unless
  /// [`Config::store_chunks`] is set.
  #[inline]
  pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
    self.chunks.iter()
  }

  /// The image objects, once something was displayed.
  #[inline]
  #[must_use]
  pub fn objects(&self) -> Option<&ObjectStore> {
    self.display.as_ref().map(Display::objects)
  }

  /// The display, once something was displayed.
  #[inline]
  #[must_use]
  pub const fn display_state(&self) -> Option<&Display> {
    self.display.as_ref()
  }

  /// Reads and validates the whole stream without displaying anything.
  pub fn read(&mut self) -> MngResult<DecoderState> {
    self.start(false)?;
    let result = self.pump();
    self.finish(result)
  }

  /// Reads the stream and plays it as it arrives.
  ///
  /// Returns [`DecoderState::Suspended`] when a frame has to wait: call
  /// [`resume`](Self::resume) once the timer the host was given fires.
  pub fn read_display(&mut self) -> MngResult<DecoderState> {
    self.start(true)?;
    let result = self.pump();
    self.finish(result)
  }

  /// Plays the chunks a finished read stored, from the top.
  ///
  /// Needs [`Config::store_chunks`].
  pub fn display(&mut self) -> MngResult<DecoderState> {
    if !self.config.store_chunks {
      return Err(Unsupported::NoStorage.into());
    }
    if !self.ctx.ended || self.state == DecoderState::Suspended {
      return Err(MngError::InvalidState);
    }
    let Some(signature) = self.ctx.signature else { return Err(MngError::InvalidState) };
    log::debug!("displaying {} stored chunks", self.chunks.len());
    self.ctx = ProcessContext::new(signature);
    self.display = Some(Display::new(&self.config));
    self.source = Source::Stored(0);
    self.state = DecoderState::Displaying;
    let result = self.play_stored();
    self.finish(result)
  }

  /// Carries on after a suspension.
  pub fn resume(&mut self) -> MngResult<DecoderState> {
    if self.state != DecoderState::Suspended {
      return Err(MngError::InvalidState);
    }
    self.state = DecoderState::Displaying;
    let result = self.resume_inner();
    self.finish(result)
  }

  /// Drops everything read so far and goes back to
  /// [`Idle`](DecoderState::Idle). The host is kept, and is expected to
  /// start its stream over too.
  pub fn reset(&mut self) {
    log::debug!("decoder reset");
    self.ctx = ProcessContext::default();
    self.stream = StreamBuffer::default();
    self.chunks.clear();
    self.display = None;
    self.state = DecoderState::Idle;
    self.source = Source::Stream;
    self.header_seen = false;
    self.current = None;
  }

  /// Drops all decoding state and hands back the host.
  #[inline]
  #[must_use]
  pub fn cleanup(self) -> H {
    self.host
  }

  fn start(&mut self, display: bool) -> MngResult<()> {
    if self.state != DecoderState::Idle {
      return Err(MngError::InvalidState);
    }
    self.state = DecoderState::Displaying;
    if display {
      self.display = Some(Display::new(&self.config));
    }
    Ok(())
  }

  /// Settles the state after a call and records any failure.
  fn finish(&mut self, result: MngResult<Flow>) -> MngResult<DecoderState> {
    match result {
      Ok(Flow::Suspend) => self.state = DecoderState::Suspended,
      Ok(Flow::Continue) => self.state = DecoderState::Done,
      Err(e) => return Err(self.record(e)),
    }
    Ok(self.state)
  }

  fn record(&mut self, error: MngError) -> MngError {
    let (tag, len) = self.current.map_or((None, 0), |(t, l)| (Some(t), l));
    let record = ErrorRecord::new(Severity::Error, error.clone(), tag, self.ctx.chunk_seq)
      .with_extras(i64::try_from(len).unwrap_or(i64::MAX), 0);
    log::debug!("{record}");
    self.ctx.last_error = Some(record);
    self.state = DecoderState::Done;
    error
  }

  fn warn(&mut self, error: MngError) -> MngResult<()> {
    let tag = self.current.map(|(t, _)| t);
    let record = ErrorRecord::new(Severity::Warning, error.clone(), tag, self.ctx.chunk_seq);
    if self.host.warning(&record) {
      Ok(())
    } else {
      Err(error)
    }
  }

  fn read_signature(&mut self) -> MngResult<()> {
    if !self.stream.opened {
      if !self.host.open_stream() {
        return Err(IoError::OpenStream.into());
      }
      self.stream.opened = true;
    }
    if !self.stream.fill(&mut self.host, 8)? {
      return Err(FormatError::InvalidSignature.into());
    }
    let signature = detect_signature(self.stream.unread()).ok_or(FormatError::InvalidSignature)?;
    log::debug!("{signature:?} stream");
    self.stream.consume(8);
    self.ctx = ProcessContext::new(signature);
    Ok(())
  }

  /// The next chunk's tag and payload, or `None` at a clean end of stream.
  fn next_raw(&mut self) -> MngResult<Option<(ChunkTag, Vec<u8>)>> {
    if !self.stream.fill(&mut self.host, 8)? {
      if self.stream.available() == 0 {
        return Ok(None);
      }
      return Err(FormatError::UnexpectedEnd.into());
    }
    let head = self.stream.unread();
    let len = u32_be_at(head, 0);
    let tag = ChunkTag([head[4], head[5], head[6], head[7]]);
    self.current = Some((tag, len as usize));
    if len > 0x7FFF_FFFF {
      return Err(FormatError::InvalidLength.into());
    }
    let total = 12 + len as usize;
    if !self.stream.fill(&mut self.host, total)? {
      return Err(FormatError::UnexpectedEnd.into());
    }
    let bytes = &self.stream.unread()[..total];
    let raw = RawChunk { tag, data: &bytes[8..total - 4], declared_crc: u32_be_at(bytes, total - 4) };
    if self.config.check_crc && !raw.crc_is_correct() {
      return Err(FormatError::CrcMismatch.into());
    }
    let mut data = Vec::new();
    data.try_reserve_exact(raw.data.len())?;
    data.extend_from_slice(raw.data);
    self.stream.consume(total);
    Ok(Some((tag, data)))
  }

  /// Host callbacks and warnings a chunk raises whether or not it's
  /// displayed.
  fn announce(&mut self, chunk: &Chunk) -> MngResult<()> {
    let size = match chunk {
      Chunk::MHDR(m) => Some((m.frame_width, m.frame_height)),
      Chunk::IHDR(h) => Some((h.width, h.height)),
      Chunk::BASI(b) => Some((b.header.width, b.header.height)),
      Chunk::JHDR(j) => Some((j.width, j.height)),
      Chunk::Text(t) => {
        if !self.host.process_text(t) {
          return Err(IoError::ProcessText.into());
        }
        None
      }
      _ => None,
    };
    let Some((w, h)) = size else { return Ok(()) };
    if w > self.config.max_width || h > self.config.max_height {
      log::warn!("{w}x{h} is over the {}x{} limit", self.config.max_width, self.config.max_height);
      self.warn(ResourceError::ImageTooBig.into())?;
    }
    if !self.header_seen {
      self.header_seen = true;
      if !self.host.process_header(w, h) {
        return Err(IoError::ProcessHeader.into());
      }
    }
    Ok(())
  }

  /// Reads chunks until the stream ends or the display suspends.
  fn pump(&mut self) -> MngResult<Flow> {
    if self.ctx.signature.is_none() {
      self.read_signature()?;
    }
    while !self.ctx.ended {
      let Some((tag, data)) = self.next_raw()? else {
        return Err(FormatError::UnexpectedEnd.into());
      };
      let chunk = validate(&self.ctx, tag, &data, &self.config)?;
      drop(data);
      self.announce(&chunk)?;
      let flow = match self.display.as_mut() {
        Some(display) => display.process(&chunk, &self.ctx, &mut self.host)?,
        None => Flow::Continue,
      };
      self.ctx.commit(&chunk);
      if self.config.store_chunks {
        self.chunks.push(chunk);
      }
      if flow == Flow::Suspend {
        return Ok(Flow::Suspend);
      }
    }
    self.current = None;
    if !self.stream.closed {
      self.stream.closed = true;
      if !self.host.close_stream() {
        return Err(IoError::CloseStream.into());
      }
    }
    Ok(Flow::Continue)
  }

  /// Plays stored chunks from the current cursor on.
  fn play_stored(&mut self) -> MngResult<Flow> {
    let Source::Stored(mut next) = self.source else { return Ok(Flow::Continue) };
    while let Some(chunk) = self.chunks.get(next) {
      next += 1;
      self.source = Source::Stored(next);
      self.current = Some((chunk.tag(), 0));
      let flow = match self.display.as_mut() {
        Some(display) => display.process(chunk, &self.ctx, &mut self.host)?,
        None => Flow::Continue,
      };
      self.ctx.commit(chunk);
      if flow == Flow::Suspend {
        return Ok(Flow::Suspend);
      }
    }
    self.current = None;
    Ok(Flow::Continue)
  }

  fn resume_inner(&mut self) -> MngResult<Flow> {
    let Some(display) = self.display.as_mut() else { return Err(MngError::InvalidState) };
    // The chunk that suspended is already committed, so a resume sees the
    // context one chunk past the one `process` got.
    if display.resume(&self.ctx, &mut self.host)? == Flow::Suspend {
      return Ok(Flow::Suspend);
    }
    match self.source {
      Source::Stream => self.pump(),
      Source::Stored(_) => self.play_stored(),
    }
  }
}

#![allow(bad_style)]

use mngine::*;

mod mng;
mod png;

fn rand_bytes(count: usize) -> Vec<u8> {
  let mut buffer = vec![0; count];
  getrandom::getrandom(&mut buffer).unwrap();
  buffer
}

/// Length, tag, data, and CRC.
fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = (data.len() as u32).to_be_bytes().to_vec();
  out.extend_from_slice(tag);
  out.extend_from_slice(data);
  out.extend_from_slice(&chunk_crc(ChunkTag(*tag), data).to_be_bytes());
  out
}

fn stream(signature: [u8; 8], chunks: &[Vec<u8>]) -> Vec<u8> {
  let mut out = signature.to_vec();
  for c in chunks {
    out.extend_from_slice(c);
  }
  out
}

fn ihdr(width: u32, height: u32, depth: u8, color_type: u8, filter: u8, interlace: u8) -> Vec<u8> {
  let mut data = width.to_be_bytes().to_vec();
  data.extend_from_slice(&height.to_be_bytes());
  data.extend_from_slice(&[depth, color_type, 0, filter, interlace]);
  chunk(b"IHDR", &data)
}

fn mhdr(width: u32, height: u32, ticks_per_second: u32) -> Vec<u8> {
  let mut data = [0_u8; 28];
  data[0..4].copy_from_slice(&width.to_be_bytes());
  data[4..8].copy_from_slice(&height.to_be_bytes());
  data[8..12].copy_from_slice(&ticks_per_second.to_be_bytes());
  chunk(b"MHDR", &data)
}

/// An `IDAT` holding unfiltered rows.
fn idat_rows(rows: &[&[u8]]) -> Vec<u8> {
  let mut raw = Vec::new();
  for row in rows {
    raw.push(0);
    raw.extend_from_slice(row);
  }
  chunk(b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6))
}

/// A 1x1 RGB8 image.
fn pixel_image(rgb: [u8; 3]) -> Vec<Vec<u8>> {
  vec![ihdr(1, 1, 8, 2, 0, 0), idat_rows(&[&rgb]), chunk(b"IEND", &[])]
}

#[derive(Debug, Default)]
struct MockHost {
  input: Vec<u8>,
  pos: usize,
  read_size: usize,
  width: u32,
  canvas: Vec<u8>,
  timers: Vec<u32>,
  texts: Vec<(String, String)>,
  warnings: Vec<ErrorRecord>,
  refreshes: u32,
  reject_header: bool,
}
impl MockHost {
  fn new(input: Vec<u8>) -> Self {
    Self { input, read_size: 7, ..Self::default() }
  }

  fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * self.width + x) * 4) as usize;
    self.canvas[i..i + 4].try_into().unwrap()
  }
}
impl Host for MockHost {
  fn read_data(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
    let rest = &self.input[self.pos..];
    let n = buf.len().min(self.read_size).min(rest.len());
    buf[..n].copy_from_slice(&rest[..n]);
    self.pos += n;
    Ok(n)
  }

  fn process_header(&mut self, width: u32, height: u32) -> bool {
    if self.reject_header || u64::from(width) * u64::from(height) > 1 << 20 {
      return false;
    }
    self.width = width;
    self.canvas = vec![0; (width * height * 4) as usize];
    true
  }

  fn process_text(&mut self, text: &TextChunk) -> bool {
    self.texts.push((text.keyword.clone(), text.text.clone()));
    true
  }

  fn canvas_line(&mut self, row: u32) -> Option<&mut [u8]> {
    let w = self.width as usize * 4;
    self.canvas.get_mut(row as usize * w..(row as usize + 1) * w)
  }

  fn refresh(&mut self, _x: u32, _y: u32, _width: u32, _height: u32) -> bool {
    self.refreshes += 1;
    true
  }

  fn tick_count(&mut self) -> u32 {
    0
  }

  fn set_timer(&mut self, ms: u32) -> bool {
    self.timers.push(ms);
    true
  }

  fn warning(&mut self, record: &ErrorRecord) -> bool {
    self.warnings.push(record.clone());
    true
  }
}

fn test_config() -> Config {
  Config::default().with_color_mode(ColorMode::None)
}

/// Reads and plays a stream to the end, resuming every time it waits.
/// Returns the decoder and how many times it had to resume.
fn play(bytes: Vec<u8>, config: Config) -> (Decoder<MockHost>, MngResult<DecoderState>, u32) {
  let mut decoder = Decoder::new(MockHost::new(bytes), config);
  let mut result = decoder.read_display();
  let mut resumes = 0;
  while result == Ok(DecoderState::Suspended) && resumes < 1000 {
    resumes += 1;
    result = decoder.resume();
  }
  (decoder, result, resumes)
}

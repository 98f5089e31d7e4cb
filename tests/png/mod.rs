use super::*;
use walkdir::WalkDir;

const ADAM7: [(usize, usize, usize, usize); 7] =
  [(0, 0, 8, 8), (4, 0, 8, 8), (0, 4, 4, 8), (2, 0, 4, 4), (0, 2, 2, 4), (1, 0, 2, 2), (0, 1, 1, 2)];

/// Interlaced `IDAT` for RGB8 pixels.
fn adam7_idat(width: usize, height: usize, pixels: &[u8]) -> Vec<u8> {
  let mut raw = Vec::new();
  for (x0, y0, dx, dy) in ADAM7 {
    if width <= x0 {
      continue;
    }
    for y in (y0..height).step_by(dy) {
      raw.push(0);
      for x in (x0..width).step_by(dx) {
        raw.extend_from_slice(&pixels[(y * width + x) * 3..][..3]);
      }
    }
  }
  chunk(b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6))
}

fn rgb_png(width: u32, height: u32, pixels: &[u8], interlaced: bool) -> Vec<u8> {
  let idat = if interlaced {
    adam7_idat(width as usize, height as usize, pixels)
  } else {
    let rows: Vec<&[u8]> = pixels.chunks(width as usize * 3).collect();
    idat_rows(&rows)
  };
  stream(
    PNG_SIGNATURE,
    &[ihdr(width, height, 8, 2, 0, u8::from(interlaced)), idat, chunk(b"IEND", &[])],
  )
}

#[test]
fn test_plain_png_reaches_canvas() {
  let bytes = stream(PNG_SIGNATURE, &{
    let mut c = vec![ihdr(2, 1, 8, 2, 0, 0)];
    c.push(idat_rows(&[&[255, 0, 0, 0, 0, 255]]));
    c.push(chunk(b"IEND", &[]));
    c
  });
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 0);
  let host = decoder.host();
  assert_eq!(host.pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(host.pixel(1, 0), [0, 0, 255, 255]);
  assert!(host.refreshes > 0);
  assert!(decoder.display_state().unwrap().is_finished());
  assert!(decoder.last_error().is_none());
}

#[test]
fn test_interlaced_matches_progressive() {
  for (w, h) in [(5, 5), (7, 3), (1, 9), (9, 1)] {
    let pixels = rand_bytes(w as usize * h as usize * 3);
    let (plain, r1, _) = play(rgb_png(w, h, &pixels, false), test_config());
    let (laced, r2, _) = play(rgb_png(w, h, &pixels, true), test_config());
    assert_eq!(r1, Ok(DecoderState::Done));
    assert_eq!(r2, Ok(DecoderState::Done));
    assert_eq!(plain.host().canvas, laced.host().canvas, "{w}x{h}");
    let stored = laced.objects().unwrap().get(0).unwrap().data.clone().unwrap();
    assert_eq!(stored.borrow().samples, pixels, "{w}x{h}");
  }
}

#[test]
fn test_crc_mismatch() {
  let mut bytes = rgb_png(1, 1, &[1, 2, 3], false);
  // last byte of the IHDR crc
  bytes[8 + 8 + 13 + 3] ^= 0xFF;
  let mut decoder = Decoder::new(MockHost::new(bytes.clone()), test_config());
  assert_eq!(decoder.read(), Err(FormatError::CrcMismatch.into()));
  assert_eq!(decoder.state(), DecoderState::Done);
  let record = decoder.last_error().unwrap();
  assert_eq!(record.severity, Severity::Error);
  assert_eq!(record.chunk, Some(ChunkTag::IHDR));
  assert_eq!(record.chunk_seq, 0);

  let mut decoder = Decoder::new(MockHost::new(bytes), test_config().with_check_crc(false));
  assert_eq!(decoder.read(), Ok(DecoderState::Done));
}

#[test]
fn test_stream_errors() {
  let mut decoder = Decoder::new(MockHost::new(b"GIF89a\0\0\0\0\0\0".to_vec()), test_config());
  assert_eq!(decoder.read(), Err(FormatError::InvalidSignature.into()));

  let full = rgb_png(2, 2, &[7; 12], false);
  // cut inside the IDAT, then right before IEND
  for cut in [full.len() - 20, full.len() - 12] {
    let mut decoder = Decoder::new(MockHost::new(full[..cut].to_vec()), test_config());
    assert_eq!(decoder.read(), Err(FormatError::UnexpectedEnd.into()), "{cut}");
    assert!(decoder.last_error().is_some());
  }

  let mut huge = stream(PNG_SIGNATURE, &[]);
  huge.extend_from_slice(&[0x80, 0, 0, 0]);
  huge.extend_from_slice(b"IHDR");
  let mut decoder = Decoder::new(MockHost::new(huge), test_config());
  assert_eq!(decoder.read(), Err(FormatError::InvalidLength.into()));
  assert_eq!(decoder.last_error().unwrap().chunk, Some(ChunkTag::IHDR));
}

#[test]
fn test_host_callbacks() {
  let bytes = stream(PNG_SIGNATURE, &[
    ihdr(2, 2, 8, 2, 0, 0),
    chunk(b"tEXt", b"Title\0Hello"),
    idat_rows(&[&[0; 6], &[0; 6]]),
    chunk(b"IEND", &[]),
  ]);
  let (decoder, result, _) = play(bytes.clone(), test_config().with_max_dimensions(1, 1));
  assert_eq!(result, Ok(DecoderState::Done));
  let host = decoder.host();
  assert_eq!(host.texts, [("Title".to_string(), "Hello".to_string())]);
  assert_eq!(host.warnings.len(), 1);
  assert_eq!(host.warnings[0].error, ResourceError::ImageTooBig.into());
  assert_eq!(host.warnings[0].severity, Severity::Warning);

  let mut host = MockHost::new(bytes);
  host.reject_header = true;
  let mut decoder = Decoder::new(host, test_config());
  assert_eq!(decoder.read_display(), Err(IoError::ProcessHeader.into()));
}

#[test]
fn test_call_order() {
  let bytes = rgb_png(1, 1, &[9, 9, 9], false);
  let mut decoder = Decoder::new(MockHost::new(bytes.clone()), test_config());
  assert_eq!(decoder.resume(), Err(MngError::InvalidState));
  assert_eq!(decoder.display(), Err(Unsupported::NoStorage.into()));
  assert_eq!(decoder.read(), Ok(DecoderState::Done));
  assert_eq!(decoder.read(), Err(MngError::InvalidState));
  assert_eq!(decoder.chunks().count(), 0);

  decoder.reset();
  decoder.host_mut().pos = 0;
  assert_eq!(decoder.state(), DecoderState::Idle);
  assert_eq!(decoder.read_display(), Ok(DecoderState::Done));
  let host = decoder.cleanup();
  assert_eq!(host.pixel(0, 0), [9, 9, 9, 255]);
}

#[test]
fn test_display_stored_chunks() {
  let bytes = rgb_png(1, 1, &[40, 50, 60], false);
  let mut decoder = Decoder::new(MockHost::new(bytes), test_config().with_store_chunks(true));
  assert_eq!(decoder.display(), Err(MngError::InvalidState));
  assert_eq!(decoder.read(), Ok(DecoderState::Done));
  let tags: Vec<ChunkTag> = decoder.chunks().map(Chunk::tag).collect();
  assert_eq!(tags, [ChunkTag::IHDR, ChunkTag::IDAT, ChunkTag::IEND]);
  assert_eq!(decoder.host().pixel(0, 0), [0; 4]);
  assert_eq!(decoder.display(), Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [40, 50, 60, 255]);
  // and again
  decoder.host_mut().canvas.fill(0);
  assert_eq!(decoder.display(), Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [40, 50, 60, 255]);
}

#[test]
fn test_decoder_no_panics() {
  // iter ALL files in the test folder, even non-png files shouldn't panic it.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    let _ = play(v, Config::default());
  }
  // even totally random data should never panic the decoder!
  for _ in 0..20 {
    for signature in [PNG_SIGNATURE, MNG_SIGNATURE, JNG_SIGNATURE] {
      let mut v = signature.to_vec();
      v.extend_from_slice(&rand_bytes(1024));
      let _ = play(v, Config::default());
    }
    let _ = play(rand_bytes(1024), Config::default());
  }
  // a valid header followed by garbage pixels
  for _ in 0..20 {
    let mut c = vec![ihdr(8, 8, 8, 6, 0, 1)];
    c.push(chunk(b"IDAT", &miniz_oxide::deflate::compress_to_vec_zlib(&rand_bytes(300), 1)));
    c.push(chunk(b"IEND", &[]));
    let _ = play(stream(PNG_SIGNATURE, &c), Config::default());
  }
}

use super::*;

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];

fn defi(id: u16, do_not_show: bool, x: i32, y: i32) -> Vec<u8> {
  let mut data = id.to_be_bytes().to_vec();
  data.extend_from_slice(&[u8::from(do_not_show), 0]);
  data.extend_from_slice(&x.to_be_bytes());
  data.extend_from_slice(&y.to_be_bytes());
  chunk(b"DEFI", &data)
}

fn loop_(level: u8, repeat: u32) -> Vec<u8> {
  let mut data = vec![level];
  data.extend_from_slice(&repeat.to_be_bytes());
  chunk(b"LOOP", &data)
}

fn loop_bounded(level: u8, repeat: u32, termination: u8, min: u32, max: u32) -> Vec<u8> {
  let mut data = vec![level];
  data.extend_from_slice(&repeat.to_be_bytes());
  data.push(termination);
  data.extend_from_slice(&min.to_be_bytes());
  data.extend_from_slice(&max.to_be_bytes());
  chunk(b"LOOP", &data)
}

fn clon(source: u16, clone: u16) -> Vec<u8> {
  let mut data = source.to_be_bytes().to_vec();
  data.extend_from_slice(&clone.to_be_bytes());
  chunk(b"CLON", &data)
}

fn move_relative(first: u16, last: u16, x: i32, y: i32) -> Vec<u8> {
  let mut data = first.to_be_bytes().to_vec();
  data.extend_from_slice(&last.to_be_bytes());
  data.push(1);
  data.extend_from_slice(&x.to_be_bytes());
  data.extend_from_slice(&y.to_be_bytes());
  chunk(b"MOVE", &data)
}

fn show(first: u16, last: u16, mode: u8) -> Vec<u8> {
  let mut data = first.to_be_bytes().to_vec();
  data.extend_from_slice(&last.to_be_bytes());
  data.push(mode);
  chunk(b"SHOW", &data)
}

fn term(action: u8, after_action: u8, delay: u32, max: u32) -> Vec<u8> {
  let mut data = vec![action, after_action];
  data.extend_from_slice(&delay.to_be_bytes());
  data.extend_from_slice(&max.to_be_bytes());
  chunk(b"TERM", &data)
}

fn mng(parts: Vec<Vec<Vec<u8>>>) -> Vec<u8> {
  let chunks: Vec<Vec<u8>> = parts.into_iter().flatten().collect();
  stream(MNG_SIGNATURE, &chunks)
}

fn visible_ids(decoder: &Decoder<MockHost>) -> Vec<u16> {
  let objects = decoder.objects().unwrap();
  objects.ids().filter(|&id| id != 0 && objects.get(id).unwrap().visible).collect()
}

#[test]
fn test_loop_moves_each_pass() {
  let bytes = mng(vec![
    vec![mhdr(40, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![loop_(0, 3), move_relative(1, 1, 11, 0), show(1, 1, 0), chunk(b"ENDL", &[0]), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  // one frame wait per SHOW pass, at one tick of 10ms each
  assert_eq!(resumes, 3);
  assert_eq!(decoder.host().timers, [10, 10, 10]);
  assert_eq!(decoder.objects().unwrap().get(1).unwrap().location, (33, 0));
  let host = decoder.host();
  for x in [0, 11, 22, 33] {
    assert_eq!(host.pixel(x, 0), [255, 0, 0, 255], "{x}");
  }
  assert_eq!(host.pixel(5, 0), [0, 0, 0, 255]);
  let display = decoder.display_state().unwrap();
  assert!(display.is_finished());
  assert!(display.script().objects().is_empty());
  assert_eq!(display.timing().layers_shown, 4);
}

#[test]
fn test_show_cycles_through_range() {
  let bytes = mng(vec![
    vec![mhdr(3, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![defi(2, true, 1, 0)],
    pixel_image(GREEN),
    vec![defi(3, true, 2, 0)],
    pixel_image(BLUE),
    vec![show(1, 3, 6)],
  ]);
  let mut decoder = Decoder::new(MockHost::new(bytes), test_config());
  // the stream ends early, the SHOW has been played by then
  assert_eq!(decoder.read_display(), Ok(DecoderState::Suspended));
  assert_eq!(visible_ids(&decoder), [2]);
  assert_eq!(decoder.resume(), Err(FormatError::UnexpectedEnd.into()));
  let host = decoder.host();
  assert_eq!(host.pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(host.pixel(1, 0), [0, 255, 0, 255]);
  assert_eq!(host.pixel(2, 0), [0, 0, 0, 255]);

  let bytes = mng(vec![
    vec![mhdr(3, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![defi(2, true, 1, 0)],
    pixel_image(GREEN),
    vec![defi(3, true, 2, 0)],
    pixel_image(BLUE),
    vec![show(1, 3, 6), show(3, 1, 6), show(1, 3, 7), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 2);
  // the quiet cycle wrapped around without drawing
  assert_eq!(visible_ids(&decoder), [1]);
  assert_eq!(decoder.host().pixel(2, 0), [0, 0, 255, 255]);
}

#[test]
fn test_term_replays_whole_stream() {
  let bytes = mng(vec![vec![mhdr(1, 1, 100), term(3, 0, 5, 3)], pixel_image(GREEN), vec![chunk(b"MEND", &[])]]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 2);
  assert_eq!(decoder.host().timers, [50, 50]);
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 3);
  assert_eq!(decoder.host().pixel(0, 0), [0, 255, 0, 255]);

  // action 1 clears to the background when done
  let bytes = mng(vec![vec![mhdr(1, 1, 100), term(1, 0, 0, 0)], pixel_image(GREEN), vec![chunk(b"MEND", &[])]]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 0);
  assert_eq!(decoder.host().pixel(0, 0), [0, 0, 0, 255]);
}

#[test]
fn test_term_stops_when_nothing_shows() {
  let bytes = mng(vec![
    vec![mhdr(1, 1, 100), term(3, 0, 1, LOOP::INFINITE), defi(1, true, 0, 0)],
    pixel_image(RED),
    vec![chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 1);
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 0);
}

#[test]
fn test_disc_keeps_object_zero() {
  let bytes = mng(vec![
    vec![mhdr(2, 1, 100), defi(2, false, 0, 0)],
    pixel_image(RED),
    vec![defi(3, false, 1, 0)],
    pixel_image(BLUE),
    vec![chunk(b"DISC", &[0, 0, 0, 2])],
  ]);
  let mut decoder = Decoder::new(MockHost::new(bytes), test_config());
  let mut result = decoder.read_display();
  while result == Ok(DecoderState::Suspended) {
    result = decoder.resume();
  }
  // no MEND
  assert_eq!(result, Err(FormatError::UnexpectedEnd.into()));
  let ids: Vec<u16> = decoder.objects().unwrap().ids().collect();
  assert_eq!(ids, [0, 3]);

  let bytes = mng(vec![
    vec![mhdr(2, 1, 100), defi(2, false, 0, 0)],
    pixel_image(RED),
    vec![chunk(b"DISC", &[]), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, _) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  let ids: Vec<u16> = decoder.objects().unwrap().ids().collect();
  assert_eq!(ids, [0]);
}

#[test]
fn test_intrapixel_filter() {
  let bytes = mng(vec![vec![
    mhdr(1, 1, 1),
    ihdr(1, 1, 8, 2, 64, 0),
    idat_rows(&[&[100, 100, 206]]),
    chunk(b"IEND", &[]),
    chunk(b"MEND", &[]),
  ]]);
  let (decoder, result, _) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [200, 100, 50, 255]);
}

#[test]
fn test_fram_default_delay() {
  let fram = chunk(b"FRAM", &[1, 0, 2, 0, 0, 0, 0, 0, 0, 250]);
  let bytes = mng(vec![vec![mhdr(1, 1, 1000), fram], pixel_image(RED), pixel_image(BLUE), vec![chunk(b"MEND", &[])]]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 1);
  assert_eq!(decoder.host().timers, [250]);
  assert_eq!(decoder.host().pixel(0, 0), [0, 0, 255, 255]);
  assert_eq!(decoder.display_state().unwrap().timing().frames_shown, 2);
}

#[test]
fn test_back_color_fills_frame() {
  let back = chunk(b"BACK", &[0xFF, 0xFF, 0, 0, 0, 0]);
  let bytes = mng(vec![
    vec![mhdr(2, 1, 100), back, defi(1, false, 1, 0)],
    pixel_image(GREEN),
    vec![chunk(b"MEND", &[])],
  ]);
  let (decoder, result, _) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(decoder.host().pixel(1, 0), [0, 255, 0, 255]);
}

#[test]
fn test_suspended_decoder_only_resumes() {
  let bytes = mng(vec![
    vec![mhdr(2, 1, 100)],
    pixel_image(RED),
    pixel_image(BLUE),
    vec![chunk(b"MEND", &[])],
  ]);
  let mut decoder = Decoder::new(MockHost::new(bytes), test_config().with_store_chunks(true));
  assert_eq!(decoder.read_display(), Ok(DecoderState::Suspended));
  assert_eq!(decoder.read(), Err(MngError::InvalidState));
  assert_eq!(decoder.display(), Err(MngError::InvalidState));
  assert_eq!(decoder.state(), DecoderState::Suspended);
  assert_eq!(decoder.host().pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(decoder.resume(), Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [0, 0, 255, 255]);
  assert_eq!(decoder.resume(), Err(MngError::InvalidState));

  // the stored chunks play the same way
  decoder.host_mut().canvas.fill(0);
  assert_eq!(decoder.display(), Ok(DecoderState::Suspended));
  assert_eq!(decoder.host().pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(decoder.resume(), Ok(DecoderState::Done));
  assert_eq!(decoder.host().pixel(0, 0), [0, 0, 255, 255]);
  assert_eq!(decoder.host().timers, [10, 10]);
}

#[test]
fn test_show_resumes_at_saved_cursor() {
  let bytes = mng(vec![
    vec![mhdr(3, 1, 100), defi(1, true, 0, 0)],
    pixel_image(RED),
    vec![defi(2, true, 1, 0)],
    pixel_image(GREEN),
    vec![defi(3, true, 2, 0)],
    pixel_image(BLUE),
    vec![show(1, 3, 4), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  // toggled once each, even the ones the SHOW was suspended on
  assert_eq!(visible_ids(&decoder), [1, 2, 3]);
  assert_eq!(resumes, 2);
  let host = decoder.host();
  assert_eq!(host.pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(host.pixel(1, 0), [0, 255, 0, 255]);
  assert_eq!(host.pixel(2, 0), [0, 0, 255, 255]);
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 3);
}

#[test]
fn test_nested_loops_rewind_inner_each_outer_pass() {
  let bytes = mng(vec![
    vec![mhdr(40, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![
      loop_(0, 2),
      move_relative(1, 1, 10, 0),
      loop_(1, 2),
      move_relative(1, 1, 1, 0),
      show(1, 1, 0),
      chunk(b"ENDL", &[1]),
      chunk(b"ENDL", &[0]),
      chunk(b"MEND", &[]),
    ],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 4);
  assert_eq!(decoder.host().timers, [10, 10, 10, 10]);
  assert_eq!(decoder.objects().unwrap().get(1).unwrap().location, (24, 0));
  let host = decoder.host();
  for x in [0, 11, 12, 23, 24] {
    assert_eq!(host.pixel(x, 0), [255, 0, 0, 255], "{x}");
  }
  // the outer MOVE alone never drew anything
  assert_eq!(host.pixel(10, 0), [0, 0, 0, 255]);
  assert_eq!(host.pixel(22, 0), [0, 0, 0, 255]);
  let display = decoder.display_state().unwrap();
  assert!(display.script().objects().is_empty());
  assert_eq!(display.timing().layers_shown, 5);
}

#[test]
fn test_loop_bounds_clamp_repeat() {
  // the decoder picks, so 10 passes get clamped to the max of 2
  let bytes = mng(vec![
    vec![mhdr(40, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![loop_bounded(0, 10, 1, 1, 2), move_relative(1, 1, 11, 0), show(1, 1, 0), chunk(b"ENDL", &[0])],
    vec![chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 2);
  assert_eq!(decoder.objects().unwrap().get(1).unwrap().location, (22, 0));
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 3);

  // a count of 0 is raised to the min of 3
  let bytes = mng(vec![
    vec![mhdr(40, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![loop_bounded(0, 0, 2, 3, 5), move_relative(1, 1, 11, 0), show(1, 1, 0), chunk(b"ENDL", &[0])],
    vec![chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 3);
  assert_eq!(decoder.objects().unwrap().get(1).unwrap().location, (33, 0));
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 4);
}

#[test]
fn test_infinite_loop_stops_when_a_pass_shows_nothing() {
  let bytes = mng(vec![
    vec![mhdr(4, 1, 100), defi(1, true, 0, 0)],
    pixel_image(RED),
    vec![
      loop_(0, LOOP::INFINITE),
      move_relative(1, 1, 1, 0),
      // shows on the first pass, hides on the second
      show(1, 1, 4),
      chunk(b"ENDL", &[0]),
      chunk(b"MEND", &[]),
    ],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 0);
  assert_eq!(decoder.objects().unwrap().get(1).unwrap().location, (2, 0));
  assert!(visible_ids(&decoder).is_empty());
  assert_eq!(decoder.host().pixel(1, 0), [255, 0, 0, 255]);
  assert_eq!(decoder.host().pixel(2, 0), [0, 0, 0, 255]);
  let display = decoder.display_state().unwrap();
  assert!(display.is_finished());
  assert!(display.script().objects().is_empty());
  assert_eq!(display.timing().layers_shown, 1);
}

#[test]
fn test_clon_cannot_replace_frozen_object() {
  let bytes = mng(vec![
    vec![mhdr(2, 1, 100), defi(1, false, 0, 0)],
    pixel_image(RED),
    vec![defi(2, false, 1, 0)],
    pixel_image(BLUE),
    vec![chunk(b"SAVE", &[]), clon(2, 1), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes.clone(), test_config());
  assert_eq!(result, Err(FormatError::ObjectExists.into()));
  assert_eq!(resumes, 1);
  assert_eq!(decoder.last_error().unwrap().chunk, Some(ChunkTag::CLON));
  let kept = decoder.objects().unwrap().get(1).unwrap();
  assert!(kept.frozen);
  assert_eq!(kept.location, (0, 0));
  assert_eq!(kept.data.as_ref().unwrap().borrow().samples, [255, 0, 0]);
  assert_eq!(decoder.host().pixel(0, 0), [255, 0, 0, 255]);

  // a plain read rejects the same stream
  let mut decoder = Decoder::new(MockHost::new(bytes), test_config());
  assert_eq!(decoder.read(), Err(FormatError::ObjectExists.into()));
}

#[test]
fn test_clon_of_unknown_object() {
  let bytes = mng(vec![vec![mhdr(1, 1, 100), clon(7, 3), chunk(b"MEND", &[])]]);
  let mut decoder = Decoder::new(MockHost::new(bytes.clone()), test_config());
  assert_eq!(decoder.read(), Err(FormatError::ObjectUnknown.into()));
  let (decoder, result, _) = play(bytes, test_config());
  assert_eq!(result, Err(FormatError::ObjectUnknown.into()));
  assert_eq!(decoder.objects().unwrap().ids().collect::<Vec<_>>(), [0]);
}

#[test]
fn test_replayed_image_waits_for_its_frame() {
  let bytes = mng(vec![
    vec![mhdr(1, 1, 100), loop_(0, 2)],
    pixel_image(RED),
    vec![chunk(b"ENDL", &[0]), chunk(b"MEND", &[])],
  ]);
  let (decoder, result, resumes) = play(bytes, test_config());
  assert_eq!(result, Ok(DecoderState::Done));
  assert_eq!(resumes, 1);
  assert_eq!(decoder.host().timers, [10]);
  assert_eq!(decoder.host().pixel(0, 0), [255, 0, 0, 255]);
  assert_eq!(decoder.display_state().unwrap().timing().layers_shown, 2);
}

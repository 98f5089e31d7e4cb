//! A synthetic RGB transform built from `cHRM` and `gAMA`.

use crate::{pixels::CanonicalRow, Chromaticities};

type Mat3 = [[f64; 3]; 3];

/// linear sRGB (D65) from XYZ
const XYZ_TO_SRGB: Mat3 = [
  [3.240_454_2, -1.537_138_5, -0.498_531_4],
  [-0.969_266_0, 1.876_010_8, 0.041_556_0],
  [0.055_643_4, -0.204_025_9, 1.057_225_2],
];

fn mul(a: &Mat3, b: &Mat3) -> Mat3 {
  let mut out = [[0.0; 3]; 3];
  for (r, row) in out.iter_mut().enumerate() {
    for (c, v) in row.iter_mut().enumerate() {
      *v = (0..3).map(|k| a[r][k] * b[k][c]).sum();
    }
  }
  out
}

fn invert(m: &Mat3) -> Option<Mat3> {
  let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
    - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
    + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
  if det.abs() < 1e-12 {
    return None;
  }
  let d = 1.0 / det;
  Some([
    [
      (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * d,
      (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * d,
      (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * d,
    ],
    [
      (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * d,
      (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * d,
      (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * d,
    ],
    [
      (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * d,
      (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * d,
      (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * d,
    ],
  ])
}

/// RGB to XYZ for the given primaries and white point.
fn rgb_to_xyz(c: &Chromaticities) -> Option<Mat3> {
  let xy = |x: u32, y: u32| (f64::from(x) / 100_000.0, f64::from(y) / 100_000.0);
  let (wx, wy) = xy(c.white_x, c.white_y);
  let prims = [xy(c.red_x, c.red_y), xy(c.green_x, c.green_y), xy(c.blue_x, c.blue_y)];
  if wy <= 0.0 || prims.iter().any(|&(_, y)| y <= 0.0) {
    return None;
  }
  // columns are the XYZ of each primary at Y = 1
  let mut m: Mat3 = [[0.0; 3]; 3];
  for (i, &(x, y)) in prims.iter().enumerate() {
    m[0][i] = x / y;
    m[1][i] = 1.0;
    m[2][i] = (1.0 - x - y) / y;
  }
  let white = [wx / wy, 1.0, (1.0 - wx - wy) / wy];
  let inv = invert(&m)?;
  let s: Vec<f64> = (0..3).map(|r| (0..3).map(|k| inv[r][k] * white[k]).sum()).collect();
  for row in m.iter_mut() {
    for (i, v) in row.iter_mut().enumerate() {
      *v *= s[i];
    }
  }
  Some(m)
}

/// Decodes with the file gamma, maps primaries to sRGB, re-encodes for the
/// display.
#[derive(Debug, Clone)]
pub struct ChromaticityTransform {
  matrix: Mat3,
  decode_exponent: f64,
  encode_exponent: f64,
  decode8: Vec<f64>,
}
impl ChromaticityTransform {
  /// Builds the transform, or `None` if the chromaticities are degenerate.
  #[must_use]
  pub fn new(chrm: &Chromaticities, file_gamma: u32, view_gamma: f64, display_gamma: f64) -> Option<Self> {
    let file = f64::from(file_gamma) / 100_000.0;
    if file <= 0.0 || display_gamma <= 0.0 {
      return None;
    }
    let matrix = mul(&XYZ_TO_SRGB, &rgb_to_xyz(chrm)?);
    let decode_exponent = 1.0 / file;
    let decode8 = (0..256).map(|i| (f64::from(i) / 255.0).powf(decode_exponent)).collect();
    Some(Self { matrix, decode_exponent, encode_exponent: view_gamma / display_gamma, decode8 })
  }

  #[inline]
  fn convert(&self, rgb: [f64; 3]) -> [f64; 3] {
    let m = &self.matrix;
    let mut out = [0.0; 3];
    for (r, o) in out.iter_mut().enumerate() {
      let lin = m[r][0] * rgb[0] + m[r][1] * rgb[1] + m[r][2] * rgb[2];
      *o = lin.clamp(0.0, 1.0).powf(self.encode_exponent);
    }
    out
  }

  /// Corrects the color channels of a row.
  pub fn apply(&self, row: &mut CanonicalRow) {
    match row {
      CanonicalRow::Rgba8(px) => {
        for p in px.iter_mut() {
          let d = |v: u8| self.decode8[usize::from(v)];
          let [r, g, b] = self.convert([d(p.r), d(p.g), d(p.b)]);
          p.r = (r * 255.0 + 0.5) as u8;
          p.g = (g * 255.0 + 0.5) as u8;
          p.b = (b * 255.0 + 0.5) as u8;
        }
      }
      CanonicalRow::Rgba16(px) => {
        for p in px.iter_mut() {
          let d = |v: u16| (f64::from(v) / 65535.0).powf(self.decode_exponent);
          let [r, g, b] = self.convert([d(p.r), d(p.g), d(p.b)]);
          p.r = (r * 65535.0 + 0.5) as u16;
          p.g = (g * 65535.0 + 0.5) as u16;
          p.b = (b * 65535.0 + 0.5) as u16;
        }
      }
    }
  }
}

#[test]
fn test_srgb_primaries_are_near_identity() {
  let srgb = Chromaticities {
    white_x: 31270,
    white_y: 32900,
    red_x: 64000,
    red_y: 33000,
    green_x: 30000,
    green_y: 60000,
    blue_x: 15000,
    blue_y: 6000,
  };
  let t = ChromaticityTransform::new(&srgb, 45455, 1.0, 2.2).unwrap();
  let mut row = CanonicalRow::Rgba8(std::vec![crate::RGBA8 { r: 200, g: 100, b: 30, a: 255 }]);
  t.apply(&mut row);
  let p = row.get8(0).unwrap();
  assert!((i32::from(p.r) - 200).abs() <= 2, "{p:?}");
  assert!((i32::from(p.g) - 100).abs() <= 2, "{p:?}");
  assert!((i32::from(p.b) - 30).abs() <= 2, "{p:?}");
  assert!(ChromaticityTransform::new(&Chromaticities::default(), 45455, 1.0, 2.2).is_none());
}

//! rHEALPix plane on the authalic unit sphere.
//!
//! HEALPix maps the sphere onto an equatorial band of four squares plus
//! four triangles at each pole. rHEALPix rotates the polar triangles about
//! the pole until they form one square above (`N`) and one below (`S`) the
//! first equatorial square:
//!
//! ```text
//!  N
//!  O  P  Q  R
//!  S
//! ```
//!
//! Every face square has side π/2 and is split into 3×3 children, numbered
//! row-major from the top-left corner.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;

/// Face letters in id order.
pub const FACES: [char; 6] = ['N', 'O', 'P', 'Q', 'R', 'S'];
/// Side of a face square in plane units.
pub const FACE_SIDE: f64 = FRAC_PI_2;
/// Subdivisions per axis per level.
pub const N_SIDE: u64 = 3;

const POLAR_CENTER_X: f64 = -3.0 * FRAC_PI_4;

fn column(x: f64) -> usize {
    (((x + PI) / FRAC_PI_2).floor() as i64).clamp(0, 3) as usize
}

fn column_center(j: usize) -> f64 {
    POLAR_CENTER_X + j as f64 * FRAC_PI_2
}

/// Rotate a polar-triangle offset onto its place in the polar square.
fn rotate(a: f64, b: f64, quarter_turns: usize, counter_clockwise: bool) -> (f64, f64) {
    let (mut a, mut b) = (a, b);
    for _ in 0..quarter_turns {
        (a, b) = if counter_clockwise { (-b, a) } else { (b, -a) };
    }
    (a, b)
}

/// Longitude and authalic latitude (radians) to plane coordinates.
pub fn forward(lam: f64, beta: f64) -> (f64, f64) {
    let sin_beta = beta.sin();
    if sin_beta.abs() <= 2.0 / 3.0 {
        return (lam, 3.0 * PI / 8.0 * sin_beta);
    }
    let north = beta > 0.0;
    let sigma = (3.0 * (1.0 - sin_beta.abs())).sqrt();
    let j = column(lam);
    let center = column_center(j);
    let x = center + (lam - center) * sigma;
    let y = FRAC_PI_4 * (2.0 - sigma);

    let pole = FRAC_PI_2.copysign(beta);
    let (a, b) = rotate(x - center, y.copysign(beta) - pole, j, north);
    (POLAR_CENTER_X + a, pole + b)
}

/// Plane coordinates to longitude and authalic latitude (radians).
pub fn inverse(x: f64, y: f64) -> (f64, f64) {
    if y.abs() <= FRAC_PI_4 {
        return (x, (8.0 * y / (3.0 * PI)).clamp(-1.0, 1.0).asin());
    }
    let north = y > 0.0;
    let pole = FRAC_PI_2.copysign(y);
    let (a, b) = (x - POLAR_CENTER_X, y - pole);

    // Which triangle of the polar square, counted in rotation steps.
    let toward_equator = if north { b <= -a.abs() } else { b >= a.abs() };
    let j = if toward_equator {
        0
    } else if a >= b.abs() {
        1
    } else if (north && b >= a.abs()) || (!north && b <= -a.abs()) {
        2
    } else {
        3
    };
    let (a, b) = rotate(a, b, j, !north);
    let center = column_center(j);
    let hx = center + a;
    let hy = pole + b;

    let sigma = 2.0 - 4.0 * hy.abs() / PI;
    let beta = (1.0 - sigma * sigma / 3.0).clamp(-1.0, 1.0).asin().copysign(hy);
    let lam = if sigma <= 1e-15 {
        center
    } else {
        center + (hx - center) / sigma
    };
    (lam, beta)
}

/// One rHEALPix cell: a face and its base-9 digit path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RhpCell {
    face: u8,
    digits: Vec<u8>,
}

impl RhpCell {
    /// Parse `N`, `O12`, `S840`, ... Face letters are case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        let face = FACES.iter().position(|f| *f == letter)? as u8;
        let digits = chars
            .map(|c| c.to_digit(10).filter(|d| *d < 9).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()?;
        Some(Self { face, digits })
    }

    pub fn face(&self) -> u8 {
        self.face
    }

    pub fn resolution(&self) -> u8 {
        self.digits.len() as u8
    }

    /// Top-left corner of a face in the plane.
    fn face_origin(face: u8) -> (f64, f64) {
        match face {
            0 => (-PI, 3.0 * FRAC_PI_4),
            5 => (-PI, -FRAC_PI_4),
            k => (-PI + (k - 1) as f64 * FRAC_PI_2, FRAC_PI_4),
        }
    }

    /// Cell of a plane point.
    pub fn from_plane(x: f64, y: f64, resolution: u8) -> Self {
        let face = if y > FRAC_PI_4 {
            0
        } else if y < -FRAC_PI_4 {
            5
        } else {
            1 + column(x) as u8
        };
        let (x0, y1) = Self::face_origin(face);
        let n = N_SIDE.pow(resolution as u32) as i64;
        let col = (((x - x0) / FACE_SIDE * n as f64).floor() as i64).clamp(0, n - 1) as u64;
        let row = (((y1 - y) / FACE_SIDE * n as f64).floor() as i64).clamp(0, n - 1) as u64;

        let digits = (0..resolution as u32)
            .rev()
            .map(|k| {
                let scale = N_SIDE.pow(k);
                ((row / scale % N_SIDE) * N_SIDE + col / scale % N_SIDE) as u8
            })
            .collect();
        Self { face, digits }
    }

    /// `(x0, y0, side)`: bottom-left corner and side of the cell square.
    pub fn plane_square(&self) -> (f64, f64, f64) {
        let (mut row, mut col) = (0u64, 0u64);
        for d in &self.digits {
            row = row * N_SIDE + (*d as u64) / N_SIDE;
            col = col * N_SIDE + (*d as u64) % N_SIDE;
        }
        let side = FACE_SIDE / N_SIDE.pow(self.digits.len() as u32) as f64;
        let (x0, y1) = Self::face_origin(self.face);
        (x0 + col as f64 * side, y1 - (row + 1) as f64 * side, side)
    }

    /// Children in digit order.
    pub fn children(&self) -> Vec<Self> {
        (0..9)
            .map(|d| {
                let mut digits = self.digits.clone();
                digits.push(d);
                Self {
                    face: self.face,
                    digits,
                }
            })
            .collect()
    }

    /// Every cell of a resolution, faces in order, digits ascending.
    pub fn all(resolution: u8) -> Vec<Self> {
        let mut level: Vec<Self> = (0..6)
            .map(|face| Self {
                face,
                digits: Vec::new(),
            })
            .collect();
        for _ in 0..resolution {
            level = level.iter().flat_map(|c| c.children()).collect();
        }
        level
    }
}

impl fmt::Display for RhpCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FACES[self.face as usize])?;
        for d in &self.digits {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equatorial_plane_is_cylindrical() {
        let (x, y) = forward(0.5, 0.0);
        assert_eq!((x, y), (0.5, 0.0));
        let (lam, beta) = inverse(x, y);
        assert!((lam - 0.5).abs() < 1e-12 && beta.abs() < 1e-12);
    }

    #[test]
    fn test_poles_map_to_square_centers() {
        let (x, y) = forward(1.0, FRAC_PI_2);
        assert!((x - POLAR_CENTER_X).abs() < 1e-12);
        assert!((y - FRAC_PI_2).abs() < 1e-12);
        let (x, y) = forward(-2.0, -FRAC_PI_2);
        assert!((x - POLAR_CENTER_X).abs() < 1e-12);
        assert!((y + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_parse_and_display() {
        let cell = RhpCell::parse("q804").unwrap();
        assert_eq!(cell.to_string(), "Q804");
        assert_eq!(cell.resolution(), 3);
        assert!(RhpCell::parse("X1").is_none());
        assert!(RhpCell::parse("N9").is_none());
        assert!(RhpCell::parse("").is_none());
    }

    #[test]
    fn test_cell_counts() {
        assert_eq!(RhpCell::all(0).len(), 6);
        assert_eq!(RhpCell::all(2).len(), 6 * 81);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_forward_inverse_roundtrip(lam in -3.14159..3.14159_f64, z in -0.9999..0.9999_f64) {
                let beta = z.asin();
                let (x, y) = forward(lam, beta);
                let (lam2, beta2) = inverse(x, y);
                prop_assert!((beta2 - beta).abs() < 1e-9);
                prop_assert!((lam2 - lam).abs() * beta.cos() < 1e-9);
            }

            #[test]
            fn test_center_maps_back(lam in -3.14159..3.14159_f64, z in -0.9999..0.9999_f64, res in 0u8..10) {
                let (x, y) = forward(lam, z.asin());
                let cell = RhpCell::from_plane(x, y, res);
                let (x0, y0, side) = cell.plane_square();
                prop_assert_eq!(RhpCell::from_plane(x0 + side / 2.0, y0 + side / 2.0, res), cell);
            }
        }
    }
}

//! S2 cell ids: cube face, Hilbert position and level packed into a `u64`.
//!
//! ```text
//! | face (3) | position (2·level) | 1 | 0 … |
//! ```
//!
//! Points are placed on the cube with the quadratic `st ↔ uv` transform.

use std::fmt;

pub const MAX_LEVEL: u8 = 30;
const POS_BITS: u32 = 2 * MAX_LEVEL as u32 + 1;
const MAX_SIZE: u32 = 1 << MAX_LEVEL;

const IJ_TO_POS: [[u64; 4]; 4] = [[0, 1, 3, 2], [0, 3, 1, 2], [2, 3, 1, 0], [2, 1, 3, 0]];
const POS_TO_IJ: [[u32; 4]; 4] = [[0, 1, 3, 2], [0, 2, 3, 1], [3, 2, 0, 1], [3, 1, 0, 2]];
const POS_TO_ORIENTATION: [usize; 4] = [1, 0, 0, 3];

/// Unit-sphere point from degrees.
pub fn xyz_from_lon_lat(lon: f64, lat: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// `(lon, lat)` in degrees of a (not necessarily unit) vector.
pub fn lon_lat_from_xyz(p: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = p;
    (y.atan2(x).to_degrees(), z.atan2(x.hypot(y)).to_degrees())
}

/// Cube face and face coordinates of a point.
pub fn face_uv(p: [f64; 3]) -> (u8, f64, f64) {
    let [x, y, z] = p;
    let abs = [x.abs(), y.abs(), z.abs()];
    let mut axis = if abs[0] > abs[1] { 0 } else { 1 };
    if abs[2] > abs[axis] {
        axis = 2;
    }
    let face = if p[axis] < 0.0 { axis + 3 } else { axis };
    let (u, v) = match face {
        0 => (y / x, z / x),
        1 => (-x / y, z / y),
        2 => (-x / z, -y / z),
        3 => (z / x, y / x),
        4 => (z / y, -x / y),
        _ => (-y / z, -x / z),
    };
    (face as u8, u, v)
}

/// Point on the cube for face coordinates.
pub fn xyz_from_face_uv(face: u8, u: f64, v: f64) -> [f64; 3] {
    match face {
        0 => [1.0, u, v],
        1 => [-u, 1.0, v],
        2 => [-u, -v, 1.0],
        3 => [-1.0, -v, -u],
        4 => [v, -1.0, -u],
        _ => [v, u, -1.0],
    }
}

pub fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

pub fn st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (4.0 * s * s - 1.0) / 3.0
    } else {
        (1.0 - 4.0 * (1.0 - s) * (1.0 - s)) / 3.0
    }
}

fn st_to_ij(s: f64) -> u32 {
    ((s * MAX_SIZE as f64).floor() as i64).clamp(0, MAX_SIZE as i64 - 1) as u32
}

/// A cell id; only valid ids are constructed by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct S2CellId(u64);

impl S2CellId {
    /// Leaf cell of face coordinates `(i, j)`.
    pub fn from_face_ij(face: u8, i: u32, j: u32) -> Self {
        let mut orientation = (face & 1) as usize;
        let mut pos: u64 = 0;
        for k in (0..MAX_LEVEL as u32).rev() {
            let ij = ((((i >> k) & 1) << 1) | ((j >> k) & 1)) as usize;
            let p = IJ_TO_POS[orientation][ij];
            pos = (pos << 2) | p;
            orientation ^= POS_TO_ORIENTATION[p as usize];
        }
        Self(((face as u64) << POS_BITS) | (pos << 1) | 1)
    }

    /// Cell containing a point at `level`.
    pub fn from_lon_lat(lon: f64, lat: f64, level: u8) -> Self {
        let (face, u, v) = face_uv(xyz_from_lon_lat(lon, lat));
        Self::from_face_ij(face, st_to_ij(uv_to_st(u)), st_to_ij(uv_to_st(v))).parent(level)
    }

    /// Level-0 cell of a face.
    pub fn from_face(face: u8) -> Self {
        Self(((face as u64) << POS_BITS) | (1 << (POS_BITS - 1)))
    }

    /// Raw id.
    pub fn id(&self) -> u64 {
        self.0
    }

    pub fn face(&self) -> u8 {
        (self.0 >> POS_BITS) as u8
    }

    fn lsb(&self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    pub fn level(&self) -> u8 {
        MAX_LEVEL - (self.0.trailing_zeros() / 2) as u8
    }

    /// Ancestor at `level`; `self` when `level` is not coarser.
    pub fn parent(&self, level: u8) -> Self {
        if level >= self.level() {
            return *self;
        }
        let lsb = 1u64 << (2 * (MAX_LEVEL - level) as u32);
        Self((self.0 & lsb.wrapping_neg()) | lsb)
    }

    /// The four children in Hilbert order; empty for leaves.
    pub fn children(&self) -> Vec<Self> {
        if self.level() >= MAX_LEVEL {
            return Vec::new();
        }
        let lsb = self.lsb();
        let step = lsb >> 2;
        (0..4u64)
            .map(|k| Self(self.0 - lsb + step * (2 * k + 1)))
            .collect()
    }

    /// `(face, i, j)` of the cell at its own level, `i, j < 2^level`.
    pub fn face_ij(&self) -> (u8, u32, u32) {
        let face = self.face();
        let mut orientation = (face & 1) as usize;
        let (mut i, mut j) = (0u32, 0u32);
        for t in 0..self.level() as u32 {
            let p = ((self.0 >> (POS_BITS - 2 - 2 * t)) & 3) as usize;
            let ij = POS_TO_IJ[orientation][p];
            i = (i << 1) | (ij >> 1);
            j = (j << 1) | (ij & 1);
            orientation ^= POS_TO_ORIENTATION[p];
        }
        (face, i, j)
    }

    /// `[u0, u1] × [v0, v1]` face-coordinate bounds.
    pub fn uv_bounds(&self) -> ([f64; 2], [f64; 2]) {
        let (_, i, j) = self.face_ij();
        let n = (1u64 << self.level()) as f64;
        let u = [st_to_uv(i as f64 / n), st_to_uv((i + 1) as f64 / n)];
        let v = [st_to_uv(j as f64 / n), st_to_uv((j + 1) as f64 / n)];
        (u, v)
    }

    /// Hex token with trailing zeros removed.
    pub fn to_token(&self) -> String {
        let hex = format!("{:016x}", self.0);
        let trimmed = hex.trim_end_matches('0');
        if trimmed.is_empty() {
            "X".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Parse a token, rejecting malformed or invalid ids.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() || token.len() > 16 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let id = u64::from_str_radix(&format!("{:0<16}", token), 16).ok()?;
        let cell = Self(id);
        cell.is_valid().then_some(cell)
    }

    fn is_valid(&self) -> bool {
        self.face() < 6 && (self.lsb() & 0x1555_5555_5555_5555) != 0
    }
}

impl fmt::Display for S2CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_tokens() {
        let tokens: Vec<String> = (0..6).map(|f| S2CellId::from_face(f).to_token()).collect();
        assert_eq!(tokens, vec!["1", "3", "5", "7", "9", "b"]);
    }

    #[test]
    fn test_known_tokens() {
        assert_eq!(S2CellId::from_lon_lat(-122.4194, 37.7749, 10).to_token(), "808581");
        assert_eq!(S2CellId::from_lon_lat(2.3522, 48.8566, 12).to_token(), "47e66e1");
        assert_eq!(S2CellId::from_lon_lat(0.0, 0.0, 5).to_token(), "1004");
    }

    #[test]
    fn test_parent_and_children() {
        let cell = S2CellId::from_lon_lat(2.3522, 48.8566, 12);
        let parent = cell.parent(11);
        assert_eq!(parent.level(), 11);
        assert!(parent.children().contains(&cell));
        assert_eq!(cell.parent(12), cell);
        assert_eq!(cell.parent(0), S2CellId::from_face(cell.face()));
    }

    #[test]
    fn test_token_validation() {
        assert!(S2CellId::from_token("X").is_none());
        assert!(S2CellId::from_token("c").is_none());
        assert!(S2CellId::from_token("2").is_none());
        assert!(S2CellId::from_token("zz").is_none());
        assert_eq!(S2CellId::from_token("47e66e1").map(|c| c.level()), Some(12));
    }

    #[test]
    fn test_st_uv_inverse() {
        for s in [0.0, 0.1, 0.25, 0.5, 0.8, 1.0] {
            assert!((uv_to_st(st_to_uv(s)) - s).abs() < 1e-12);
        }
    }
}

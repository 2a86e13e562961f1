//! Scale → resolution policy.
//!
//! Every family maps the map-scale denominator to a resolution through the
//! same zoom value
//!
//! ```text
//! z = 29.1402 − log₂(scale)
//! ```
//!
//! followed by a family-specific monotone [`ZoomCurve`]. Results are always
//! clamped into the family's range; an out-of-range configuration produces a
//! clamped resolution, never an error.
//!
//! # Example
//!
//! ```
//! use vgrid::family::DggsFamily;
//! use vgrid::resolution::{zoom_from_scale, ResolutionPolicy};
//!
//! let policy = ResolutionPolicy::new(DggsFamily::H3);
//! // 1:500M is a whole-world view.
//! assert_eq!(policy.resolve(500_000_000.0), 0);
//! assert!(zoom_from_scale(500_000_000.0) < 3.0);
//! ```

use crate::family::{DggsFamily, FamilyDescriptor};

/// Offset of the zoom formula, calibrated to Web Mercator zoom levels.
pub const ZOOM_OFFSET: f64 = 29.1402;

/// Zoom value of a scale denominator.
pub fn zoom_from_scale(scale: f64) -> f64 {
    ZOOM_OFFSET - scale.log2()
}

/// Family-specific mapping from zoom to a raw resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomCurve {
    /// `r` = number of thresholds strictly below `z`.
    StepTable(&'static [f64]),
    /// `r = ⌊z · k + b⌋`.
    Affine { k: f64, b: f64 },
    /// `r = 1 +` number of thresholds at or below `z`.
    Staircase(&'static [f64]),
    /// Affine floor, then snapped to the nearest valid resolution
    /// (ties go to the smaller one).
    AffineSnapped {
        k: f64,
        b: f64,
        valid: &'static [u8],
    },
}

impl ZoomCurve {
    /// Raw, unclamped resolution for a zoom.
    pub fn raw(&self, zoom: f64) -> i64 {
        match self {
            ZoomCurve::StepTable(thresholds) => thresholds.iter().filter(|t| zoom > **t).count() as i64,
            ZoomCurve::Affine { k, b } => (zoom * k + b).floor() as i64,
            ZoomCurve::Staircase(thresholds) => 1 + thresholds.iter().filter(|t| zoom >= **t).count() as i64,
            ZoomCurve::AffineSnapped { k, b, valid } => {
                snap_to_valid((zoom * k + b).floor() as i64, valid)
            }
        }
    }

    /// Valid set of a snapped curve.
    pub fn valid_set(&self) -> Option<&'static [u8]> {
        match self {
            ZoomCurve::AffineSnapped { valid, .. } => Some(valid),
            _ => None,
        }
    }
}

/// Nearest element of `valid` by absolute distance, ties toward the smaller.
///
/// `valid` must be sorted ascending; an empty set returns `raw` unchanged.
pub fn snap_to_valid(raw: i64, valid: &[u8]) -> i64 {
    let mut best: Option<i64> = None;
    for v in valid.iter().map(|v| *v as i64) {
        best = match best {
            Some(b) if (raw - b).abs() <= (raw - v).abs() => Some(b),
            _ => Some(v),
        };
    }
    best.unwrap_or(raw)
}

/// Resolution selection for one family, with user overrides applied.
///
/// Overrides are themselves clamped to the family's own range, so a stale
/// setting never selects an unsupported resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionPolicy {
    descriptor: FamilyDescriptor,
    offset: i32,
    min_override: Option<u8>,
    max_override: Option<u8>,
}

impl ResolutionPolicy {
    /// Policy with the family's defaults.
    pub fn new(family: DggsFamily) -> Self {
        Self {
            descriptor: family.descriptor(),
            offset: 0,
            min_override: None,
            max_override: None,
        }
    }

    /// Add a constant to the curve's result before clamping.
    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// Raise the lower bound.
    pub fn with_min(mut self, min: Option<u8>) -> Self {
        self.min_override = min;
        self
    }

    /// Lower the upper bound.
    pub fn with_max(mut self, max: Option<u8>) -> Self {
        self.max_override = max;
        self
    }

    /// Effective `[min, max]` after overrides.
    pub fn bounds(&self) -> (u8, u8) {
        let d = &self.descriptor;
        let min = self
            .min_override
            .map_or(d.min_res, |m| m.clamp(d.min_res, d.max_res));
        let max = self
            .max_override
            .map_or(d.max_res, |m| m.clamp(d.min_res, d.max_res))
            .max(min);
        (min, max)
    }

    /// Resolution for a zoom value.
    pub fn resolve_zoom(&self, zoom: f64) -> u8 {
        let (min, max) = self.bounds();
        if !zoom.is_finite() {
            return min;
        }
        let raw = self.descriptor.curve.raw(zoom) + self.offset as i64;
        let mut clamped = raw.clamp(min as i64, max as i64);
        if let Some(valid) = self.descriptor.curve.valid_set() {
            let in_bounds: Vec<u8> = valid.iter().copied().filter(|v| (min..=max).contains(v)).collect();
            clamped = snap_to_valid(clamped, &in_bounds);
        }
        clamped as u8
    }

    /// Resolution for a scale denominator.
    ///
    /// Non-positive or non-finite scales select the minimum resolution.
    pub fn resolve(&self, scale: f64) -> u8 {
        if !scale.is_finite() || scale <= 0.0 {
            return self.bounds().0;
        }
        self.resolve_zoom(zoom_from_scale(scale))
    }

    /// Descriptor this policy was built from.
    pub fn descriptor(&self) -> &FamilyDescriptor {
        &self.descriptor
    }
}

/// Default resolution of a family for a scale.
pub fn resolution_for_scale(family: DggsFamily, scale: f64) -> u8 {
    ResolutionPolicy::new(family).resolve(scale)
}

/// Scale denominator whose zoom equals `zoom`.
pub fn scale_for_zoom(zoom: f64) -> f64 {
    2.0_f64.powf(ZOOM_OFFSET - zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_zoom(family: DggsFamily, zoom: f64) -> u8 {
        ResolutionPolicy::new(family).resolve_zoom(zoom)
    }

    #[test]
    fn test_zoom_formula() {
        assert!((zoom_from_scale(1.0) - ZOOM_OFFSET).abs() < 1e-12);
        assert!((zoom_from_scale(1024.0) - (ZOOM_OFFSET - 10.0)).abs() < 1e-12);
        assert!((zoom_from_scale(scale_for_zoom(7.25)) - 7.25).abs() < 1e-9);
    }

    #[test]
    fn test_h3_step_table() {
        assert_eq!(at_zoom(DggsFamily::H3, 0.0), 0);
        assert_eq!(at_zoom(DggsFamily::H3, 3.0), 0);
        assert_eq!(at_zoom(DggsFamily::H3, 3.01), 1);
        assert_eq!(at_zoom(DggsFamily::H3, 21.9), 14);
        assert_eq!(at_zoom(DggsFamily::H3, 22.0), 15);
        assert_eq!(at_zoom(DggsFamily::H3, 40.0), 15);
    }

    #[test]
    fn test_affine_families() {
        assert_eq!(at_zoom(DggsFamily::S2, 10.0), 5);
        assert_eq!(at_zoom(DggsFamily::Isea3h, 10.0), 11);
        assert_eq!(at_zoom(DggsFamily::Qtm, 10.5), 10);
        assert_eq!(at_zoom(DggsFamily::Geohash, 10.0), 4);
        assert_eq!(at_zoom(DggsFamily::Maidenhead, 10.0), 3);
        assert_eq!(at_zoom(DggsFamily::Gars, 10.0), 3);
        assert_eq!(at_zoom(DggsFamily::Tilecode, 10.0), 11);
        assert_eq!(at_zoom(DggsFamily::Ease, 8.0), 0);
        assert_eq!(at_zoom(DggsFamily::Ease, 14.0), 3);
    }

    #[test]
    fn test_clamped_to_family_range() {
        assert_eq!(at_zoom(DggsFamily::Geohash, -5.0), 1);
        assert_eq!(at_zoom(DggsFamily::Maidenhead, 30.0), 4);
        assert_eq!(at_zoom(DggsFamily::Gars, 0.0), 1);
    }

    #[test]
    fn test_digipin_staircase() {
        assert_eq!(at_zoom(DggsFamily::Digipin, 3.9), 1);
        assert_eq!(at_zoom(DggsFamily::Digipin, 4.0), 2);
        assert_eq!(at_zoom(DggsFamily::Digipin, 5.9), 2);
        assert_eq!(at_zoom(DggsFamily::Digipin, 19.9), 9);
        assert_eq!(at_zoom(DggsFamily::Digipin, 20.0), 10);
    }

    #[test]
    fn test_olc_snapping_ties_go_down() {
        // Raw 3, 5, 7, 9 sit between two valid values.
        for (raw, expected) in [(3, 2), (5, 4), (7, 6), (9, 8)] {
            let zoom = raw as f64 * 1.7 + 0.01;
            assert_eq!(at_zoom(DggsFamily::Olc, zoom), expected, "raw {}", raw);
        }
        assert_eq!(at_zoom(DggsFamily::Olc, 0.0), 2);
        assert_eq!(at_zoom(DggsFamily::Olc, 12.0 * 1.7 + 0.01), 12);
    }

    #[test]
    fn test_overrides() {
        let policy = ResolutionPolicy::new(DggsFamily::H3)
            .with_offset(2)
            .with_max(Some(5));
        assert_eq!(policy.resolve_zoom(0.0), 2);
        assert_eq!(policy.resolve_zoom(20.0), 5);

        let stale = ResolutionPolicy::new(DggsFamily::Gars).with_min(Some(9)).with_max(Some(0));
        assert_eq!(stale.bounds(), (4, 4));
    }

    #[test]
    fn test_bad_scale_selects_min() {
        let policy = ResolutionPolicy::new(DggsFamily::Geohash);
        assert_eq!(policy.resolve(f64::NAN), 1);
        assert_eq!(policy.resolve(0.0), 1);
        assert_eq!(policy.resolve(-10.0), 1);
    }

    #[test]
    fn test_snap_to_valid() {
        let valid = [2u8, 4, 6, 8, 10, 11, 12, 13, 14, 15];
        assert_eq!(snap_to_valid(0, &valid), 2);
        assert_eq!(snap_to_valid(9, &valid), 8);
        assert_eq!(snap_to_valid(11, &valid), 11);
        assert_eq!(snap_to_valid(40, &valid), 15);
        assert_eq!(snap_to_valid(7, &[]), 7);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_monotone_in_scale(
                family_index in 0usize..DggsFamily::ALL.len(),
                s1 in 1.0..1e10_f64,
                factor in 1.0..1000.0_f64,
                offset in -3i32..3,
            ) {
                let family = DggsFamily::ALL[family_index];
                let policy = ResolutionPolicy::new(family).with_offset(offset);
                let s2 = s1 * factor;
                prop_assert!(
                    policy.resolve(s2) <= policy.resolve(s1),
                    "{}: zooming out from {} to {} increased resolution",
                    family, s1, s2
                );
            }

            #[test]
            fn test_always_in_range(
                family_index in 0usize..DggsFamily::ALL.len(),
                scale in prop_oneof![Just(f64::NAN), Just(0.0), 1e-6..1e12_f64],
                offset in -40i32..40,
            ) {
                let family = DggsFamily::ALL[family_index];
                let d = family.descriptor();
                let r = ResolutionPolicy::new(family).with_offset(offset).resolve(scale);
                prop_assert!(r >= d.min_res && r <= d.max_res);
                if let Some(valid) = d.curve.valid_set() {
                    prop_assert!(valid.contains(&r));
                }
            }
        }
    }
}

//! DGGS families and their static descriptors.
//!
//! A [`FamilyDescriptor`] is everything the pipeline needs to know about a
//! family without talking to its library: resolution range, zoom curve,
//! enumeration strategy, world-fill threshold and antimeridian default.

use std::fmt;
use std::str::FromStr;

use crate::geometry::AntimeridianPolicy;
use crate::resolution::ZoomCurve;

/// Supported DGGS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DggsFamily {
    H3,
    S2,
    A5,
    Rhealpix,
    Isea3h,
    Rtea4r,
    DggalRhealpix,
    Geohash,
    Olc,
    Qtm,
    Gars,
    Maidenhead,
    Tilecode,
    Digipin,
    Ease,
    Mgrs,
}

/// Shape of a family's enumeration kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Library lists cells in a WGS84 rectangle.
    GeoExtentList,
    /// Recursive descent over a textual code hierarchy.
    PrefixRefine,
    /// Neighbor traversal from the cell under the extent center.
    BfsFromSeed,
    /// Point sampling on a lattice sized to the cell step.
    Sampled,
    /// UTM square carving inside one grid zone (batch only).
    GzdCarve,
}

/// How the batch generator measures cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Geodesic area/perimeter on WGS84 (near-equal-area grids).
    Geodesic,
    /// Graticule width/height (lat-lon rectangle grids).
    Graticule,
}

/// Static per-family facts.
#[derive(Debug, Clone, Copy)]
pub struct FamilyDescriptor {
    pub family: DggsFamily,
    pub min_res: u8,
    pub max_res: u8,
    pub curve: ZoomCurve,
    pub strategy: StrategyKind,
    /// Resolutions up to this value enumerate the whole world.
    pub world_fill_max: Option<u8>,
    /// Replace the extent by the world when it touches a pole.
    pub pole_world_fallback: bool,
    pub antimeridian: AntimeridianPolicy,
    /// Interactive rendering is suppressed below this zoom.
    pub min_render_zoom: Option<f64>,
    /// Highest batch resolution allowed without an extent.
    pub batch_world_max: u8,
    /// Whether the interactive renderer offers this family.
    pub interactive: bool,
    pub metrics: MetricKind,
}

const H3_THRESHOLDS: &[f64] = &[
    3.0, 4.4, 5.7, 7.1, 8.4, 9.8, 11.4, 12.7, 14.1, 15.5, 16.8, 18.2, 19.5, 21.1, 21.9,
];

const DIGIPIN_THRESHOLDS: &[f64] = &[4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0];

const OLC_VALID: &[u8] = &[2, 4, 6, 8, 10, 11, 12, 13, 14, 15];

const fn descriptor(
    family: DggsFamily,
    min_res: u8,
    max_res: u8,
    curve: ZoomCurve,
    strategy: StrategyKind,
    batch_world_max: u8,
    metrics: MetricKind,
) -> FamilyDescriptor {
    FamilyDescriptor {
        family,
        min_res,
        max_res,
        curve,
        strategy,
        world_fill_max: None,
        pole_world_fallback: false,
        antimeridian: AntimeridianPolicy::Ignore,
        min_render_zoom: None,
        batch_world_max,
        interactive: true,
        metrics,
    }
}

impl DggsFamily {
    /// All families, in menu order.
    pub const ALL: [DggsFamily; 16] = [
        DggsFamily::H3,
        DggsFamily::S2,
        DggsFamily::A5,
        DggsFamily::Rhealpix,
        DggsFamily::Isea3h,
        DggsFamily::Rtea4r,
        DggsFamily::DggalRhealpix,
        DggsFamily::Geohash,
        DggsFamily::Olc,
        DggsFamily::Qtm,
        DggsFamily::Gars,
        DggsFamily::Maidenhead,
        DggsFamily::Tilecode,
        DggsFamily::Digipin,
        DggsFamily::Ease,
        DggsFamily::Mgrs,
    ];

    /// Settings/CLI key.
    pub fn key(&self) -> &'static str {
        match self {
            DggsFamily::H3 => "h3",
            DggsFamily::S2 => "s2",
            DggsFamily::A5 => "a5",
            DggsFamily::Rhealpix => "rhealpix",
            DggsFamily::Isea3h => "isea3h",
            DggsFamily::Rtea4r => "rtea4r",
            DggsFamily::DggalRhealpix => "dggal_rhealpix",
            DggsFamily::Geohash => "geohash",
            DggsFamily::Olc => "olc",
            DggsFamily::Qtm => "qtm",
            DggsFamily::Gars => "gars",
            DggsFamily::Maidenhead => "maidenhead",
            DggsFamily::Tilecode => "tilecode",
            DggsFamily::Digipin => "digipin",
            DggsFamily::Ease => "ease",
            DggsFamily::Mgrs => "mgrs",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            DggsFamily::H3 => "H3",
            DggsFamily::S2 => "S2",
            DggsFamily::A5 => "A5",
            DggsFamily::Rhealpix => "rHEALPix",
            DggsFamily::Isea3h => "ISEA3H (DGGAL)",
            DggsFamily::Rtea4r => "RTEA4R (DGGAL)",
            DggsFamily::DggalRhealpix => "rHEALPix (DGGAL)",
            DggsFamily::Geohash => "Geohash",
            DggsFamily::Olc => "OLC",
            DggsFamily::Qtm => "QTM",
            DggsFamily::Gars => "GARS",
            DggsFamily::Maidenhead => "Maidenhead",
            DggsFamily::Tilecode => "Tilecode",
            DggsFamily::Digipin => "DIGIPIN",
            DggsFamily::Ease => "EASE-DGGS",
            DggsFamily::Mgrs => "MGRS",
        }
    }

    /// Families offered by the interactive renderer.
    pub fn interactive() -> impl Iterator<Item = DggsFamily> {
        Self::ALL.into_iter().filter(|f| f.descriptor().interactive)
    }

    /// Static descriptor.
    pub fn descriptor(&self) -> FamilyDescriptor {
        use MetricKind::{Geodesic, Graticule};
        use StrategyKind::*;

        let by_1_7 = ZoomCurve::Affine { k: 1.0 / 1.7, b: 0.0 };
        match self {
            DggsFamily::H3 => FamilyDescriptor {
                world_fill_max: Some(0),
                ..descriptor(
                    *self,
                    0,
                    15,
                    ZoomCurve::StepTable(H3_THRESHOLDS),
                    GeoExtentList,
                    4,
                    Geodesic,
                )
            },
            DggsFamily::S2 => FamilyDescriptor {
                world_fill_max: Some(3),
                antimeridian: AntimeridianPolicy::ShiftEast,
                ..descriptor(*self, 0, 30, by_1_7, GeoExtentList, 6, Geodesic)
            },
            DggsFamily::A5 => FamilyDescriptor {
                antimeridian: AntimeridianPolicy::Split,
                ..descriptor(*self, 0, 29, by_1_7, Sampled, 5, Geodesic)
            },
            DggsFamily::Rhealpix => FamilyDescriptor {
                world_fill_max: Some(2),
                antimeridian: AntimeridianPolicy::ShiftEast,
                ..descriptor(*self, 0, 15, by_1_7, BfsFromSeed, 4, Geodesic)
            },
            DggsFamily::Isea3h => FamilyDescriptor {
                pole_world_fallback: true,
                antimeridian: AntimeridianPolicy::Split,
                ..descriptor(
                    *self,
                    0,
                    33,
                    ZoomCurve::Affine { k: 1.15, b: 0.0 },
                    GeoExtentList,
                    4,
                    Geodesic,
                )
            },
            DggsFamily::Rtea4r => FamilyDescriptor {
                world_fill_max: Some(2),
                antimeridian: AntimeridianPolicy::Split,
                ..descriptor(
                    *self,
                    0,
                    25,
                    ZoomCurve::Affine { k: 1.0, b: 0.0 },
                    GeoExtentList,
                    4,
                    Geodesic,
                )
            },
            DggsFamily::DggalRhealpix => FamilyDescriptor {
                world_fill_max: Some(2),
                antimeridian: AntimeridianPolicy::Split,
                ..descriptor(*self, 0, 15, by_1_7, GeoExtentList, 4, Geodesic)
            },
            DggsFamily::Geohash => FamilyDescriptor {
                world_fill_max: Some(2),
                ..descriptor(
                    *self,
                    1,
                    10,
                    ZoomCurve::Affine { k: 0.45, b: 0.0 },
                    PrefixRefine,
                    4,
                    Graticule,
                )
            },
            DggsFamily::Olc => FamilyDescriptor {
                world_fill_max: Some(2),
                ..descriptor(
                    *self,
                    2,
                    15,
                    ZoomCurve::AffineSnapped {
                        k: 1.0 / 1.7,
                        b: 0.0,
                        valid: OLC_VALID,
                    },
                    Sampled,
                    4,
                    Graticule,
                )
            },
            DggsFamily::Qtm => descriptor(
                *self,
                1,
                24,
                ZoomCurve::Affine { k: 1.0, b: 0.0 },
                PrefixRefine,
                8,
                Geodesic,
            ),
            DggsFamily::Gars => descriptor(
                *self,
                1,
                4,
                ZoomCurve::Affine { k: 0.2, b: 1.0 },
                Sampled,
                1,
                Graticule,
            ),
            DggsFamily::Maidenhead => FamilyDescriptor {
                world_fill_max: Some(1),
                ..descriptor(
                    *self,
                    1,
                    4,
                    ZoomCurve::Affine { k: 1.0 / 3.1, b: 0.0 },
                    Sampled,
                    2,
                    Graticule,
                )
            },
            DggsFamily::Tilecode => descriptor(
                *self,
                0,
                26,
                ZoomCurve::Affine { k: 1.1, b: 0.0 },
                GeoExtentList,
                8,
                Graticule,
            ),
            DggsFamily::Digipin => descriptor(
                *self,
                1,
                10,
                ZoomCurve::Staircase(DIGIPIN_THRESHOLDS),
                Sampled,
                5,
                Graticule,
            ),
            DggsFamily::Ease => FamilyDescriptor {
                min_render_zoom: Some(8.0),
                antimeridian: AntimeridianPolicy::Split,
                ..descriptor(
                    *self,
                    0,
                    6,
                    ZoomCurve::Affine { k: 0.5, b: -4.0 },
                    GeoExtentList,
                    1,
                    Geodesic,
                )
            },
            DggsFamily::Mgrs => FamilyDescriptor {
                interactive: false,
                ..descriptor(
                    *self,
                    0,
                    5,
                    ZoomCurve::Affine { k: 0.0, b: 0.0 },
                    GzdCarve,
                    1,
                    Geodesic,
                )
            },
        }
    }
}

impl fmt::Display for DggsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DggsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        DggsFamily::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = DggsFamily::ALL.iter().map(|f| f.key()).collect();
                format!("unknown DGGS family '{}' (known: {})", s, known.join(", "))
            })
    }
}

impl FamilyDescriptor {
    /// Whether `resolution` lies in `[min_res, max_res]`.
    pub fn supports(&self, resolution: u8) -> bool {
        (self.min_res..=self.max_res).contains(&resolution)
    }

    /// Whether enumeration at `resolution` covers the whole world.
    pub fn is_world_fill(&self, resolution: u8) -> bool {
        self.world_fill_max.is_some_and(|max| resolution <= max)
    }
}

//! Coordinate projection.
//!
//! WGS84 is the hub: every DGGS adapter works in longitude/latitude, the
//! viewport is projected *to* WGS84 before enumeration and every emitted
//! polygon is projected *from* WGS84 into the canvas CRS before drawing.
//!
//! # Design
//!
//! The host supplies a [`Projector`], a factory of [`CoordinateTransform`]s
//! between two CRS ids. [`BuiltinProjector`] covers the CRSs this crate
//! needs on its own:
//!
//! | CRS            | Projection                                   |
//! |----------------|----------------------------------------------|
//! | EPSG:4326      | geographic (identity)                        |
//! | EPSG:3857      | spherical Web Mercator                       |
//! | EPSG:326zz/327zz | UTM zone `zz`, north/south (Krüger series) |
//! | EPSG:6933      | EASE-Grid 2.0 cylindrical equal-area         |
//!
//! # Example
//!
//! ```
//! use vgrid::geometry::GeoRect;
//! use vgrid::projection::{project_rect, BuiltinProjector, CrsId, Projector};
//!
//! let projector = BuiltinProjector::new();
//! let to_wgs84 = projector.for_crs(CrsId::WEB_MERCATOR, CrsId::WGS84).unwrap();
//! let rect = GeoRect::new(-1000.0, -1000.0, 1000.0, 1000.0).unwrap();
//! let geo = project_rect(&rect, to_wgs84.as_ref()).unwrap();
//! assert!(geo.width() < 0.1);
//! ```

pub mod cea;
pub mod ellipsoid;
pub mod utm;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geo::{Coord, LineString, Polygon};
use thiserror::Error;

use crate::coord;
use crate::geometry::{densify, GeoRect};

/// Segments per rectangle edge when projecting an extent.
const RECT_EDGE_SEGMENTS: usize = 16;

/// Errors raised while transforming coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// No transform is known for this CRS.
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(CrsId),

    /// The coordinate lies outside the projection's valid domain.
    #[error("Coordinate ({x}, {y}) outside projection domain")]
    OutOfDomain { x: f64, y: f64 },

    /// The transform produced NaN or infinity.
    #[error("Projection produced a non-finite coordinate")]
    NonFinite,
}

/// EPSG code of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrsId(pub u32);

impl CrsId {
    /// WGS84 geographic.
    pub const WGS84: CrsId = CrsId(4326);
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: CrsId = CrsId(3857);
    /// EASE-Grid 2.0 global.
    pub const EASE_GRID_2: CrsId = CrsId(6933);

    /// WGS84 UTM zone CRS (`326zz` north, `327zz` south).
    pub fn utm(zone: u8, north: bool) -> CrsId {
        let base = if north { 32600 } else { 32700 };
        CrsId(base + zone as u32)
    }

    /// EPSG code.
    pub fn code(&self) -> u32 {
        self.0
    }

    /// Whether this is WGS84 geographic.
    pub fn is_wgs84(&self) -> bool {
        *self == CrsId::WGS84
    }
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for CrsId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(CrsId)
            .map_err(|_| format!("invalid CRS '{}', expected EPSG:<code>", s))
    }
}

/// A ready-to-use transform between two CRSs.
pub trait CoordinateTransform: Send + Sync {
    /// Source CRS.
    fn source(&self) -> CrsId;

    /// Destination CRS.
    fn target(&self) -> CrsId;

    /// Transform one coordinate.
    fn transform(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError>;

    /// Whether the transform leaves coordinates unchanged.
    fn is_identity(&self) -> bool {
        self.source() == self.target()
    }
}

/// Factory of coordinate transforms, shared read-only by all renders.
pub trait Projector: Send + Sync {
    /// Build a transform from `src` to `dst`.
    fn for_crs(&self, src: CrsId, dst: CrsId) -> Result<Arc<dyn CoordinateTransform>, ProjectionError>;
}

/// Reproject a rectangle and return the bounding box of the result.
///
/// Edges are densified before transforming so curved images of straight
/// edges are covered. Area outside the bounding box is lost, which is
/// acceptable for viewport culling.
pub fn project_rect(rect: &GeoRect, transform: &dyn CoordinateTransform) -> Result<GeoRect, ProjectionError> {
    if transform.is_identity() {
        return Ok(*rect);
    }
    let corners = [
        Coord { x: rect.min_lon, y: rect.min_lat },
        Coord { x: rect.max_lon, y: rect.min_lat },
        Coord { x: rect.max_lon, y: rect.max_lat },
        Coord { x: rect.min_lon, y: rect.max_lat },
    ];
    let mut projected = Vec::with_capacity(4 * RECT_EDGE_SEGMENTS);
    for i in 0..corners.len() {
        let next = corners[(i + 1) % corners.len()];
        for c in densify(corners[i], next, RECT_EDGE_SEGMENTS) {
            projected.push(transform.transform(c)?);
        }
    }
    GeoRect::bounding(projected).ok_or(ProjectionError::NonFinite)
}

/// Reproject every vertex of a polygon, preserving ring topology.
///
/// A failure on any vertex fails the whole polygon.
pub fn project_polygon(
    polygon: &Polygon<f64>,
    transform: &dyn CoordinateTransform,
) -> Result<Polygon<f64>, ProjectionError> {
    if transform.is_identity() {
        return Ok(polygon.clone());
    }
    let project_ring = |ring: &LineString<f64>| -> Result<LineString<f64>, ProjectionError> {
        ring.coords()
            .map(|c| transform.transform(*c))
            .collect::<Result<Vec<_>, _>>()
            .map(LineString::from)
    };
    let exterior = project_ring(polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(project_ring)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Projections the builtin projector knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrsKind {
    Geographic,
    WebMercator,
    Utm { zone: u8, north: bool },
    Ease2,
}

impl CrsKind {
    fn of(crs: CrsId) -> Result<Self, ProjectionError> {
        match crs.0 {
            4326 => Ok(CrsKind::Geographic),
            3857 | 900913 => Ok(CrsKind::WebMercator),
            6933 => Ok(CrsKind::Ease2),
            code @ 32601..=32660 => Ok(CrsKind::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            code @ 32701..=32760 => Ok(CrsKind::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(ProjectionError::UnsupportedCrs(crs)),
        }
    }

    /// Projected coordinates → WGS84 degrees.
    fn to_wgs84(self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let (x, y) = match self {
            CrsKind::Geographic => (c.x, c.y),
            CrsKind::WebMercator => coord::mercator_inverse(c.x, c.y),
            CrsKind::Utm { zone, north } => utm::inverse(zone, north, c.x, c.y)?,
            CrsKind::Ease2 => cea::inverse(c.x, c.y)?,
        };
        finite(x, y)
    }

    /// WGS84 degrees → projected coordinates.
    fn from_wgs84(self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let (x, y) = match self {
            CrsKind::Geographic => (c.x, c.y),
            CrsKind::WebMercator => coord::mercator_forward(c.x, c.y),
            CrsKind::Utm { zone, north } => utm::forward(zone, north, c.x, c.y)?,
            CrsKind::Ease2 => cea::forward(c.x, c.y)?,
        };
        finite(x, y)
    }
}

fn finite(x: f64, y: f64) -> Result<Coord<f64>, ProjectionError> {
    if x.is_finite() && y.is_finite() {
        Ok(Coord { x, y })
    } else {
        Err(ProjectionError::NonFinite)
    }
}

/// Transform produced by [`BuiltinProjector`]: source → WGS84 → destination.
#[derive(Debug, Clone)]
pub struct BuiltinTransform {
    src: CrsId,
    dst: CrsId,
    from: CrsKind,
    to: CrsKind,
}

impl CoordinateTransform for BuiltinTransform {
    fn source(&self) -> CrsId {
        self.src
    }

    fn target(&self) -> CrsId {
        self.dst
    }

    fn transform(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        let geographic = self.from.to_wgs84(c)?;
        self.to.from_wgs84(geographic)
    }
}

/// Projector covering EPSG:4326, EPSG:3857, UTM and EPSG:6933.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProjector;

impl BuiltinProjector {
    /// Create the builtin projector.
    pub fn new() -> Self {
        Self
    }

    /// Whether a CRS is supported.
    pub fn supports(crs: CrsId) -> bool {
        CrsKind::of(crs).is_ok()
    }
}

impl Projector for BuiltinProjector {
    fn for_crs(&self, src: CrsId, dst: CrsId) -> Result<Arc<dyn CoordinateTransform>, ProjectionError> {
        let transform = BuiltinTransform {
            src,
            dst,
            from: CrsKind::of(src)?,
            to: CrsKind::of(dst)?,
        };
        tracing::debug!("Projector: built transform {} -> {}", src, dst);
        Ok(Arc::new(transform))
    }
}

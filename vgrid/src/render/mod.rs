//! Viewport rendering.
//!
//! ```text
//! extent changed ──▶ DebounceSlot (150 ms) ──▶ render_once
//!                                                 │
//!   prepare_viewport: scale → resolution, extent → WGS84, world fill
//!                                                 │
//!   enumerate ─▶ antimeridian policy ─▶ WGS84 → canvas CRS ─▶ DrawHandle
//! ```
//!
//! [`ViewportRenderer`] owns one [`RenderSession`] per attached family.
//! Nothing about the cells survives a pass; every render starts from the
//! viewport alone.

pub mod debounce;
pub mod host;
mod renderer;
mod session;

pub use debounce::{DebounceSlot, DEBOUNCE_INTERVAL};
pub use host::{Canvas, DrawHandle, StatusBar, ViewportSource};
pub use renderer::ViewportRenderer;
pub use session::{RenderReport, RenderSession};

use crate::error::VgridError;
use crate::family::FamilyDescriptor;
use crate::geometry::GeoRect;
use crate::projection::{project_rect, CrsId, Projector};
use crate::resolution::{zoom_from_scale, ResolutionPolicy};

/// Visible map region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Extent in `crs` units.
    pub extent: GeoRect,
    pub crs: CrsId,
    /// Map-scale denominator; larger is more zoomed out.
    pub scale: f64,
}

impl Viewport {
    pub fn new(extent: GeoRect, crs: CrsId, scale: f64) -> Self {
        Self { extent, crs, scale }
    }

    /// Geographic viewport.
    pub fn wgs84(extent: GeoRect, scale: f64) -> Self {
        Self::new(extent, CrsId::WGS84, scale)
    }

    /// Zoom value of the scale.
    pub fn zoom(&self) -> f64 {
        zoom_from_scale(self.scale)
    }
}

/// What one family enumerates for a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedViewport {
    pub resolution: u8,
    /// WGS84 extent handed to the kernel.
    pub extent: GeoRect,
    /// The extent was replaced by the whole world.
    pub world_fill: bool,
}

/// Reduce a viewport to `(resolution, WGS84 extent)` for one family.
///
/// 1. project the extent to WGS84 when the canvas uses another CRS
/// 2. clamp to `[-180, 180] × [-90, 90]`
/// 3. pick the resolution from the scale
/// 4. replace the extent by the world at world-fill resolutions, or when
///    the family falls back to the world for extents reaching a pole
///
/// # Returns
///
/// `None` when the family does not render at this zoom.
///
/// # Errors
///
/// `InvalidViewport` for a non-positive or non-finite scale;
/// `ProjectionFailed` when the extent cannot be brought to WGS84.
pub fn prepare_viewport(
    viewport: &Viewport,
    policy: &ResolutionPolicy,
    projector: &dyn Projector,
) -> Result<Option<PreparedViewport>, VgridError> {
    if !viewport.scale.is_finite() || viewport.scale <= 0.0 {
        return Err(VgridError::InvalidViewport(format!("scale 1:{}", viewport.scale)));
    }
    let descriptor: &FamilyDescriptor = policy.descriptor();
    if let Some(min_zoom) = descriptor.min_render_zoom {
        if viewport.zoom() < min_zoom {
            tracing::debug!(
                family = %descriptor.family,
                zoom = viewport.zoom(),
                min_zoom,
                "Render: below minimum zoom"
            );
            return Ok(None);
        }
    }

    let geographic = if viewport.crs.is_wgs84() {
        viewport.extent
    } else {
        let to_wgs84 = projector.for_crs(viewport.crs, CrsId::WGS84)?;
        project_rect(&viewport.extent, to_wgs84.as_ref())?
    };
    let clamped = geographic.clamp_to_world();

    let resolution = policy.resolve(viewport.scale);
    let world_fill = descriptor.is_world_fill(resolution) || (descriptor.pole_world_fallback && clamped.touches_pole());
    let extent = if world_fill { GeoRect::world() } else { clamped };

    Ok(Some(PreparedViewport {
        resolution,
        extent,
        world_fill,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::DggsFamily;
    use crate::projection::BuiltinProjector;
    use crate::resolution::scale_for_zoom;

    fn prepare(family: DggsFamily, viewport: Viewport) -> Option<PreparedViewport> {
        prepare_viewport(&viewport, &ResolutionPolicy::new(family), &BuiltinProjector::new()).unwrap()
    }

    #[test]
    fn test_world_fill_replaces_extent() {
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let prepared = prepare(DggsFamily::H3, Viewport::wgs84(extent, scale_for_zoom(2.0))).unwrap();
        assert_eq!(prepared.resolution, 0);
        assert!(prepared.world_fill);
        assert!(prepared.extent.is_world());

        let prepared = prepare(DggsFamily::H3, Viewport::wgs84(extent, scale_for_zoom(6.0))).unwrap();
        assert!(!prepared.world_fill);
        assert_eq!(prepared.extent, extent);
    }

    #[test]
    fn test_pole_fallback() {
        let polar = GeoRect::new(-30.0, 60.0, 30.0, 95.0).unwrap();
        let prepared = prepare(DggsFamily::Isea3h, Viewport::wgs84(polar, scale_for_zoom(5.0))).unwrap();
        assert!(prepared.world_fill);

        let prepared = prepare(DggsFamily::Geohash, Viewport::wgs84(polar, scale_for_zoom(9.0))).unwrap();
        assert!(!prepared.world_fill);
        assert_eq!(prepared.extent.max_lat, 90.0);
    }

    #[test]
    fn test_ease_gated_below_zoom_8() {
        let extent = GeoRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(prepare(DggsFamily::Ease, Viewport::wgs84(extent, scale_for_zoom(7.9))).is_none());
        assert!(prepare(DggsFamily::Ease, Viewport::wgs84(extent, scale_for_zoom(8.5))).is_some());
    }

    #[test]
    fn test_web_mercator_viewport_is_projected() {
        // Roughly (−1°, −1°)–(1°, 1°) in EPSG:3857.
        let extent = GeoRect::new(-111_319.5, -111_325.1, 111_319.5, 111_325.1).unwrap();
        let viewport = Viewport::new(extent, CrsId::WEB_MERCATOR, scale_for_zoom(9.0));
        let prepared = prepare(DggsFamily::Geohash, viewport).unwrap();
        assert!((prepared.extent.min_lon + 1.0).abs() < 1e-3);
        assert!((prepared.extent.max_lat - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_bad_scale() {
        let extent = GeoRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let result = prepare_viewport(
            &Viewport::wgs84(extent, 0.0),
            &ResolutionPolicy::new(DggsFamily::H3),
            &BuiltinProjector::new(),
        );
        assert!(matches!(result, Err(VgridError::InvalidViewport(_))));
    }
}

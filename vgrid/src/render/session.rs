//! Per-family render state and the render pass itself.

use std::time::Instant;

use super::debounce::DebounceSlot;
use super::host::DrawHandle;
use super::{prepare_viewport, Viewport};
use crate::config::FamilySettings;
use crate::dggs::DggsAdapter;
use crate::enumerate::{enumerate, CancellationToken, EnumerationContext};
use crate::error::VgridError;
use crate::family::DggsFamily;
use crate::projection::{project_polygon, CrsId, Projector};

/// Outcome of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub family: Option<DggsFamily>,
    /// Resolution rendered, `None` when the family is gated at this zoom.
    pub resolution: Option<u8>,
    /// Cells enumerated.
    pub cells: usize,
    /// Polygons added to the draw handle (split cells count twice).
    pub drawn: usize,
    /// Cells or pieces dropped by per-cell failures.
    pub skipped: usize,
    /// The cell budget cut the pass short.
    pub truncated: bool,
    pub world_fill: bool,
}

/// Long-lived state of one family.
///
/// The session exclusively owns its draw handle and clears it when
/// dropped, so teardown leaves nothing on the canvas.
pub struct RenderSession {
    family: DggsFamily,
    adapter: Box<dyn DggsAdapter>,
    draw: Box<dyn DrawHandle>,
    enabled: bool,
    last_draw: Option<Instant>,
    debounce: DebounceSlot,
}

impl RenderSession {
    pub fn new(adapter: Box<dyn DggsAdapter>, draw: Box<dyn DrawHandle>) -> Self {
        Self {
            family: adapter.family(),
            adapter,
            draw,
            enabled: false,
            last_draw: None,
            debounce: DebounceSlot::default(),
        }
    }

    pub fn family(&self) -> DggsFamily {
        self.family
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When the last pass finished.
    pub fn last_draw(&self) -> Option<Instant> {
        self.last_draw
    }

    pub fn debounce(&self) -> &DebounceSlot {
        &self.debounce
    }

    pub(crate) fn debounce_mut(&mut self) -> &mut DebounceSlot {
        &mut self.debounce
    }

    /// Switch the family on or off.
    ///
    /// Disabling clears the overlay and drops any pending render; enabling
    /// draws nothing until the next extent change.
    ///
    /// # Returns
    ///
    /// Whether the overlay was cleared.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        tracing::info!(family = %self.family, enabled, "Render: family toggled");
        if !enabled {
            self.debounce.stop();
            self.draw.reset();
            return true;
        }
        false
    }

    /// Clear the overlay and draw the cells of `viewport`.
    ///
    /// # Arguments
    ///
    /// * `viewport` - Current viewport in the canvas CRS
    /// * `settings` - This family's settings snapshot
    /// * `projector` - Shared projector
    /// * `max_cells` - Cell budget of the pass
    /// * `cancel` - Checked between cells
    ///
    /// # Errors
    ///
    /// Only whole-pass failures: an unusable viewport, a canvas CRS the
    /// projector does not know, or a rejected enumeration. A cell whose
    /// polygon cannot be projected is skipped.
    pub fn render_once(
        &mut self,
        viewport: &Viewport,
        settings: &FamilySettings,
        projector: &dyn Projector,
        max_cells: usize,
        cancel: &CancellationToken,
    ) -> Result<RenderReport, VgridError> {
        self.draw.reset();
        let mut report = RenderReport {
            family: Some(self.family),
            ..RenderReport::default()
        };

        let policy = settings.policy(self.family);
        let Some(prepared) = prepare_viewport(viewport, &policy, projector)? else {
            return Ok(report);
        };
        report.resolution = Some(prepared.resolution);
        report.world_fill = prepared.world_fill;

        let to_canvas = projector.for_crs(CrsId::WGS84, viewport.crs)?;
        let ctx = EnumerationContext::new(prepared.resolution, prepared.extent)
            .with_max_cells(max_cells)
            .with_cancel(cancel.clone());
        let enumeration = enumerate(self.adapter.as_ref(), &ctx)?;

        self.draw.set_stroke(settings.color);
        self.draw.set_width(settings.width);

        report.cells = enumeration.cells.len();
        report.skipped = enumeration.skipped;
        report.truncated = enumeration.truncated;
        for cell in enumeration.cells {
            for piece in settings.antimeridian.apply(cell.polygon) {
                match project_polygon(&piece, to_canvas.as_ref()) {
                    Ok(projected) => {
                        self.draw.add_geometry(&projected);
                        report.drawn += 1;
                    }
                    Err(e) => {
                        tracing::debug!(family = %self.family, cell = %cell.id, error = %e, "Render: skipping cell");
                        report.skipped += 1;
                    }
                }
            }
        }
        self.last_draw = Some(Instant::now());

        tracing::debug!(
            family = %self.family,
            resolution = prepared.resolution,
            cells = report.cells,
            drawn = report.drawn,
            skipped = report.skipped,
            truncated = report.truncated,
            "Render: pass complete"
        );
        Ok(report)
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.debounce.stop();
        self.draw.reset();
        tracing::debug!(family = %self.family, "Render: session released");
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("family", &self.family)
            .field("enabled", &self.enabled)
            .field("last_draw", &self.last_draw)
            .field("debounce", &self.debounce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::geohash::GeohashAdapter;
    use crate::dggs::s2::S2Adapter;
    use crate::geometry::{lon_span, GeoRect};
    use crate::projection::BuiltinProjector;
    use crate::render::host::RecordingDrawHandle;
    use crate::resolution::scale_for_zoom;

    fn session(adapter: Box<dyn DggsAdapter>) -> (RenderSession, RecordingDrawHandle) {
        let handle = RecordingDrawHandle::new();
        (RenderSession::new(adapter, Box::new(handle.clone())), handle)
    }

    #[test]
    fn test_render_draws_cells_with_style() {
        let (mut session, handle) = session(Box::new(GeohashAdapter::new()));
        let settings = FamilySettings::defaults(DggsFamily::Geohash);
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let viewport = Viewport::wgs84(extent, scale_for_zoom(7.0));

        let report = session
            .render_once(&viewport, &settings, &BuiltinProjector::new(), 10_000, &CancellationToken::new())
            .unwrap();
        assert_eq!(report.resolution, Some(3));
        assert!(report.cells > 0);
        assert_eq!(report.drawn, report.cells);

        let log = handle.snapshot();
        assert_eq!(log.geometries.len(), report.drawn);
        assert_eq!(log.stroke, Some(settings.color));
        assert_eq!(log.width, Some(settings.width));
    }

    #[test]
    fn test_render_projects_to_canvas_crs() {
        let (mut session, handle) = session(Box::new(GeohashAdapter::new()));
        let settings = FamilySettings::defaults(DggsFamily::Geohash);
        let extent = GeoRect::new(0.0, 0.0, 200_000.0, 200_000.0).unwrap();
        let viewport = Viewport::new(extent, CrsId::WEB_MERCATOR, scale_for_zoom(9.0));

        session
            .render_once(&viewport, &settings, &BuiltinProjector::new(), 10_000, &CancellationToken::new())
            .unwrap();
        let log = handle.snapshot();
        assert!(!log.geometries.is_empty());
        let max_x = log
            .geometries
            .iter()
            .flat_map(|p| p.exterior().coords().map(|c| c.x))
            .fold(f64::MIN, f64::max);
        assert!(max_x > 1000.0, "polygons should be in meters, got {}", max_x);
    }

    #[test]
    fn test_split_policy_on_seam() {
        let (mut session, handle) = session(Box::new(S2Adapter::new()));
        let mut settings = FamilySettings::defaults(DggsFamily::S2);
        settings.antimeridian = crate::geometry::AntimeridianPolicy::Split;
        let extent = GeoRect::new(170.0, -10.0, 180.0, 10.0).unwrap();
        let viewport = Viewport::wgs84(extent, scale_for_zoom(7.0));

        let report = session
            .render_once(&viewport, &settings, &BuiltinProjector::new(), 10_000, &CancellationToken::new())
            .unwrap();
        assert!(report.drawn > 0);
        for polygon in handle.snapshot().geometries {
            assert!(lon_span(&polygon) < 180.0);
        }
    }

    #[test]
    fn test_disable_clears_and_drop_resets() {
        let (mut session, handle) = session(Box::new(GeohashAdapter::new()));
        assert!(!session.set_enabled(false));
        session.set_enabled(true);
        assert_eq!(handle.snapshot().resets, 0);
        assert!(session.set_enabled(false));
        assert_eq!(handle.snapshot().resets, 1);
        drop(session);
        assert_eq!(handle.snapshot().resets, 2);
    }

    #[test]
    fn test_unsupported_canvas_crs_fails_the_pass() {
        let (mut session, _handle) = session(Box::new(GeohashAdapter::new()));
        let settings = FamilySettings::defaults(DggsFamily::Geohash);
        let extent = GeoRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let viewport = Viewport::new(extent, CrsId(27700), scale_for_zoom(9.0));
        let result = session.render_once(&viewport, &settings, &BuiltinProjector::new(), 100, &CancellationToken::new());
        assert!(matches!(result, Err(VgridError::ProjectionFailed(_))));
    }
}

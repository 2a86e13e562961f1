//! Per-family sessions driven by extent changes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use super::host::{Canvas, DrawHandle, StatusBar, ViewportSource};
use super::session::{RenderReport, RenderSession};
use super::Viewport;
use crate::config::Settings;
use crate::dggs::{build_adapter, AdapterContext, DggsAdapter};
use crate::enumerate::CancellationToken;
use crate::error::VgridError;
use crate::family::DggsFamily;
use crate::projection::Projector;

/// Renders every enabled family on its own debounce schedule.
///
/// All methods run on the host thread. A render that is in progress when
/// the extent changes again completes normally; the change re-arms the
/// slot and the next render picks up the newest viewport.
pub struct ViewportRenderer {
    projector: Arc<dyn Projector>,
    settings: Settings,
    canvas: Box<dyn Canvas>,
    status: Box<dyn StatusBar>,
    sessions: BTreeMap<DggsFamily, RenderSession>,
    unavailable: BTreeMap<DggsFamily, String>,
    cancel: CancellationToken,
}

impl ViewportRenderer {
    pub fn new(
        projector: Arc<dyn Projector>,
        settings: Settings,
        canvas: Box<dyn Canvas>,
        status: Box<dyn StatusBar>,
    ) -> Self {
        Self {
            projector,
            settings,
            canvas,
            status,
            sessions: BTreeMap::new(),
            unavailable: BTreeMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build the family's adapter and open its session.
    ///
    /// A family whose library is missing is remembered as unavailable and
    /// the error returned; the other families are unaffected.
    pub fn attach(
        &mut self,
        family: DggsFamily,
        ctx: &AdapterContext,
        draw: Box<dyn DrawHandle>,
    ) -> Result<(), VgridError> {
        match build_adapter(family, ctx) {
            Ok(adapter) => {
                self.attach_adapter(adapter, draw);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(family = %family, error = %e, "Render: family unavailable");
                self.unavailable.insert(family, e.to_string());
                Err(e)
            }
        }
    }

    /// Open a session over an already built adapter.
    pub fn attach_adapter(&mut self, adapter: Box<dyn DggsAdapter>, draw: Box<dyn DrawHandle>) {
        let family = adapter.family();
        let mut session = RenderSession::new(adapter, draw);
        session.set_enabled(self.settings.family(family).enabled);
        self.unavailable.remove(&family);
        self.sessions.insert(family, session);
    }

    /// Attached families, in menu order.
    pub fn families(&self) -> impl Iterator<Item = DggsFamily> + '_ {
        self.sessions.keys().copied()
    }

    /// Families that failed to attach, with the reason.
    pub fn unavailable(&self) -> &BTreeMap<DggsFamily, String> {
        &self.unavailable
    }

    pub fn session(&self, family: DggsFamily) -> Option<&RenderSession> {
        self.sessions.get(&family)
    }

    pub fn is_enabled(&self, family: DggsFamily) -> bool {
        self.sessions.get(&family).is_some_and(|s| s.is_enabled())
    }

    /// Toggle a family. Disabling clears its overlay at once; enabling
    /// waits for the next extent change.
    pub fn set_enabled(&mut self, family: DggsFamily, enabled: bool) -> Result<(), VgridError> {
        let session = self.sessions.get_mut(&family).ok_or_else(|| VgridError::AdapterUnavailable {
            family,
            reason: self
                .unavailable
                .get(&family)
                .cloned()
                .unwrap_or_else(|| "not attached".to_string()),
        })?;
        if session.set_enabled(enabled) {
            self.canvas.refresh();
        }
        Ok(())
    }

    /// Replace the settings snapshot used by later renders.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token checked between cells of every pass.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Re-arm the debounce slot of every enabled family.
    pub fn on_extent_changed(&mut self, now: Instant) {
        for session in self.sessions.values_mut().filter(|s| s.is_enabled()) {
            session.debounce_mut().restart(now);
        }
    }

    /// Earliest pending deadline, for hosts that sleep between polls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions.values().filter_map(|s| s.debounce().deadline()).min()
    }

    /// Render every family whose slot fired.
    ///
    /// The viewport is read once, at fire time. Failed renders become
    /// status-bar warnings and are left out of the result.
    pub fn poll(&mut self, now: Instant, source: &dyn ViewportSource) -> Vec<RenderReport> {
        let due: Vec<DggsFamily> = self
            .sessions
            .iter_mut()
            .filter_map(|(family, session)| session.debounce_mut().poll(now).then_some(*family))
            .collect();
        if due.is_empty() {
            return Vec::new();
        }

        let viewport = source.current();
        let mut reports = Vec::with_capacity(due.len());
        for family in due {
            match self.render_family(family, &viewport) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!(family = %family, error = %e, "Render: pass failed");
                    self.status
                        .push_warning(&format!("{}: {}", family, e), self.settings.status_warning_secs);
                }
            }
        }
        reports
    }

    /// Render one family now, bypassing the debounce slot.
    ///
    /// Disabled families render nothing and return an empty report.
    pub fn render_family(&mut self, family: DggsFamily, viewport: &Viewport) -> Result<RenderReport, VgridError> {
        let settings = self.settings.family(family);
        let max_cells = self.settings.max_cells;
        let session = self.sessions.get_mut(&family).ok_or_else(|| VgridError::AdapterUnavailable {
            family,
            reason: "not attached".to_string(),
        })?;
        if !session.is_enabled() {
            return Ok(RenderReport {
                family: Some(family),
                ..RenderReport::default()
            });
        }
        let result = session.render_once(viewport, &settings, self.projector.as_ref(), max_cells, &self.cancel);
        self.canvas.refresh();
        result
    }

    /// Release every session and clear the canvas.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for ViewportRenderer {
    fn drop(&mut self) {
        let count = self.sessions.len();
        self.sessions.clear();
        self.canvas.refresh();
        tracing::info!(sessions = count, "Render: teardown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::dggal::DggalRuntime;
    use crate::geometry::GeoRect;
    use crate::projection::BuiltinProjector;
    use crate::render::host::{CountingCanvas, RecordingDrawHandle, RecordingStatusBar};
    use crate::resolution::scale_for_zoom;
    use std::time::Duration;

    fn renderer(settings: Settings) -> (ViewportRenderer, CountingCanvas, RecordingStatusBar) {
        let canvas = CountingCanvas::new();
        let status = RecordingStatusBar::new();
        let renderer = ViewportRenderer::new(
            Arc::new(BuiltinProjector::new()),
            settings,
            Box::new(canvas.clone()),
            Box::new(status.clone()),
        );
        (renderer, canvas, status)
    }

    fn viewport() -> Viewport {
        Viewport::wgs84(GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap(), scale_for_zoom(7.0))
    }

    #[test]
    fn test_only_enabled_families_render() {
        let settings = Settings::default().with_enabled(DggsFamily::Geohash, true);
        let (mut renderer, _canvas, _status) = renderer(settings);
        let ctx = AdapterContext::default();
        let geohash = RecordingDrawHandle::new();
        let h3 = RecordingDrawHandle::new();
        renderer.attach(DggsFamily::Geohash, &ctx, Box::new(geohash.clone())).unwrap();
        renderer.attach(DggsFamily::H3, &ctx, Box::new(h3.clone())).unwrap();

        let start = Instant::now();
        renderer.on_extent_changed(start);
        let reports = renderer.poll(start + Duration::from_millis(200), &viewport());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].family, Some(DggsFamily::Geohash));
        assert!(!geohash.is_empty());
        assert!(h3.is_empty());
    }

    #[test]
    fn test_unavailable_family_is_recorded() {
        let (mut renderer, _canvas, _status) = renderer(Settings::default());
        let ctx = AdapterContext::default().with_dggal(DggalRuntime::new(|| Err("library not found".to_string())));
        let result = renderer.attach(DggsFamily::Isea3h, &ctx, Box::new(RecordingDrawHandle::new()));
        assert!(matches!(result, Err(VgridError::AdapterUnavailable { .. })));
        assert!(renderer.unavailable().contains_key(&DggsFamily::Isea3h));
        assert!(renderer.set_enabled(DggsFamily::Isea3h, true).is_err());
    }

    #[test]
    fn test_enable_waits_for_extent_change() {
        let (mut renderer, canvas, _status) = renderer(Settings::default());
        let handle = RecordingDrawHandle::new();
        renderer
            .attach(DggsFamily::Geohash, &AdapterContext::default(), Box::new(handle.clone()))
            .unwrap();

        renderer.set_enabled(DggsFamily::Geohash, true).unwrap();
        assert!(renderer.next_deadline().is_none());
        assert!(handle.is_empty());
        assert_eq!(canvas.refreshes(), 0);

        let start = Instant::now();
        renderer.on_extent_changed(start);
        assert_eq!(renderer.next_deadline(), Some(start + Duration::from_millis(150)));
        assert_eq!(renderer.poll(start + Duration::from_millis(150), &viewport()).len(), 1);
        assert!(!handle.is_empty());

        renderer.set_enabled(DggsFamily::Geohash, false).unwrap();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_failed_render_warns_on_status_bar() {
        let settings = Settings::default().with_enabled(DggsFamily::Geohash, true);
        let (mut renderer, _canvas, status) = renderer(settings);
        renderer
            .attach(DggsFamily::Geohash, &AdapterContext::default(), Box::new(RecordingDrawHandle::new()))
            .unwrap();

        let broken = Viewport::wgs84(GeoRect::new(0.0, 0.0, 1.0, 1.0).unwrap(), -1.0);
        let start = Instant::now();
        renderer.on_extent_changed(start);
        assert!(renderer.poll(start + Duration::from_millis(150), &broken).is_empty());
        let messages = status.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Geohash"));
    }

    #[test]
    fn test_teardown_clears_overlays() {
        let settings = Settings::default().with_enabled(DggsFamily::Geohash, true);
        let (mut renderer, canvas, _status) = renderer(settings);
        let handle = RecordingDrawHandle::new();
        renderer
            .attach(DggsFamily::Geohash, &AdapterContext::default(), Box::new(handle.clone()))
            .unwrap();
        renderer.render_family(DggsFamily::Geohash, &viewport()).unwrap();
        assert!(!handle.is_empty());

        let before = canvas.refreshes();
        renderer.teardown();
        assert!(handle.is_empty());
        assert_eq!(canvas.refreshes(), before + 1);
    }
}

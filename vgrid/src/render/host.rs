//! Capabilities the renderer needs from its host.
//!
//! A GIS host implements these over its map canvas; the CLI and the tests
//! use the recording implementations at the bottom of this module.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use geo::Polygon;

use super::Viewport;
use crate::config::Color;

/// Where the current viewport comes from.
pub trait ViewportSource {
    fn current(&self) -> Viewport;
}

impl<F: Fn() -> Viewport> ViewportSource for F {
    fn current(&self) -> Viewport {
        self()
    }
}

impl ViewportSource for Viewport {
    fn current(&self) -> Viewport {
        *self
    }
}

/// The map canvas.
pub trait Canvas {
    /// Repaint after geometry changed.
    fn refresh(&self);
}

/// An ephemeral overlay owned by one family's render session.
pub trait DrawHandle: Send {
    /// Remove all geometry.
    fn reset(&mut self);

    /// Append one polygon, in the canvas CRS.
    fn add_geometry(&mut self, polygon: &Polygon<f64>);

    fn set_stroke(&mut self, color: Color);

    fn set_width(&mut self, px: f64);
}

/// Non-blocking user notifications.
pub trait StatusBar {
    fn push_warning(&self, message: &str, duration_secs: u64);
}

/// Status bar that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusBar;

impl StatusBar for LogStatusBar {
    fn push_warning(&self, message: &str, duration_secs: u64) {
        tracing::warn!(duration_secs, "Status: {}", message);
    }
}

/// Canvas that counts refreshes.
#[derive(Debug, Default, Clone)]
pub struct CountingCanvas {
    refreshes: Arc<AtomicUsize>,
}

impl CountingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Canvas for CountingCanvas {
    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything drawn through a [`RecordingDrawHandle`].
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    pub geometries: Vec<Polygon<f64>>,
    pub stroke: Option<Color>,
    pub width: Option<f64>,
    pub resets: usize,
}

/// Draw handle that records geometry for later inspection.
///
/// Clones share the same log, so a host can keep one clone while the
/// render session owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingDrawHandle {
    log: Arc<Mutex<DrawLog>>,
}

impl RecordingDrawHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DrawLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> DrawLog {
        self.lock().clone()
    }

    /// Number of polygons currently drawn.
    pub fn len(&self) -> usize {
        self.lock().geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DrawHandle for RecordingDrawHandle {
    fn reset(&mut self) {
        let mut log = self.lock();
        log.geometries.clear();
        log.resets += 1;
    }

    fn add_geometry(&mut self, polygon: &Polygon<f64>) {
        self.lock().geometries.push(polygon.clone());
    }

    fn set_stroke(&mut self, color: Color) {
        self.lock().stroke = Some(color);
    }

    fn set_width(&mut self, px: f64) {
        self.lock().width = Some(px);
    }
}

/// Status bar that keeps every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatusBar {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingStatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl StatusBar for RecordingStatusBar {
    fn push_warning(&self, message: &str, duration_secs: u64) {
        tracing::debug!(duration_secs, "Status: {}", message);
        let mut messages = self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::bbox_polygon;

    #[test]
    fn test_recording_handle_shares_log() {
        let host_side = RecordingDrawHandle::new();
        let mut session_side = host_side.clone();
        session_side.set_stroke(Color::rgb(1, 2, 3));
        session_side.add_geometry(&bbox_polygon(0.0, 0.0, 1.0, 1.0));
        assert_eq!(host_side.len(), 1);

        session_side.reset();
        let log = host_side.snapshot();
        assert!(log.geometries.is_empty());
        assert_eq!(log.resets, 1);
        assert_eq!(log.stroke, Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn test_counting_canvas() {
        let canvas = CountingCanvas::new();
        let shared = canvas.clone();
        canvas.refresh();
        canvas.refresh();
        assert_eq!(shared.refreshes(), 2);
    }
}

//! Batch grid generator.
//!
//! The non-interactive entry point: one family, one explicit resolution,
//! an optional WGS84 extent. Cells come from the same enumeration kernels
//! the viewport renderer uses; each one is then run through the
//! antimeridian policy, measured, and handed to a [`FeatureSink`].
//!
//! # Pipeline
//!
//! | Stage      | Work                                             |
//! |------------|--------------------------------------------------|
//! | Validate   | resolution range, extent requirement             |
//! | Enumerate  | kernel pass with the cancellation token          |
//! | Measure    | antimeridian policy + metrics, in parallel       |
//! | Write      | features to the sink in enumeration order        |
//!
//! Unlike the renderer, the batch path does not clamp: a resolution outside
//! the family range fails with [`VgridError::UnsupportedResolution`], and a
//! resolution above the family's `batch_world_max` without an extent fails
//! with [`VgridError::ExtentRequired`].

pub mod metrics;
pub mod sink;

pub use metrics::{measure, CellMetrics};
pub use sink::{polygons_to_geojson, Feature, FeatureSink, GeoJsonSink, MemorySink};

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dggs::{build_adapter, AdapterContext, Cell, DggsAdapter};
use crate::enumerate::{enumerate, CancellationToken, EnumerationContext};
use crate::error::VgridError;
use crate::family::DggsFamily;
use crate::geometry::antimeridian::AntimeridianPolicy;
use crate::geometry::GeoRect;

/// Default cell budget of a batch run.
pub const DEFAULT_BATCH_MAX_CELLS: usize = 1_000_000;

/// Batch stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    /// Running the enumeration kernel.
    Enumerating,
    /// Applying the antimeridian policy and computing metrics.
    Measuring,
    /// Handing features to the sink.
    Writing,
}

/// Progress callback for batch runs.
///
/// # Arguments
///
/// * `stage` - Current stage
/// * `done` - Items finished within the stage
/// * `total` - Items in the stage (0 while enumerating)
pub type BatchProgressCallback = Box<dyn Fn(BatchStage, usize, usize) + Send + Sync>;

/// What to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub family: DggsFamily,
    pub resolution: u8,
    /// `None` means the whole world.
    pub extent: Option<GeoRect>,
    /// `None` uses the family's default policy.
    pub antimeridian: Option<AntimeridianPolicy>,
    pub max_cells: usize,
    /// Attach [`CellMetrics`] to every feature.
    pub with_metrics: bool,
}

impl BatchRequest {
    /// Whole-world request with the family's defaults.
    pub fn new(family: DggsFamily, resolution: u8) -> Self {
        Self {
            family,
            resolution,
            extent: None,
            antimeridian: None,
            max_cells: DEFAULT_BATCH_MAX_CELLS,
            with_metrics: true,
        }
    }

    /// Restrict generation to an extent.
    pub fn with_extent(mut self, extent: GeoRect) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Override the antimeridian policy.
    pub fn with_antimeridian(mut self, policy: AntimeridianPolicy) -> Self {
        self.antimeridian = Some(policy);
        self
    }

    /// Set the cell budget.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells.max(1);
        self
    }

    /// Enable or disable per-cell metrics.
    pub fn with_metrics(mut self, with_metrics: bool) -> Self {
        self.with_metrics = with_metrics;
        self
    }

    /// Policy actually applied to each cell.
    pub fn antimeridian_policy(&self) -> AntimeridianPolicy {
        self.antimeridian
            .unwrap_or_else(|| self.family.descriptor().antimeridian)
    }

    /// Check the resolution range and the extent requirement.
    ///
    /// # Errors
    ///
    /// * [`VgridError::UnsupportedResolution`] outside `[min_res, max_res]`
    /// * [`VgridError::ExtentRequired`] above `batch_world_max` with no extent
    pub fn validate(&self) -> Result<GeoRect, VgridError> {
        let d = self.family.descriptor();
        if !d.supports(self.resolution) {
            return Err(VgridError::UnsupportedResolution {
                family: self.family,
                resolution: self.resolution,
                min: d.min_res,
                max: d.max_res,
            });
        }
        match self.extent {
            Some(extent) => Ok(extent.clamp_to_world()),
            None if self.resolution <= d.batch_world_max => Ok(GeoRect::world()),
            None => Err(VgridError::ExtentRequired {
                family: self.family,
                resolution: self.resolution,
                max_world: d.batch_world_max,
            }),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Features handed to the sink.
    pub features: usize,
    /// Cells dropped because their id or polygon failed.
    pub skipped: usize,
    /// The cell budget stopped enumeration early.
    pub truncated: bool,
    pub elapsed: Duration,
}

/// Runs batch requests against adapters built from one context.
pub struct BatchGenerator {
    adapters: AdapterContext,
    cancel: CancellationToken,
    on_progress: Option<BatchProgressCallback>,
}

impl BatchGenerator {
    /// Generator with a fresh cancellation token.
    pub fn new(adapters: AdapterContext) -> Self {
        Self {
            adapters,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Share an existing cancellation token (e.g. one flipped by Ctrl+C).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress through a callback.
    pub fn with_progress(mut self, on_progress: BatchProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Token checked between cells; cancelling it aborts the run.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Build the family's adapter and run the request.
    ///
    /// # Errors
    ///
    /// Validation errors, [`VgridError::AdapterUnavailable`], a failing
    /// kernel, [`VgridError::Cancelled`], or a sink error. The sink is only
    /// finished on success.
    pub fn generate<S: FeatureSink + ?Sized>(
        &self,
        request: &BatchRequest,
        sink: &mut S,
    ) -> Result<BatchSummary, VgridError> {
        request.validate()?;
        let adapter = build_adapter(request.family, &self.adapters)?;
        self.generate_with(adapter.as_ref(), request, sink)
    }

    /// Run the request against an already-built adapter.
    pub fn generate_with<A: DggsAdapter + ?Sized, S: FeatureSink + ?Sized>(
        &self,
        adapter: &A,
        request: &BatchRequest,
        sink: &mut S,
    ) -> Result<BatchSummary, VgridError> {
        let started = Instant::now();
        let extent = request.validate()?;
        let policy = request.antimeridian_policy();

        info!(
            family = %request.family,
            resolution = request.resolution,
            extent = %extent,
            antimeridian = %policy,
            "Batch: starting"
        );

        self.report(BatchStage::Enumerating, 0, 0);
        let ctx = EnumerationContext::new(request.resolution, extent)
            .with_max_cells(request.max_cells)
            .with_cancel(self.cancel.clone());
        let enumeration = enumerate(adapter, &ctx)?;
        if enumeration.cancelled || self.cancel.is_cancelled() {
            warn!(family = %request.family, "Batch: cancelled during enumeration");
            return Err(VgridError::Cancelled);
        }
        if enumeration.truncated {
            warn!(
                family = %request.family,
                max_cells = request.max_cells,
                "Batch: cell budget reached, output truncated"
            );
        }

        let total = enumeration.cells.len();
        self.report(BatchStage::Measuring, 0, total);
        let family = request.family;
        let resolution = request.resolution;
        let metric_kind = family.descriptor().metrics;
        let with_metrics = request.with_metrics;
        let cancel = &self.cancel;

        // Order is preserved by the indexed parallel iterator
        let features: Vec<Option<Feature>> = enumeration
            .cells
            .into_par_iter()
            .map(|Cell { id, polygon }| {
                if cancel.is_cancelled() {
                    return None;
                }
                let metrics = if with_metrics {
                    measure(&polygon, metric_kind)
                } else {
                    None
                };
                Some(Feature {
                    id,
                    family,
                    resolution,
                    geometry: policy.apply(polygon),
                    metrics,
                })
            })
            .collect();

        let mut written = 0;
        for feature in features.into_iter().flatten() {
            if self.cancel.is_cancelled() {
                break;
            }
            sink.add(&feature)?;
            written += 1;
            if written % 1024 == 0 {
                self.report(BatchStage::Writing, written, total);
            }
        }
        if self.cancel.is_cancelled() {
            warn!(family = %family, written, "Batch: cancelled while writing");
            return Err(VgridError::Cancelled);
        }
        sink.finish()?;
        self.report(BatchStage::Writing, written, total);

        let summary = BatchSummary {
            features: written,
            skipped: enumeration.skipped,
            truncated: enumeration.truncated,
            elapsed: started.elapsed(),
        };
        debug!(
            features = summary.features,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch: complete"
        );
        Ok(summary)
    }

    fn report(&self, stage: BatchStage, done: usize, total: usize) {
        if let Some(callback) = &self.on_progress {
            callback(stage, done, total);
        }
    }
}

impl std::fmt::Debug for BatchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGenerator")
            .field("adapters", &self.adapters)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_progress", &self.on_progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::dggal::DggalRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::geometry::{is_polar_cap, lon_span};

    fn generator() -> BatchGenerator {
        BatchGenerator::new(AdapterContext::default())
    }

    #[test]
    fn test_extent_required_above_world_threshold() {
        let request = BatchRequest::new(DggsFamily::Geohash, 6);
        let err = generator().generate(&request, &mut MemorySink::new()).unwrap_err();
        assert!(matches!(
            err,
            VgridError::ExtentRequired {
                family: DggsFamily::Geohash,
                resolution: 6,
                max_world: 4
            }
        ));
    }

    #[test]
    fn test_unsupported_resolution_is_not_clamped() {
        let request = BatchRequest::new(DggsFamily::Gars, 7);
        let err = generator().generate(&request, &mut MemorySink::new()).unwrap_err();
        assert!(matches!(
            err,
            VgridError::UnsupportedResolution { min: 1, max: 4, .. }
        ));
    }

    #[test]
    fn test_geohash_world_level_one() {
        let mut sink = MemorySink::new();
        let summary = generator()
            .generate(&BatchRequest::new(DggsFamily::Geohash, 1), &mut sink)
            .unwrap();
        assert_eq!(summary.features, 32);
        assert!(sink.finished);
        let ids = sink.ids();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(sink
            .features
            .iter()
            .all(|f| f.metrics.map_or(false, |m| m.cell_width_m.is_some())));
    }

    #[test]
    fn test_extent_limits_output() {
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let request = BatchRequest::new(DggsFamily::Geohash, 3).with_extent(extent);
        let mut sink = MemorySink::new();
        generator().generate(&request, &mut sink).unwrap();
        assert!(!sink.features.is_empty());
        assert!(sink.features.iter().all(|f| f.id.as_str().starts_with('w') && f.id.len() == 3));
    }

    #[test]
    fn test_h3_world_split_keeps_rings_narrow() {
        let request = BatchRequest::new(DggsFamily::H3, 0)
            .with_antimeridian(AntimeridianPolicy::Split)
            .with_metrics(false);
        let mut sink = MemorySink::new();
        let summary = generator().generate(&request, &mut sink).unwrap();
        assert_eq!(summary.features, 122);
        for feature in &sink.features {
            assert!(feature.metrics.is_none());
            for part in feature.geometry.iter().filter(|p| !is_polar_cap(p)) {
                assert!(lon_span(part) < 180.0, "{} spans the globe", feature.id);
            }
        }
    }

    #[test]
    fn test_budget_truncates() {
        let request = BatchRequest::new(DggsFamily::Geohash, 2).with_max_cells(10);
        let mut sink = MemorySink::new();
        let summary = generator().generate(&request, &mut sink).unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.features, 10);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = BatchRequest::new(DggsFamily::Geohash, 2);
        let mut sink = MemorySink::new();
        let err = generator()
            .with_cancel(cancel)
            .generate(&request, &mut sink)
            .unwrap_err();
        assert!(matches!(err, VgridError::Cancelled));
        assert!(!sink.finished);
    }

    #[test]
    fn test_unavailable_family() {
        let ctx = AdapterContext::default().with_dggal(DggalRuntime::new(|| Err("library not found".to_string())));
        let request = BatchRequest::new(DggsFamily::Rtea4r, 0);
        let err = BatchGenerator::new(ctx).generate(&request, &mut MemorySink::new()).unwrap_err();
        assert!(matches!(err, VgridError::AdapterUnavailable { .. }));
    }

    #[test]
    fn test_progress_reaches_total() {
        let last = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&last);
        let generator = generator().with_progress(Box::new(move |stage, done, total| {
            if stage == BatchStage::Writing {
                assert_eq!(done, total);
                seen.store(done, Ordering::SeqCst);
            }
        }));
        generator
            .generate(&BatchRequest::new(DggsFamily::Maidenhead, 1), &mut MemorySink::new())
            .unwrap();
        // 18 × 18 fields
        assert_eq!(last.load(Ordering::SeqCst), 324);
    }

    #[test]
    fn test_mgrs_gzd_batch() {
        let extent = GeoRect::new(0.5, 45.0, 7.5, 52.0).unwrap();
        let request = BatchRequest::new(DggsFamily::Mgrs, 0).with_extent(extent);
        let mut sink = MemorySink::new();
        generator().generate(&request, &mut sink).unwrap();
        assert_eq!(sink.ids(), vec!["31T", "32T", "31U", "32U"]);
    }
}

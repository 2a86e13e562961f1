//! Adapter construction.
//!
//! ```ignore
//! use vgrid::dggs::{build_adapter, AdapterContext};
//! use vgrid::family::DggsFamily;
//!
//! let ctx = AdapterContext::default();
//! let adapter = build_adapter(DggsFamily::H3, &ctx)?;
//! ```
//!
//! Families whose library is missing fail here with `AdapterUnavailable`
//! so callers can disable them up front instead of failing per cell.

use std::fmt;
use std::sync::Arc;

use super::a5::{A5Adapter, A5Index, PointIndexBackend};
use super::dggal::{DggalAdapter, DggalGrid, DggalRuntime};
use super::digipin::DigipinAdapter;
use super::ease::EaseAdapter;
use super::gars::GarsAdapter;
use super::geohash::GeohashAdapter;
use super::h3::H3Adapter;
use super::maidenhead::MaidenheadAdapter;
use super::mgrs::MgrsAdapter;
use super::olc::OlcAdapter;
use super::qtm::QtmAdapter;
use super::rhealpix::RhealpixAdapter;
use super::s2::S2Adapter;
use super::tilecode::TilecodeAdapter;
use super::DggsAdapter;
use crate::error::VgridError;
use crate::family::DggsFamily;

/// Shared library handles adapters are built from.
#[derive(Clone)]
pub struct AdapterContext {
    /// Zone library shared by the DGGAL families.
    pub dggal: Arc<DggalRuntime>,
    /// A5 point index.
    pub a5: Arc<dyn PointIndexBackend>,
}

impl AdapterContext {
    /// Replace the DGGAL runtime.
    pub fn with_dggal(mut self, runtime: DggalRuntime) -> Self {
        self.dggal = Arc::new(runtime);
        self
    }

    /// Replace the A5 point index.
    pub fn with_a5(mut self, backend: Arc<dyn PointIndexBackend>) -> Self {
        self.a5 = backend;
        self
    }
}

impl Default for AdapterContext {
    fn default() -> Self {
        Self {
            dggal: Arc::new(DggalRuntime::platform()),
            a5: Arc::new(A5Index),
        }
    }
}

impl fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterContext")
            .field("dggal", &self.dggal)
            .finish_non_exhaustive()
    }
}

/// Build the adapter for a family.
///
/// # Errors
///
/// `AdapterUnavailable` when the family's library is not installed.
pub fn build_adapter(family: DggsFamily, ctx: &AdapterContext) -> Result<Box<dyn DggsAdapter>, VgridError> {
    let adapter: Box<dyn DggsAdapter> = match family {
        DggsFamily::H3 => Box::new(H3Adapter::new()),
        DggsFamily::S2 => Box::new(S2Adapter::new()),
        DggsFamily::A5 => Box::new(A5Adapter::new(ctx.a5.clone())),
        DggsFamily::Rhealpix => Box::new(RhealpixAdapter::new()),
        DggsFamily::Isea3h | DggsFamily::Rtea4r | DggsFamily::DggalRhealpix => {
            let grid = DggalGrid::for_family(family).ok_or_else(|| VgridError::AdapterUnavailable {
                family,
                reason: "not a DGGAL grid".to_string(),
            })?;
            let adapter = DggalAdapter::new(grid, ctx.dggal.clone());
            adapter.probe()?;
            Box::new(adapter)
        }
        DggsFamily::Geohash => Box::new(GeohashAdapter::new()),
        DggsFamily::Olc => Box::new(OlcAdapter::new()),
        DggsFamily::Qtm => Box::new(QtmAdapter::new()),
        DggsFamily::Gars => Box::new(GarsAdapter::new()),
        DggsFamily::Maidenhead => Box::new(MaidenheadAdapter::new()),
        DggsFamily::Tilecode => Box::new(TilecodeAdapter::new()),
        DggsFamily::Digipin => Box::new(DigipinAdapter::new()),
        DggsFamily::Ease => Box::new(EaseAdapter::new()),
        DggsFamily::Mgrs => Box::new(MgrsAdapter::new()),
    };
    tracing::debug!(family = %family, "Registry: adapter ready");
    Ok(adapter)
}

/// Families that can be built with `ctx`, in menu order.
pub fn available_families(ctx: &AdapterContext) -> Vec<DggsFamily> {
    DggsFamily::ALL
        .into_iter()
        .filter(|family| match build_adapter(*family, ctx) {
            Ok(_) => true,
            Err(e) => {
                tracing::info!(family = %family, error = %e, "Registry: family disabled");
                false
            }
        })
        .collect()
}

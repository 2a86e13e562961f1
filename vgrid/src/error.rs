//! Top-level error taxonomy.
//!
//! Every fallible operation in the crate eventually surfaces as a
//! [`VgridError`]. Subsystem errors convert into it with `?`:
//!
//! - [`ProjectionError`] from the projector (per-vertex transform failures)
//! - [`DggsError`] from the DGGS adapters (invalid ids, missing backends)
//! - [`ConfigError`] from settings persistence
//!
//! # Propagation
//!
//! Per-cell failures are swallowed by the enumeration loop and only logged.
//! Per-render failures reach the host's status bar. Initialization failures
//! (`AdapterUnavailable`) disable the affected family.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dggs::DggsError;
use crate::family::DggsFamily;
use crate::projection::ProjectionError;

/// Errors surfaced by the renderer, the batch generator and their setup.
#[derive(Debug, Error)]
pub enum VgridError {
    /// A coordinate outside WGS84 bounds that cannot be clamped meaningfully.
    #[error("Invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },

    /// The viewport itself is unusable (non-positive scale, empty extent).
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),

    /// Requested resolution is outside the family's range (batch path only).
    #[error("Resolution {resolution} unsupported for {family} (valid {min}..={max})")]
    UnsupportedResolution {
        family: DggsFamily,
        resolution: u8,
        min: u8,
        max: u8,
    },

    /// A high resolution was requested without bounding the extent.
    #[error("{family} at resolution {resolution} requires an extent (world allowed up to {max_world})")]
    ExtentRequired {
        family: DggsFamily,
        resolution: u8,
        max_world: u8,
    },

    /// Coordinate transform failed.
    #[error("Projection failed: {0}")]
    ProjectionFailed(#[from] ProjectionError),

    /// A DGGS library could not be initialized.
    #[error("{family} unavailable: {reason}")]
    AdapterUnavailable { family: DggsFamily, reason: String },

    /// A cell-level operation failed.
    #[error("Cell error: {0}")]
    Cell(DggsError),

    /// The operation was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// Settings could not be read, parsed or written.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O failure while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DggsError> for VgridError {
    fn from(err: DggsError) -> Self {
        match err {
            DggsError::Unavailable { family, reason } => {
                VgridError::AdapterUnavailable { family, reason }
            }
            other => VgridError::Cell(other),
        }
    }
}

impl VgridError {
    /// Whether the failure concerns a single cell and should be skipped
    /// rather than aborting the pass.
    pub fn is_per_cell(&self) -> bool {
        matches!(self, VgridError::Cell(_) | VgridError::ProjectionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_dggs_error_maps_to_adapter_unavailable() {
        let err: VgridError = DggsError::Unavailable {
            family: DggsFamily::Isea3h,
            reason: "no dggal backend".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            VgridError::AdapterUnavailable {
                family: DggsFamily::Isea3h,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_cell_is_per_cell() {
        let err: VgridError = DggsError::InvalidCell("zz".to_string()).into();
        assert!(err.is_per_cell());
        assert!(!VgridError::Cancelled.is_per_cell());
    }

    #[test]
    fn test_extent_required_display() {
        let err = VgridError::ExtentRequired {
            family: DggsFamily::H3,
            resolution: 9,
            max_world: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("H3"));
        assert!(msg.contains("resolution 9"));
    }
}

//! vgrid - Viewport-driven DGGS grid rendering
//!
//! This library draws the cells of a discrete global grid system (H3, S2,
//! rHEALPix, Geohash, MGRS and others) that intersect a map viewport, at a
//! resolution picked from the map scale. It is meant to be embedded in a
//! GIS host: the host supplies the viewport, a canvas and a draw handle,
//! the library supplies the cells.
//!
//! # Flow
//!
//! ```text
//! extent changed ─► debounce (150 ms) ─► prepare viewport ─► enumerate ─► antimeridian ─► project ─► draw
//!                                          │                    │
//!                                   scale → resolution    adapter strategy
//! ```
//!
//! The same enumeration kernels back the [`batch`] generator, which writes
//! full-resolution cells with metrics to a feature sink.
//!
//! # Modules
//!
//! | Module         | Purpose                                         |
//! |----------------|-------------------------------------------------|
//! | [`geometry`]   | WGS84 rectangles, rings, antimeridian policy    |
//! | [`projection`] | CRS ids and the builtin projector               |
//! | [`family`]     | Supported families and their descriptors        |
//! | [`resolution`] | Scale → resolution policy                       |
//! | [`dggs`]       | One adapter per family, plus the registry       |
//! | [`enumerate`]  | Enumeration kernels, budget, cancellation       |
//! | [`render`]     | Viewport renderer, sessions, debounce           |
//! | [`batch`]      | Batch generator, metrics, GeoJSON sink          |
//! | [`config`]     | Persisted settings                              |
//! | [`logging`]    | Tracing subscriber bootstrap                    |

pub mod batch;
pub mod config;
pub mod coord;
pub mod dggs;
pub mod enumerate;
pub mod error;
pub mod family;
pub mod geometry;
pub mod logging;
pub mod projection;
pub mod render;
pub mod resolution;

pub use error::VgridError;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

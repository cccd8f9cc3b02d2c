//! # Terrastat Fast Engine
//!
//! The narrow, high-throughput engine: file-path inputs only, an integer
//! layer index, and the fixed stat vocabulary (plus `percentile_N`).
//! Reads per-zone windows instead of whole rasters, so large inputs
//! stream through in bounded memory.
//!
//! The dispatch layer in the `terrastat` crate decides when a request is
//! eligible for this engine and falls back to `terrastat-reference`
//! otherwise; callers normally do not use this crate directly.

mod raster;
mod point;
mod zonal;

pub use point::point_query_path;
pub use raster::RasterContext;
pub use zonal::zonal_stats_path;

/// Engine liveness probe used by the dispatch layer's one-time
/// availability check.
pub fn healthcheck() -> bool {
    true
}

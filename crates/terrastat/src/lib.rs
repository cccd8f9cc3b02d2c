//! # Terrastat
//!
//! Zonal statistics and raster point sampling over two interchangeable
//! engines: a narrow, high-throughput fast engine and a feature-complete
//! reference engine. This crate is the dispatch layer that decides
//! eligibility for the fast path, normalizes inputs into the canonical
//! form the fast engine requires, and falls back transparently to the
//! reference engine whenever a precondition is unmet or the fast engine
//! fails. Callers observe one uniform output contract regardless of
//! which engine ran.
//!
//! ```no_run
//! use terrastat::{zonal_stats, RasterSource, VectorSource, ZonalParams};
//!
//! let records = zonal_stats(
//!     &VectorSource::path("zones.geojson"),
//!     &RasterSource::path("elevation.tif"),
//!     &ZonalParams::default(),
//! )?;
//! for record in &records {
//!     println!("mean = {:?}", record.get_f64("mean"));
//! }
//! # Ok::<(), terrastat::Error>(())
//! ```
//!
//! Setting the `TERRASTAT_DISABLE_FAST` environment variable to a
//! truthy value ("1", "true", "yes", "on") routes every call to the
//! reference engine; it is read fresh on each call.

mod correct;
mod dispatch;
mod eligibility;
mod normalize;
mod sanitize;

pub use eligibility::DISABLE_FAST_ENV;
pub use terrastat_core::error::{Error, Result};
pub use terrastat_core::request::{
    Interpolation, LayerSelect, PointParams, PointRecord, PointSample, RasterSource, VectorSource,
    ZonalParams,
};
pub use terrastat_core::stats::{StatRecord, StatValue};
pub use terrastat_core::vector::{Feature, Properties};
pub use terrastat_core::{raster, stats};

use dispatch::NativeEngine;
use terrastat_core::stats::check_stats;

/// Compute zonal statistics for every zone of the vector source, one
/// record per zone in input order (an empty zone set yields an empty
/// result). Stat names are validated up front, so an unknown name is an
/// invalid-input error no matter which engine would have run.
pub fn zonal_stats(
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
) -> Result<Vec<StatRecord>> {
    let stats = check_stats(params.stats.as_deref(), params.categorical)?;
    dispatch::zonal_with_engine(&NativeEngine, vectors, raster, params, &stats)
}

/// Sample the raster at every coordinate of every zone geometry. One
/// record per zone in input order; a zone contributing a single
/// coordinate yields a bare scalar sample, one contributing several
/// yields an ordered sequence.
pub fn point_query(
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &PointParams,
) -> Result<Vec<PointRecord>> {
    dispatch::point_with_engine(&NativeEngine, vectors, raster, params)
}

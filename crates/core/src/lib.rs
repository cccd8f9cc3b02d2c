//! # Terrastat Core
//!
//! Shared types and primitives for the terrastat engines and dispatch layer.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid type backed by `ndarray`
//! - `GeoTransform`: affine pixel/world mapping
//! - `Feature`: vector geometry plus properties
//! - The zonal stat vocabulary and aggregation kernel
//! - Native GeoTIFF and GeoJSON I/O (no GDAL dependency)

pub mod error;
pub mod io;
pub mod raster;
pub mod rasterize;
pub mod request;
pub mod stats;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use request::{
    Interpolation, LayerSelect, PointParams, PointRecord, PointSample, RasterSource,
    VectorSource, ZonalParams,
};
pub use stats::{MiniRaster, StatRecord, StatValue};
pub use vector::{Feature, Properties};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::request::{
        Interpolation, LayerSelect, PointParams, PointRecord, PointSample, RasterSource,
        VectorSource, ZonalParams,
    };
    pub use crate::stats::{StatRecord, StatValue};
    pub use crate::vector::Feature;
}

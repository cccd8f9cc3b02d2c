//! # Terrastat Reference Engine
//!
//! The feature-complete engine and behavioral ground truth. Accepts file
//! paths or in-memory sources and the whole request surface: categorical
//! counting, category maps, custom aggregation closures, zone transforms,
//! per-zone mini-raster output, GeoJSON echo, key prefixing, boundless or
//! clipped windowing.
//!
//! The dispatch layer calls the unprefixed zonal entry point and applies
//! prefixing itself at the boundary; the prefixed wrapper exists for
//! direct use. Note the dispatch layer also applies a nodata/non-overlap
//! correction this engine deliberately does not.

mod point;
mod raster;
mod zonal;

pub use point::point_query;
pub use zonal::{zonal_stats, zonal_stats_unprefixed};

//! Native I/O for the formats terrastat reads and writes

pub mod geotiff;
pub mod vector;

pub use geotiff::{read_geotiff, write_geotiff};
pub use vector::{read_features, write_feature_collection};

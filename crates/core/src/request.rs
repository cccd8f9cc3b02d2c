//! Request surface shared by the engines and the dispatch layer

use crate::raster::Raster;
use crate::vector::{Feature, Properties};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where zone features come from. Order is significant and preserved
/// end-to-end.
#[derive(Debug, Clone)]
pub enum VectorSource {
    /// A vector file on disk (GeoJSON)
    Path(PathBuf),
    /// In-memory features
    Features(Vec<Feature>),
}

impl VectorSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        VectorSource::Path(path.into())
    }

    pub fn features(features: Vec<Feature>) -> Self {
        VectorSource::Features(features)
    }

    /// The file path, when this source is file-backed
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            VectorSource::Path(p) => Some(p),
            VectorSource::Features(_) => None,
        }
    }
}

/// Where raster values come from.
#[derive(Debug, Clone)]
pub enum RasterSource {
    /// A GeoTIFF on disk
    Path(PathBuf),
    /// An in-memory grid with its transform and declared nodata
    Array(Raster<f64>),
}

impl RasterSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        RasterSource::Path(path.into())
    }

    pub fn array(raster: Raster<f64>) -> Self {
        RasterSource::Array(raster)
    }

    /// The file path, when this source is file-backed
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            RasterSource::Path(p) => Some(p),
            RasterSource::Array(_) => None,
        }
    }
}

/// Layer selection for multi-layer vector sources. GeoJSON carries a
/// single layer, so only index 0 or a matching collection name resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSelect {
    Index(usize),
    Name(String),
}

impl Default for LayerSelect {
    fn default() -> Self {
        LayerSelect::Index(0)
    }
}

/// Point sampling interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Bilinear,
    Nearest,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Bilinear => write!(f, "bilinear"),
            Interpolation::Nearest => write!(f, "nearest"),
        }
    }
}

/// Custom per-zone aggregation over the zone's valid values
pub type ZoneAggregator = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Pre-aggregation transform applied to the zone's value buffer
pub type ZoneTransform = Arc<dyn Fn(&mut Vec<f64>) + Send + Sync>;

/// Parameters for a zonal statistics request.
///
/// Only the reference engine honors the full surface; the dispatch layer
/// routes anything beyond the fast engine's narrow shape to it.
#[derive(Clone)]
pub struct ZonalParams {
    /// Layer selector for multi-layer vector sources
    pub layer: LayerSelect,
    /// 1-based band index
    pub band: usize,
    /// Override for the raster's declared nodata value
    pub nodata: Option<f64>,
    /// Requested stat names; `None` means the default set
    pub stats: Option<Vec<String>>,
    /// Count every cell touched by the zone, not only covered centers
    pub all_touched: bool,
    /// Categorical counting instead of (or alongside) numeric stats
    pub categorical: bool,
    /// Relabeling for categorical keys, keyed by the stringified value
    pub category_map: Option<BTreeMap<String, String>>,
    /// Named custom aggregation callables
    pub add_stats: Vec<(String, ZoneAggregator)>,
    /// Value-buffer transform applied before aggregation
    pub zone_func: Option<ZoneTransform>,
    /// Attach the masked window to each record
    pub raster_out: bool,
    /// Prefix prepended to every output key at the boundary
    pub prefix: Option<String>,
    /// Echo the zone geometry/properties on each record
    pub geojson_out: bool,
    /// Permit zones beyond the raster extent, reading the declared
    /// nodata value outside it
    pub boundless: bool,
}

impl Default for ZonalParams {
    fn default() -> Self {
        Self {
            layer: LayerSelect::default(),
            band: 1,
            nodata: None,
            stats: None,
            all_touched: false,
            categorical: false,
            category_map: None,
            add_stats: Vec::new(),
            zone_func: None,
            raster_out: false,
            prefix: None,
            geojson_out: false,
            boundless: true,
        }
    }
}

impl fmt::Debug for ZonalParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZonalParams")
            .field("layer", &self.layer)
            .field("band", &self.band)
            .field("nodata", &self.nodata)
            .field("stats", &self.stats)
            .field("all_touched", &self.all_touched)
            .field("categorical", &self.categorical)
            .field("category_map", &self.category_map)
            .field("add_stats", &self.add_stats.len())
            .field("zone_func", &self.zone_func.is_some())
            .field("raster_out", &self.raster_out)
            .field("prefix", &self.prefix)
            .field("geojson_out", &self.geojson_out)
            .field("boundless", &self.boundless)
            .finish()
    }
}

/// Parameters for a point query request
#[derive(Clone)]
pub struct PointParams {
    /// 1-based band index
    pub band: usize,
    /// Layer selector for multi-layer vector sources
    pub layer: LayerSelect,
    /// Override for the raster's declared nodata value
    pub nodata: Option<f64>,
    /// Sampling mode
    pub interpolation: Interpolation,
    /// Property key used for GeoJSON-echo output
    pub property_name: String,
    /// Echo the zone geometry/properties per record
    pub geojson_out: bool,
    /// Permit coordinates beyond the raster extent, sampled as missing;
    /// when off, out-of-extent reads are errors
    pub boundless: bool,
}

impl Default for PointParams {
    fn default() -> Self {
        Self {
            band: 1,
            layer: LayerSelect::default(),
            nodata: None,
            interpolation: Interpolation::default(),
            property_name: "value".to_string(),
            geojson_out: false,
            boundless: true,
        }
    }
}

impl fmt::Debug for PointParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointParams")
            .field("band", &self.band)
            .field("layer", &self.layer)
            .field("nodata", &self.nodata)
            .field("interpolation", &self.interpolation)
            .field("property_name", &self.property_name)
            .field("geojson_out", &self.geojson_out)
            .field("boundless", &self.boundless)
            .finish()
    }
}

/// Sampled values for one zone: a bare scalar when the zone contributed
/// exactly one coordinate, an ordered sequence otherwise. `None` marks
/// nodata or out-of-extent samples.
#[derive(Debug, Clone, PartialEq)]
pub enum PointSample {
    One(Option<f64>),
    Many(Vec<Option<f64>>),
}

impl PointSample {
    /// Regroup a zone's flat values by its contributed coordinate count
    pub fn from_values(mut values: Vec<Option<f64>>) -> Self {
        if values.len() == 1 {
            PointSample::One(values.remove(0))
        } else {
            PointSample::Many(values)
        }
    }
}

/// One zone's point query output
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub sample: PointSample,
    /// GeoJSON-echo payload: the zone's geometry and properties with the
    /// sampled value merged under the configured property name
    pub geometry: Option<geo_types::Geometry<f64>>,
    pub properties: Option<Properties>,
}

impl PointRecord {
    pub fn bare(sample: PointSample) -> Self {
        Self {
            sample,
            geometry: None,
            properties: None,
        }
    }
}

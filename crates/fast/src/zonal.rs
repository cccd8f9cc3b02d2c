//! Path-based zonal statistics

use crate::raster::RasterContext;
use geo::BoundingRect;
use std::path::Path;
use terrastat_core::error::Result;
use terrastat_core::io::read_features;
use terrastat_core::rasterize::geometry_mask;
use terrastat_core::request::LayerSelect;
use terrastat_core::stats::{summarize, StatRecord};

/// Fill value for boundless padding when the raster declares no nodata
const FALLBACK_NODATA: f64 = -999.0;

/// Compute zonal statistics for every feature of a vector file against a
/// raster file. One record per feature, in feature order; features with
/// no usable geometry or no raster overlap produce an empty-zone record.
#[allow(clippy::too_many_arguments)]
pub fn zonal_stats_path(
    vector_path: &Path,
    raster_path: &Path,
    layer: usize,
    band: usize,
    nodata: Option<f64>,
    all_touched: bool,
    boundless: bool,
    stats: &[String],
) -> Result<Vec<StatRecord>> {
    let raster = RasterContext::open(raster_path, band, nodata)?;
    let features = read_features(vector_path, &LayerSelect::Index(layer))?;
    let mut out = Vec::with_capacity(features.len());

    for feature in &features {
        let Some(geom) = feature.geometry.as_ref() else {
            out.push(summarize(&[], stats, 0, 0, 0));
            continue;
        };
        let Some(envelope) = geom.bounding_rect() else {
            out.push(summarize(&[], stats, 0, 0, 0));
            continue;
        };

        let window = raster.window_for_bounds_unclipped(
            envelope.min().x,
            envelope.min().y,
            envelope.max().x,
            envelope.max().y,
        );
        if window.is_inverted() {
            out.push(summarize(&[], stats, 0, 0, 0));
            continue;
        }

        let effective_nodata = raster.nodata.unwrap_or(FALLBACK_NODATA);
        let (width, height, values_window) =
            raster.read_window_boundless(window, boundless, effective_nodata)?;
        if width == 0 || height == 0 {
            out.push(summarize(&[], stats, 0, 0, 0));
            continue;
        }

        let window_transform = raster.window_transform(window);
        let mask = geometry_mask(geom, &window_transform, width, height, all_touched);

        let mut values = Vec::new();
        let mut nodata_count: usize = 0;
        let mut nan_count: usize = 0;
        let mut infinite_count: usize = 0;

        for (selected, value) in mask.iter().zip(values_window.iter()) {
            if !selected {
                continue;
            }
            let v = *value;
            if (v - effective_nodata).abs() <= f64::EPSILON {
                nodata_count += 1;
            } else if v.is_nan() {
                nan_count += 1;
            } else if v.is_infinite() {
                infinite_count += 1;
            } else {
                values.push(v);
            }
        }

        out.push(summarize(&values, stats, nodata_count, nan_count, infinite_count));
    }

    Ok(out)
}

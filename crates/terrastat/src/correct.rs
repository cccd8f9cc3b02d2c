//! Nodata/overlap divergence correction
//!
//! A zone with zero raster overlap can still report a nonzero "nodata"
//! count when the engine accounted for nodata over a padded boundless
//! footprint instead of strict geometric overlap, alongside a
//! legitimately zero valid-pixel count. This post-pass re-derives each
//! suspect zone's geometry from the original vector file and zeroes the
//! nodata count when the zone truly misses the raster extent.
//!
//! The pass is best-effort: any failure to re-open either source leaves
//! the records unmodified. It must never raise, log, or block output.

use geo::Intersects;
use geo_types::{coord, Rect};
use terrastat_core::io::{read_features, read_geotiff};
use terrastat_core::request::{LayerSelect, RasterSource, VectorSource};
use terrastat_core::stats::{StatRecord, StatValue};

fn is_suspect(record: &StatRecord) -> bool {
    record.get_f64("count") == Some(0.0)
        && record.get_f64("nodata").is_some_and(|n| n > 0.0)
}

/// Zero out padded-footprint nodata counts for zones with no raster
/// overlap. Applies only to file-sourced inputs whose records all carry
/// unprefixed "count" and "nodata" keys and no GeoJSON-echo payload.
pub(crate) fn reconcile_nodata(
    records: &mut [StatRecord],
    vectors: &VectorSource,
    raster: &RasterSource,
    layer: &LayerSelect,
) {
    let (Some(vector_path), Some(raster_path)) = (vectors.as_path(), raster.as_path()) else {
        return;
    };
    let applicable = !records.is_empty()
        && records.iter().all(|r| {
            r.properties.is_none()
                && r.values.contains_key("count")
                && r.values.contains_key("nodata")
        });
    if !applicable || !records.iter().any(is_suspect) {
        return;
    }

    let Ok(grid) = read_geotiff::<f64, _>(raster_path) else {
        return;
    };
    let Ok(features) = read_features(vector_path, layer) else {
        return;
    };
    if features.len() != records.len() {
        return;
    }

    let (min_x, min_y, max_x, max_y) = grid.bounds();
    let extent = Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y });

    for (record, feature) in records.iter_mut().zip(&features) {
        if !is_suspect(record) {
            continue;
        }
        let overlaps = feature
            .geometry
            .as_ref()
            .is_some_and(|g| g.intersects(&extent));
        if !overlaps {
            record.values.insert("nodata".to_string(), StatValue::Float(0.0));
        }
    }
}

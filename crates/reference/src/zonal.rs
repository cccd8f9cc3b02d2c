//! Full-surface zonal statistics

use crate::raster::SourceRaster;
use geo::BoundingRect;
use ndarray::Array2;
use terrastat_core::error::Result;
use terrastat_core::io::read_features;
use terrastat_core::rasterize::geometry_mask;
use terrastat_core::request::{RasterSource, VectorSource, ZonalParams};
use terrastat_core::stats::{
    check_stats, format_category, histogram, summarize, MiniRaster, StatRecord, StatValue,
};
use terrastat_core::vector::Feature;

/// Compute zonal statistics over every feature of the vector source,
/// honoring the full parameter surface including the key prefix.
pub fn zonal_stats(
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
) -> Result<Vec<StatRecord>> {
    let mut records = zonal_stats_unprefixed(vectors, raster, params)?;
    if let Some(prefix) = &params.prefix {
        for record in &mut records {
            record.values = record
                .values
                .iter()
                .map(|(k, v)| (format!("{prefix}{k}"), v.clone()))
                .collect();
        }
    }
    Ok(records)
}

/// Compute zonal statistics with raw (unprefixed) keys. Callers that
/// post-process records by stat name use this and apply any prefix
/// themselves afterwards.
pub fn zonal_stats_unprefixed(
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
) -> Result<Vec<StatRecord>> {
    let features = match vectors {
        VectorSource::Path(path) => read_features(path, &params.layer)?,
        VectorSource::Features(features) => features.clone(),
    };
    let stats = check_stats(params.stats.as_deref(), params.categorical)?;
    let source = SourceRaster::load(raster, params.band, params.nodata)?;

    let mut records = Vec::with_capacity(features.len());
    for feature in &features {
        records.push(zone_record(feature, &source, &stats, params));
    }
    Ok(records)
}

fn zone_record(
    feature: &Feature,
    source: &SourceRaster,
    stats: &[String],
    params: &ZonalParams,
) -> StatRecord {
    let mut record = match &feature.geometry {
        Some(geom) => match geom.bounding_rect() {
            Some(envelope) => aggregate_zone(geom, envelope, source, stats, params),
            None => summarize(&[], stats, 0, 0, 0),
        },
        None => summarize(&[], stats, 0, 0, 0),
    };

    if params.geojson_out {
        record.geometry = feature.geometry.clone();
        record.properties = feature.properties.clone();
    }
    record
}

fn aggregate_zone(
    geom: &geo_types::Geometry<f64>,
    envelope: geo_types::Rect<f64>,
    source: &SourceRaster,
    stats: &[String],
    params: &ZonalParams,
) -> StatRecord {
    let mut window = source.window_for_bounds(
        envelope.min().x,
        envelope.min().y,
        envelope.max().x,
        envelope.max().y,
    );
    if !params.boundless {
        window = source.clip(window);
    }
    if window.is_empty() {
        return summarize(&[], stats, 0, 0, 0);
    }

    let width = window.width();
    let height = window.height();
    let buffer = source.read_window(window);
    let window_transform = source.window_transform(window);
    let mask = geometry_mask(geom, &window_transform, width, height, params.all_touched);

    let nodata = source.effective_nodata();
    let mut valid = Vec::new();
    let mut nodata_count = 0usize;
    let mut nan_count = 0usize;
    let mut infinite_count = 0usize;
    for (idx, &value) in buffer.iter().enumerate() {
        if !mask[idx] {
            continue;
        }
        if (value - nodata).abs() <= f64::EPSILON {
            nodata_count += 1;
        } else if value.is_nan() {
            nan_count += 1;
        } else if value.is_infinite() {
            infinite_count += 1;
        } else {
            valid.push(value);
        }
    }

    if let Some(zone_func) = &params.zone_func {
        zone_func(&mut valid);
    }

    let mut record = summarize(&valid, stats, nodata_count, nan_count, infinite_count);

    if params.categorical {
        for (bits, count) in histogram(&valid) {
            let key = format_category(f64::from_bits(bits));
            let key = params
                .category_map
                .as_ref()
                .and_then(|map| map.get(&key).cloned())
                .unwrap_or(key);
            record.values.insert(key, StatValue::Int(count as i64));
        }
    }

    for (name, aggregator) in &params.add_stats {
        let value = if valid.is_empty() {
            StatValue::Null
        } else {
            StatValue::Float(aggregator(&valid))
        };
        record.values.insert(name.clone(), value);
    }

    if params.raster_out {
        let masked: Vec<f64> = buffer
            .iter()
            .zip(&mask)
            .map(|(&v, &selected)| if selected { v } else { nodata })
            .collect();
        if let Ok(array) = Array2::from_shape_vec((height, width), masked) {
            record.mini_raster = Some(Box::new(MiniRaster {
                array,
                transform: window_transform,
                fill: nodata,
            }));
        }
    }

    record
}

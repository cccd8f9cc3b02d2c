//! Full-surface point sampling

use crate::raster::SourceRaster;
use serde_json::Value;
use terrastat_core::error::{Error, Result};
use terrastat_core::io::read_features;
use terrastat_core::request::{
    Interpolation, PointParams, PointRecord, PointSample, RasterSource, VectorSource,
};
use terrastat_core::vector::geom_xys;

/// Sample the raster at every coordinate of every feature. One record
/// per feature, in input order; a feature's coordinates are flattened
/// deterministically and its samples keep that order.
pub fn point_query(
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &PointParams,
) -> Result<Vec<PointRecord>> {
    let features = match vectors {
        VectorSource::Path(path) => read_features(path, &params.layer)?,
        VectorSource::Features(features) => features.clone(),
    };
    let source = SourceRaster::load(raster, params.band, params.nodata)?;

    let mut records = Vec::with_capacity(features.len());
    for feature in &features {
        let coords = feature.geometry.as_ref().map(geom_xys).unwrap_or_default();
        let mut values = Vec::with_capacity(coords.len());
        for (x, y) in coords {
            values.push(sample_at(&source, x, y, params.interpolation, params.boundless)?);
        }
        let sample = PointSample::from_values(values);

        let mut record = PointRecord::bare(sample);
        if params.geojson_out {
            record.geometry = feature.geometry.clone();
            let mut properties = feature.properties.clone().unwrap_or_default();
            properties.insert(params.property_name.clone(), sample_json(&record.sample));
            record.properties = Some(properties);
        }
        records.push(record);
    }
    Ok(records)
}

fn sample_json(sample: &PointSample) -> Value {
    let to_json = |v: &Option<f64>| match v {
        Some(v) => serde_json::json!(v),
        None => Value::Null,
    };
    match sample {
        PointSample::One(v) => to_json(v),
        PointSample::Many(vs) => Value::Array(vs.iter().map(to_json).collect()),
    }
}

fn sample_at(
    source: &SourceRaster,
    x: f64,
    y: f64,
    interpolation: Interpolation,
    boundless: bool,
) -> Result<Option<f64>> {
    if !x.is_finite() || !y.is_finite() {
        return Err(Error::InvalidInput(format!(
            "point coordinates must be finite, got ({x}, {y})"
        )));
    }
    let (fcol, frow) = source.raster.geo_to_pixel(x, y);

    // Non-boundless reads reaching past the extent are errors, same as
    // the fast engine.
    let read = |row: isize, col: isize| -> Result<Option<f64>> {
        if !boundless && !source.in_extent(row, col) {
            return Err(Error::InvalidInput(format!(
                "point ({x}, {y}) reads outside the raster extent \
                 and boundless reads are disabled"
            )));
        }
        Ok(source.sample(row, col))
    };

    let value = match interpolation {
        Interpolation::Nearest => read(frow.floor() as isize, fcol.floor() as isize)?,
        Interpolation::Bilinear => {
            let r = frow.round() as isize;
            let c = fcol.round() as isize;
            let unitx = 0.5 - ((c as f64) - fcol);
            let unity = 0.5 + ((r as f64) - frow);

            let corners = [
                [read(r - 1, c - 1)?, read(r - 1, c)?],
                [read(r, c - 1)?, read(r, c)?],
            ];
            blend(corners, unitx, unity)
        }
    };
    Ok(value)
}

/// Bilinear blend over a 2x2 neighborhood in unit-square coordinates,
/// falling back to the nearest available corner when any corner is
/// missing. Mirrors the fast engine so both paths sample identically.
fn blend(corners: [[Option<f64>; 2]; 2], x: f64, y: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return None;
    }

    match (corners[0][0], corners[0][1], corners[1][0], corners[1][1]) {
        (Some(ul), Some(ur), Some(ll), Some(lr)) => Some(
            (ll * (1.0 - x) * (1.0 - y))
                + (lr * x * (1.0 - y))
                + (ul * (1.0 - x) * y)
                + (ur * x * y),
        ),
        _ => {
            let row = (1.0 - y).round() as usize;
            let col = x.round() as usize;
            corners.get(row).and_then(|r| r.get(col)).copied().flatten()
        }
    }
}

//! End-to-end behavior of the public API across both engine paths

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use terrastat::{
    point_query, zonal_stats, Error, Feature, Interpolation, PointParams, PointSample,
    RasterSource, StatValue, VectorSource, ZonalParams, DISABLE_FAST_ENV,
};
use terrastat_core::raster::{GeoTransform, Raster};

// Tests that flip the disable toggle share the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn stat_names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}

/// 3x3 grid over [0,3]x[0,3], values 1..9 row-major from the top
fn write_grid(dir: &Path, nodata: Option<f64>) -> PathBuf {
    let raster_path = dir.join("grid.tif");
    let mut raster = Raster::from_vec((1..=9).map(|v| v as f64).collect(), 3, 3).unwrap();
    raster.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
    raster.set_nodata(nodata);
    terrastat_core::io::write_geotiff(&raster, &raster_path).unwrap();
    raster_path
}

fn write_zones(dir: &Path, rings: &[&str]) -> PathBuf {
    let features: Vec<String> = rings
        .iter()
        .map(|ring| {
            format!(
                r#"{{"type": "Feature", "properties": {{}},
                    "geometry": {{"type": "Polygon", "coordinates": [[{ring}]]}}}}"#
            )
        })
        .collect();
    let vector_path = dir.join("zones.geojson");
    std::fs::write(
        &vector_path,
        format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        ),
    )
    .unwrap();
    vector_path
}

const FULL_COVER: &str = "[0,0],[3,0],[3,3],[0,3],[0,0]";
const DISJOINT: &str = "[100,100],[102,100],[102,102],[100,102],[100,100]";

#[test]
fn test_fast_and_reference_paths_agree() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), Some(5.0)));
    let vectors = VectorSource::path(write_zones(dir.path(), &[FULL_COVER]));
    let params = ZonalParams {
        stats: stat_names(&["count", "min", "max", "mean", "std", "nodata", "median"]),
        ..Default::default()
    };

    let fast = zonal_stats(&vectors, &raster, &params).unwrap();

    std::env::set_var(DISABLE_FAST_ENV, "true");
    let reference = zonal_stats(&vectors, &raster, &params);
    std::env::remove_var(DISABLE_FAST_ENV);
    let reference = reference.unwrap();

    assert_eq!(fast.len(), reference.len());
    for (f, r) in fast.iter().zip(&reference) {
        assert_eq!(f.values, r.values);
    }
}

#[test]
fn test_output_length_matches_zone_count_including_zero() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));

    let empty = VectorSource::features(vec![]);
    assert!(zonal_stats(&empty, &raster, &ZonalParams::default())
        .unwrap()
        .is_empty());

    let three = VectorSource::path(write_zones(
        dir.path(),
        &[FULL_COVER, DISJOINT, FULL_COVER],
    ));
    let records = zonal_stats(&three, &raster, &ZonalParams::default()).unwrap();
    assert_eq!(records.len(), 3);
}

#[test]
fn test_infinite_cell_never_leaks() {
    let _guard = ENV_LOCK.lock().unwrap();
    let mut grid = Raster::from_vec(vec![1.0, f64::INFINITY, 2.0, 3.0], 2, 2).unwrap();
    grid.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

    let zone = geo_types::Geometry::Polygon(geo_types::Polygon::new(
        geo_types::LineString::from(vec![
            (0.0, 2.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 0.0),
            (0.0, 2.0),
        ]),
        vec![],
    ));
    let params = ZonalParams {
        stats: stat_names(&["count", "mean", "max", "min"]),
        ..Default::default()
    };

    // In-memory raster: reference path
    let records = zonal_stats(
        &VectorSource::features(vec![Feature::new(zone.clone())]),
        &RasterSource::array(grid.clone()),
        &params,
    )
    .unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.values.get("count"), Some(&StatValue::Int(4)));
    assert_eq!(record.get_f64("max"), Some(3.0));
    assert_eq!(record.get_f64("min"), Some(1.0));
    assert!(record.get_f64("mean").unwrap().is_finite());
    for value in record.values.values() {
        if let Some(v) = value.as_f64() {
            assert!(v.is_finite(), "non-finite value leaked: {value:?}");
        }
    }

    // File-backed raster: fast path must agree
    let dir = tempfile::tempdir().unwrap();
    let raster_path = dir.path().join("inf.tif");
    terrastat_core::io::write_geotiff(&grid, &raster_path).unwrap();
    let fast = zonal_stats(
        &VectorSource::features(vec![Feature::new(zone)]),
        &RasterSource::path(raster_path),
        &params,
    )
    .unwrap();
    assert_eq!(fast[0].values, record.values);
}

#[test]
fn test_disjoint_zone_nodata_corrected_to_zero() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), Some(-1.0)));
    let vectors = VectorSource::path(write_zones(dir.path(), &[DISJOINT]));
    let params = ZonalParams {
        stats: stat_names(&["count", "nodata"]),
        ..Default::default()
    };

    let records = zonal_stats(&vectors, &raster, &params).unwrap();
    assert_eq!(records[0].values.get("count"), Some(&StatValue::Int(0)));
    assert_eq!(
        records[0].values.get("nodata"),
        Some(&StatValue::Float(0.0)),
        "padded-footprint nodata must be corrected for a disjoint zone"
    );
}

#[test]
fn test_prefix_identical_on_both_paths() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let vectors = VectorSource::path(write_zones(dir.path(), &[FULL_COVER]));
    let params = ZonalParams {
        stats: stat_names(&["count", "mean"]),
        prefix: Some("elev_".to_string()),
        ..Default::default()
    };

    let fast = zonal_stats(&vectors, &raster, &params).unwrap();

    std::env::set_var(DISABLE_FAST_ENV, "on");
    let reference = zonal_stats(&vectors, &raster, &params);
    std::env::remove_var(DISABLE_FAST_ENV);
    let reference = reference.unwrap();

    for records in [&fast, &reference] {
        assert!(records[0].values.contains_key("elev_count"));
        assert!(records[0].values.contains_key("elev_mean"));
        assert!(!records[0].values.contains_key("count"));
    }
    assert_eq!(fast[0].values, reference[0].values);
}

#[test]
fn test_unknown_stat_name_is_invalid_input() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let vectors = VectorSource::path(write_zones(dir.path(), &[FULL_COVER]));
    let params = ZonalParams {
        stats: stat_names(&["variance"]),
        ..Default::default()
    };
    assert!(matches!(
        zonal_stats(&vectors, &raster, &params),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_malformed_vector_errors_on_both_paths() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));

    let truncated = dir.path().join("broken.geojson");
    std::fs::write(&truncated, r#"{"type": "FeatureCollection", "features": [{"ty"#).unwrap();
    let vectors = VectorSource::path(truncated);
    let params = ZonalParams::default();

    assert!(matches!(
        zonal_stats(&vectors, &raster, &params),
        Err(Error::InvalidInput(_))
    ));

    std::env::set_var(DISABLE_FAST_ENV, "1");
    let direct = zonal_stats(&vectors, &raster, &params);
    std::env::remove_var(DISABLE_FAST_ENV);
    assert!(matches!(direct, Err(Error::InvalidInput(_))));
}

#[test]
fn test_categorical_routes_to_reference() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let vectors = VectorSource::path(write_zones(dir.path(), &[FULL_COVER]));
    let params = ZonalParams {
        categorical: true,
        ..Default::default()
    };

    let records = zonal_stats(&vectors, &raster, &params).unwrap();
    // Values 1..9 each appear once.
    assert_eq!(records[0].values.len(), 9);
    assert_eq!(records[0].values.get("7"), Some(&StatValue::Int(1)));
}

#[test]
fn test_point_regrouping_scalar_vs_sequence() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let features = vec![
        Feature::new(geo_types::Geometry::Point(geo_types::Point::new(0.5, 2.5))),
        Feature::new(geo_types::Geometry::LineString(geo_types::LineString::from(
            vec![(0.5, 2.5), (1.5, 2.5), (2.5, 2.5)],
        ))),
    ];
    let params = PointParams {
        interpolation: Interpolation::Nearest,
        ..Default::default()
    };

    let records = point_query(&VectorSource::features(features), &raster, &params).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sample, PointSample::One(Some(1.0)));
    assert_eq!(
        records[1].sample,
        PointSample::Many(vec![Some(1.0), Some(2.0), Some(3.0)])
    );
}

#[test]
fn test_point_paths_agree_with_reference() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), Some(5.0)));
    let features = vec![
        Feature::new(geo_types::Geometry::Point(geo_types::Point::new(1.2, 1.7))),
        Feature::new(geo_types::Geometry::Point(geo_types::Point::new(1.5, 1.5))),
        Feature::new(geo_types::Geometry::Point(geo_types::Point::new(50.0, 50.0))),
    ];
    let vectors = VectorSource::features(features);
    let params = PointParams::default();

    let fast = point_query(&vectors, &raster, &params).unwrap();

    std::env::set_var(DISABLE_FAST_ENV, "yes");
    let reference = point_query(&vectors, &raster, &params);
    std::env::remove_var(DISABLE_FAST_ENV);
    let reference = reference.unwrap();

    assert_eq!(fast.len(), reference.len());
    for (f, r) in fast.iter().zip(&reference) {
        assert_eq!(f.sample, r.sample);
    }
}

#[test]
fn test_non_boundless_out_of_extent_point_errors_on_both_paths() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let vectors = VectorSource::features(vec![Feature::new(geo_types::Geometry::Point(
        geo_types::Point::new(50.0, 50.0),
    ))]);
    let params = PointParams {
        interpolation: Interpolation::Nearest,
        boundless: false,
        ..Default::default()
    };

    assert!(matches!(
        point_query(&vectors, &raster, &params),
        Err(Error::InvalidInput(_))
    ));

    std::env::set_var(DISABLE_FAST_ENV, "1");
    let direct = point_query(&vectors, &raster, &params);
    std::env::remove_var(DISABLE_FAST_ENV);
    assert!(matches!(direct, Err(Error::InvalidInput(_))));
}

#[test]
fn test_point_geojson_out_uses_reference() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let raster = RasterSource::path(write_grid(dir.path(), None));
    let mut props = terrastat::Properties::new();
    props.insert("site".to_string(), serde_json::json!("a"));
    let feature = Feature::with_properties(
        geo_types::Geometry::Point(geo_types::Point::new(0.5, 2.5)),
        props,
    );
    let params = PointParams {
        interpolation: Interpolation::Nearest,
        geojson_out: true,
        property_name: "elevation".to_string(),
        ..Default::default()
    };

    let records = point_query(&VectorSource::features(vec![feature]), &raster, &params).unwrap();
    let properties = records[0].properties.as_ref().unwrap();
    assert_eq!(properties.get("elevation"), Some(&serde_json::json!(1.0)));
    assert_eq!(properties.get("site"), Some(&serde_json::json!("a")));
}

//! Fast-path eligibility gate
//!
//! A pure predicate over the availability probe, the environment disable
//! toggle, and the request shape. It runs before any I/O and never
//! invokes an engine; the only filesystem touches are path-existence
//! checks, which the gate owns so a dangling raster or vector path
//! routes to the reference engine instead of failing the fast engine
//! later.

use terrastat_core::request::{LayerSelect, PointParams, RasterSource, VectorSource, ZonalParams};
use terrastat_core::stats::is_supported_stat;

/// Environment toggle forcing the fast engine off. Recognized truthy
/// values are "1", "true", "yes" and "on", case-insensitive; anything
/// else leaves availability unaffected. Read fresh on every call.
pub const DISABLE_FAST_ENV: &str = "TERRASTAT_DISABLE_FAST";

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether the environment toggle currently disables the fast engine
pub(crate) fn fast_engine_disabled() -> bool {
    std::env::var(DISABLE_FAST_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn raster_is_existing_file(raster: &RasterSource) -> bool {
    raster.as_path().is_some_and(|p| p.exists())
}

/// In-memory features always qualify; a file-backed source qualifies
/// only when its path exists. A dangling vector path is ordinary
/// ineligibility, not a fast-path failure, so it routes to the
/// reference engine without a warning.
fn vectors_admissible(vectors: &VectorSource) -> bool {
    match vectors {
        VectorSource::Path(path) => path.exists(),
        VectorSource::Features(_) => true,
    }
}

/// Whether a zonal request fits the fast engine's narrow shape.
///
/// `stats` is the normalized stat list; unknown names were already
/// rejected up front, but membership is still checked here so the gate
/// stands alone as the full eligibility definition.
pub(crate) fn zonal_eligible(
    available: bool,
    disabled: bool,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
    stats: &[String],
) -> bool {
    available
        && !disabled
        && vectors_admissible(vectors)
        && raster_is_existing_file(raster)
        && matches!(params.layer, LayerSelect::Index(_))
        && !params.categorical
        && params.category_map.is_none()
        && params.add_stats.is_empty()
        && params.zone_func.is_none()
        && !params.raster_out
        && !params.geojson_out
        && stats.iter().all(|s| is_supported_stat(s))
}

/// Whether a point request fits the fast engine's narrow shape. The
/// dispatch layer reads features itself, so beyond source
/// admissibility only the output mode constrains eligibility.
pub(crate) fn point_eligible(
    available: bool,
    disabled: bool,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &PointParams,
) -> bool {
    available
        && !disabled
        && vectors_admissible(vectors)
        && raster_is_existing_file(raster)
        && !params.geojson_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use terrastat_core::raster::Raster;

    fn existing_raster() -> (tempfile::TempDir, RasterSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.tif");
        std::fs::write(&path, b"placeholder").unwrap();
        (dir, RasterSource::path(path))
    }

    fn stats(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn memory_vectors() -> VectorSource {
        VectorSource::Features(Vec::new())
    }

    #[test]
    fn test_plain_request_is_eligible() {
        let (_dir, raster) = existing_raster();
        let vectors = memory_vectors();
        let params = ZonalParams::default();
        assert!(zonal_eligible(true, false, &vectors, &raster, &params, &stats(&["count", "mean"])));
    }

    #[test]
    fn test_unavailable_or_disabled_blocks() {
        let (_dir, raster) = existing_raster();
        let vectors = memory_vectors();
        let params = ZonalParams::default();
        let s = stats(&["count"]);
        assert!(!zonal_eligible(false, false, &vectors, &raster, &params, &s));
        assert!(!zonal_eligible(true, true, &vectors, &raster, &params, &s));
    }

    #[test]
    fn test_in_memory_raster_blocks() {
        let params = ZonalParams::default();
        let vectors = memory_vectors();
        let raster = RasterSource::array(Raster::new(2, 2));
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &stats(&["count"])));
    }

    #[test]
    fn test_missing_raster_path_blocks() {
        let params = ZonalParams::default();
        let vectors = memory_vectors();
        let raster = RasterSource::path("/nonexistent/raster.tif");
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &stats(&["count"])));
    }

    #[test]
    fn test_full_surface_options_block() {
        let (_dir, raster) = existing_raster();
        let vectors = memory_vectors();
        let s = stats(&["count"]);

        let mut params = ZonalParams::default();
        params.categorical = true;
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.category_map = Some(Default::default());
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.add_stats = vec![("m".to_string(), Arc::new(|v: &[f64]| v[0]))];
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.zone_func = Some(Arc::new(|_: &mut Vec<f64>| {}));
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.raster_out = true;
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.geojson_out = true;
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));

        let mut params = ZonalParams::default();
        params.layer = LayerSelect::Name("roads".to_string());
        assert!(!zonal_eligible(true, false, &vectors, &raster, &params, &s));
    }

    #[test]
    fn test_percentile_names_are_in_vocabulary() {
        let (_dir, raster) = existing_raster();
        let vectors = memory_vectors();
        let params = ZonalParams::default();
        assert!(zonal_eligible(
            true,
            false,
            &vectors,
            &raster,
            &params,
            &stats(&["count", "percentile_90"]),
        ));
    }

    #[test]
    fn test_missing_vector_path_blocks() {
        let (_dir, raster) = existing_raster();
        let vectors = VectorSource::path("/nonexistent/zones.geojson");
        let zonal = ZonalParams::default();
        assert!(!zonal_eligible(true, false, &vectors, &raster, &zonal, &stats(&["count"])));
        let point = PointParams::default();
        assert!(!point_eligible(true, false, &vectors, &raster, &point));
    }

    #[test]
    fn test_point_geojson_out_blocks() {
        let (_dir, raster) = existing_raster();
        let vectors = memory_vectors();
        let mut params = PointParams::default();
        assert!(point_eligible(true, false, &vectors, &raster, &params));
        params.geojson_out = true;
        assert!(!point_eligible(true, false, &vectors, &raster, &params));
    }

    #[test]
    fn test_truthy_parsing() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(is_truthy(v), "{v} should disable");
        }
        for v in ["0", "false", "", "off", "2"] {
            assert!(!is_truthy(v), "{v} should not disable");
        }
    }
}

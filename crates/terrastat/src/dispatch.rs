//! Dispatch orchestration between the fast and reference engines
//!
//! Sequencing: gate → (if eligible) normalize → fast engine → sanitize
//! → correct → return; any ineligibility or fast-path failure routes
//! the caller's original, unnormalized arguments to the reference
//! engine instead. Engine selection is never caller-visible: the only
//! errors that propagate are input-validity errors both engines raise
//! identically.

use std::path::Path;
use std::sync::OnceLock;
use terrastat_core::error::Result;
use terrastat_core::request::{
    Interpolation, PointParams, PointRecord, PointSample, RasterSource, VectorSource, ZonalParams,
};
use terrastat_core::stats::StatRecord;
use tracing::warn;

use crate::eligibility;
use crate::normalize::{self, CanonicalVectors, Stage, StagedFailure};
use crate::{correct, sanitize};

/// Outcome of a fast-path attempt. "Ran with zero records" is a
/// success distinct from "not eligible"; conflating them would turn an
/// empty zone set into a spurious reference-engine invocation.
pub(crate) enum FastPath<T> {
    Ineligible,
    Ran(T),
    Failed,
}

/// The narrow engine surface the orchestrator drives. Production code
/// uses [`NativeEngine`]; tests substitute failing or counting
/// implementations to exercise the fallback paths.
pub(crate) trait FastEngine {
    fn available(&self) -> bool;

    #[allow(clippy::too_many_arguments)]
    fn zonal(
        &self,
        vectors: &Path,
        raster: &Path,
        layer: usize,
        band: usize,
        nodata: Option<f64>,
        all_touched: bool,
        boundless: bool,
        stats: &[String],
    ) -> Result<Vec<StatRecord>>;

    fn point(
        &self,
        raster: &Path,
        coords: &[(f64, f64)],
        band: usize,
        nodata: Option<f64>,
        interpolation: Interpolation,
        boundless: bool,
    ) -> Result<Vec<Option<f64>>>;
}

static FAST_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// The in-process fast engine. Availability is probed at most once per
/// process lifetime and never re-evaluated.
pub(crate) struct NativeEngine;

impl FastEngine for NativeEngine {
    fn available(&self) -> bool {
        *FAST_AVAILABLE.get_or_init(terrastat_fast::healthcheck)
    }

    fn zonal(
        &self,
        vectors: &Path,
        raster: &Path,
        layer: usize,
        band: usize,
        nodata: Option<f64>,
        all_touched: bool,
        boundless: bool,
        stats: &[String],
    ) -> Result<Vec<StatRecord>> {
        terrastat_fast::zonal_stats_path(
            vectors,
            raster,
            layer,
            band,
            nodata,
            all_touched,
            boundless,
            stats,
        )
    }

    fn point(
        &self,
        raster: &Path,
        coords: &[(f64, f64)],
        band: usize,
        nodata: Option<f64>,
        interpolation: Interpolation,
        boundless: bool,
    ) -> Result<Vec<Option<f64>>> {
        terrastat_fast::point_query_path(raster, coords, band, nodata, interpolation, boundless)
    }
}

/// Exactly one warning per fallback, tagged with the failing stage
fn warn_fallback(failure: &StagedFailure) {
    warn!(
        stage = %failure.stage,
        error = %failure.error,
        "fast engine failed, falling back to reference engine"
    );
}

pub(crate) fn zonal_with_engine<E: FastEngine>(
    engine: &E,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
    stats: &[String],
) -> Result<Vec<StatRecord>> {
    match try_fast_zonal(engine, vectors, raster, params, stats) {
        FastPath::Ran(mut records) => {
            sanitize::scrub_records(&mut records);
            correct::reconcile_nodata(&mut records, vectors, raster, &params.layer);
            sanitize::apply_prefix(&mut records, params.prefix.as_deref());
            Ok(records)
        }
        FastPath::Ineligible | FastPath::Failed => {
            let mut records = terrastat_reference::zonal_stats_unprefixed(vectors, raster, params)?;
            sanitize::scrub_records(&mut records);
            sanitize::apply_prefix(&mut records, params.prefix.as_deref());
            Ok(records)
        }
    }
}

fn try_fast_zonal<E: FastEngine>(
    engine: &E,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &ZonalParams,
    stats: &[String],
) -> FastPath<Vec<StatRecord>> {
    let disabled = eligibility::fast_engine_disabled();
    if !eligibility::zonal_eligible(engine.available(), disabled, vectors, raster, params, stats) {
        return FastPath::Ineligible;
    }
    let Some(raster_path) = raster.as_path() else {
        return FastPath::Ineligible;
    };

    // The temp file (if any) lives inside `canonical` and is removed
    // when it drops, on every exit path below.
    let canonical = match normalize::canonical_vectors(vectors, &params.layer) {
        Ok(CanonicalVectors::Empty) => return FastPath::Ran(Vec::new()),
        Ok(canonical) => canonical,
        Err(failure) => {
            warn_fallback(&failure);
            return FastPath::Failed;
        }
    };
    let Some((vector_path, layer)) = canonical.path_and_layer(vectors) else {
        return FastPath::Ineligible;
    };

    match engine.zonal(
        vector_path,
        raster_path,
        layer,
        params.band,
        params.nodata,
        params.all_touched,
        params.boundless,
        stats,
    ) {
        Ok(records) => FastPath::Ran(records),
        Err(error) => {
            warn_fallback(&StagedFailure {
                stage: Stage::EngineCall,
                error,
            });
            FastPath::Failed
        }
    }
}

pub(crate) fn point_with_engine<E: FastEngine>(
    engine: &E,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &PointParams,
) -> Result<Vec<PointRecord>> {
    match try_fast_point(engine, vectors, raster, params) {
        FastPath::Ran(mut records) => {
            sanitize::scrub_point_records(&mut records);
            Ok(records)
        }
        FastPath::Ineligible | FastPath::Failed => {
            let mut records = terrastat_reference::point_query(vectors, raster, params)?;
            sanitize::scrub_point_records(&mut records);
            Ok(records)
        }
    }
}

fn try_fast_point<E: FastEngine>(
    engine: &E,
    vectors: &VectorSource,
    raster: &RasterSource,
    params: &PointParams,
) -> FastPath<Vec<PointRecord>> {
    let disabled = eligibility::fast_engine_disabled();
    if !eligibility::point_eligible(engine.available(), disabled, vectors, raster, params) {
        return FastPath::Ineligible;
    }
    let Some(raster_path) = raster.as_path() else {
        return FastPath::Ineligible;
    };

    let flat = match normalize::flatten_points(vectors, &params.layer) {
        Ok(flat) => flat,
        Err(failure) => {
            warn_fallback(&failure);
            return FastPath::Failed;
        }
    };
    if flat.counts.is_empty() {
        return FastPath::Ran(Vec::new());
    }

    match engine.point(
        raster_path,
        &flat.coords,
        params.band,
        params.nodata,
        params.interpolation,
        params.boundless,
    ) {
        Ok(values) => {
            let records = flat
                .regroup(values)
                .into_iter()
                .map(|zone_values| PointRecord::bare(PointSample::from_values(zone_values)))
                .collect();
            FastPath::Ran(records)
        }
        Err(error) => {
            warn_fallback(&StagedFailure {
                stage: Stage::EngineCall,
                error,
            });
            FastPath::Failed
        }
    }
}

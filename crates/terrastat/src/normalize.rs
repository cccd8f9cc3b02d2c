//! Input normalization for the fast path
//!
//! The fast engine only accepts file paths and flat coordinate lists.
//! This module converts in-memory zone sources into a canonical
//! temporary GeoJSON document and flattens point-query geometries,
//! recording per-zone coordinate counts for later regrouping.

use std::fmt;
use std::path::Path;
use tempfile::NamedTempFile;
use terrastat_core::error::Error;
use terrastat_core::io::{read_features, write_feature_collection};
use terrastat_core::request::{LayerSelect, VectorSource};
use terrastat_core::vector::geom_xys;

/// Stage at which a fast-path attempt failed, carried on the single
/// fallback warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    FeatureNormalization,
    FeatureSerialization,
    EngineCall,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Stage::FeatureNormalization => "feature_normalization",
            Stage::FeatureSerialization => "feature_serialization",
            Stage::EngineCall => "engine_call",
        };
        f.write_str(tag)
    }
}

/// A fast-path failure with its stage tag; resolved by falling back,
/// never surfaced to the caller.
#[derive(Debug)]
pub(crate) struct StagedFailure {
    pub stage: Stage,
    pub error: Error,
}

impl StagedFailure {
    fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}

/// Canonical vector input for the fast engine. The `Temp` variant owns
/// the serialized document; dropping it removes the file, so cleanup
/// runs exactly once on every exit path.
pub(crate) enum CanonicalVectors {
    /// Caller's own file, passed through with its layer index
    Passthrough { layer: usize },
    /// Serialized in-memory features; the synthetic collection is a
    /// single layer, so the index resets to 0
    Temp(NamedTempFile),
    /// Zero in-memory features: a success short-circuit, the fast
    /// engine must not run at all
    Empty,
}

impl CanonicalVectors {
    /// Path and layer index to hand the fast engine
    pub fn path_and_layer<'a>(&'a self, original: &'a VectorSource) -> Option<(&'a Path, usize)> {
        match self {
            CanonicalVectors::Passthrough { layer } => {
                original.as_path().map(|p| (p, *layer))
            }
            CanonicalVectors::Temp(file) => Some((file.path(), 0)),
            CanonicalVectors::Empty => None,
        }
    }
}

/// Normalize a zone source into the canonical file the fast engine
/// reads. File paths pass through (the gate already verified they
/// exist); in-memory features serialize to a uniquely-named temporary
/// GeoJSON document.
pub(crate) fn canonical_vectors(
    vectors: &VectorSource,
    layer: &LayerSelect,
) -> Result<CanonicalVectors, StagedFailure> {
    match vectors {
        VectorSource::Path(_) => {
            let layer = match layer {
                LayerSelect::Index(i) => *i,
                // Gate admits only integer indexes
                LayerSelect::Name(_) => 0,
            };
            Ok(CanonicalVectors::Passthrough { layer })
        }
        VectorSource::Features(features) => {
            if features.is_empty() {
                return Ok(CanonicalVectors::Empty);
            }
            let file = NamedTempFile::with_suffix(".geojson")
                .map_err(|e| StagedFailure::new(Stage::FeatureSerialization, e.into()))?;
            write_feature_collection(features, file.as_file())
                .map_err(|e| StagedFailure::new(Stage::FeatureSerialization, e))?;
            Ok(CanonicalVectors::Temp(file))
        }
    }
}

/// A point query flattened for the fast engine: the flat coordinate
/// list plus each zone's contribution count, in input order.
pub(crate) struct FlatPoints {
    pub coords: Vec<(f64, f64)>,
    pub counts: Vec<usize>,
}

impl FlatPoints {
    /// Regroup a flat per-coordinate result by the recorded counts.
    /// The input must be index-aligned with `coords`.
    pub fn regroup(&self, mut flat: Vec<Option<f64>>) -> Vec<Vec<Option<f64>>> {
        let mut grouped = Vec::with_capacity(self.counts.len());
        for &count in &self.counts {
            let rest = flat.split_off(count.min(flat.len()));
            grouped.push(std::mem::replace(&mut flat, rest));
        }
        grouped
    }
}

/// Flatten every zone geometry into its constituent coordinates,
/// reading file-backed sources through the feature reader.
pub(crate) fn flatten_points(
    vectors: &VectorSource,
    layer: &LayerSelect,
) -> Result<FlatPoints, StagedFailure> {
    let features = match vectors {
        VectorSource::Path(path) => read_features(path, layer)
            .map_err(|e| StagedFailure::new(Stage::FeatureNormalization, e))?,
        VectorSource::Features(features) => features.clone(),
    };

    let mut coords = Vec::new();
    let mut counts = Vec::with_capacity(features.len());
    for feature in &features {
        let xys = feature.geometry.as_ref().map(geom_xys).unwrap_or_default();
        counts.push(xys.len());
        coords.extend(xys);
    }
    Ok(FlatPoints { coords, counts })
}

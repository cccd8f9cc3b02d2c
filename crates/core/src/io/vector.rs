//! GeoJSON feature reading and writing
//!
//! The feature reader collaborator: yields geometry+properties records
//! from a vector file, honoring a layer selector. GeoJSON sources carry
//! exactly one layer, addressed as index 0 or by the collection's
//! `name` member.

use crate::error::{Error, Result};
use crate::request::LayerSelect;
use crate::vector::Feature;
use geojson::GeoJson;
use std::io::Write;
use std::path::Path;

/// Read all features from a GeoJSON file in document order.
///
/// Accepts a FeatureCollection, a bare Feature, or a bare geometry.
/// Malformed or truncated documents are an invalid-input error; both
/// engines surface it identically.
pub fn read_features(path: &Path, layer: &LayerSelect) -> Result<Vec<Feature>> {
    let raw = std::fs::read_to_string(path)?;
    let geojson: GeoJson = raw
        .parse()
        .map_err(|e| Error::InvalidInput(format!("{}: malformed GeoJSON: {e}", path.display())))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            check_layer(layer, collection_name(&fc), path)?;
            fc.features
                .into_iter()
                .map(|f| convert_feature(f, path))
                .collect()
        }
        GeoJson::Feature(f) => {
            check_layer(layer, None, path)?;
            Ok(vec![convert_feature(f, path)?])
        }
        GeoJson::Geometry(g) => {
            check_layer(layer, None, path)?;
            Ok(vec![Feature {
                geometry: Some(convert_geometry(g, path)?),
                properties: None,
            }])
        }
    }
}

fn collection_name(fc: &geojson::FeatureCollection) -> Option<&str> {
    fc.foreign_members
        .as_ref()
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
}

fn check_layer(layer: &LayerSelect, name: Option<&str>, path: &Path) -> Result<()> {
    match layer {
        LayerSelect::Index(0) => Ok(()),
        LayerSelect::Index(i) => Err(Error::InvalidInput(format!(
            "{}: layer {i} does not exist; GeoJSON sources have a single layer 0",
            path.display()
        ))),
        LayerSelect::Name(requested) if Some(requested.as_str()) == name => Ok(()),
        LayerSelect::Name(requested) => Err(Error::InvalidInput(format!(
            "{}: no layer named {requested}",
            path.display()
        ))),
    }
}

fn convert_feature(feature: geojson::Feature, path: &Path) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(convert_geometry(g, path)?),
        None => None,
    };
    Ok(Feature {
        geometry,
        properties: feature.properties,
    })
}

fn convert_geometry(geometry: geojson::Geometry, path: &Path) -> Result<geo_types::Geometry<f64>> {
    geo_types::Geometry::<f64>::try_from(geometry.value)
        .map_err(|e| Error::InvalidInput(format!("{}: bad geometry: {e}", path.display())))
}

/// Serialize features as one synthetic FeatureCollection document.
///
/// This is the canonical form the dispatch layer hands the fast engine
/// for in-memory inputs; the collection always reads back as layer 0.
pub fn write_feature_collection<W: Write>(features: &[Feature], writer: W) -> Result<()> {
    let features: Vec<geojson::Feature> = features
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: None,
            properties: f.properties.clone(),
            foreign_members: None,
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    serde_json::to_writer(writer, &GeoJson::FeatureCollection(collection))
        .map_err(|e| Error::Other(format!("cannot serialize feature collection: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Geometry;

    fn write_temp(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.geojson");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_feature_collection_in_order() {
        let (_dir, path) = write_temp(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                 "properties": {"id": 7}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3.0, 4.0]},
                 "properties": null}
            ]}"#,
        );

        let features = read_features(&path, &LayerSelect::Index(0)).unwrap();
        assert_eq!(features.len(), 2);
        match &features[0].geometry {
            Some(Geometry::Point(p)) => assert_eq!((p.x(), p.y()), (1.0, 2.0)),
            other => panic!("unexpected geometry {other:?}"),
        }
        assert_eq!(
            features[0].properties.as_ref().unwrap().get("id"),
            Some(&serde_json::json!(7))
        );
    }

    #[test]
    fn test_bare_geometry_becomes_single_feature() {
        let (_dir, path) = write_temp(r#"{"type": "Point", "coordinates": [5.0, 6.0]}"#);
        let features = read_features(&path, &LayerSelect::Index(0)).unwrap();
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn test_truncated_document_is_invalid_input() {
        let (_dir, path) = write_temp(r#"{"type": "FeatureCollection", "features": [{"type""#);
        let err = read_features(&path, &LayerSelect::Index(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_layer_index_beyond_zero_rejected() {
        let (_dir, path) = write_temp(r#"{"type": "FeatureCollection", "features": []}"#);
        let err = read_features(&path, &LayerSelect::Index(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_layer_name_matches_collection_name() {
        let (_dir, path) = write_temp(
            r#"{"type": "FeatureCollection", "name": "parcels", "features": []}"#,
        );
        assert!(read_features(&path, &LayerSelect::Name("parcels".into())).is_ok());
        assert!(read_features(&path, &LayerSelect::Name("roads".into())).is_err());
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");

        let feature = Feature::new(Geometry::Point(geo_types::Point::new(9.0, -3.0)));
        let file = std::fs::File::create(&path).unwrap();
        write_feature_collection(&[feature], file).unwrap();

        let back = read_features(&path, &LayerSelect::Index(0)).unwrap();
        assert_eq!(back.len(), 1);
        match &back[0].geometry {
            Some(Geometry::Point(p)) => assert_eq!((p.x(), p.y()), (9.0, -3.0)),
            other => panic!("unexpected geometry {other:?}"),
        }
    }
}

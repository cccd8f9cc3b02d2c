//! Vector features and geometry helpers

use geo_types::Geometry;

/// Feature attribute map, matching the GeoJSON properties object
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A vector zone: geometry plus optional properties.
///
/// Identity is positional; callers rely on input order being preserved
/// end-to-end, so features carry no explicit id.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// Feature geometry, if any
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: Option<Properties>,
}

impl Feature {
    /// Create a feature with geometry and no properties
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: None,
        }
    }

    /// Create a feature with geometry and properties
    pub fn with_properties(geometry: Geometry<f64>, properties: Properties) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Some(properties),
        }
    }
}

/// Flatten a geometry into its constituent (x, y) coordinates in
/// deterministic order: points yield themselves, lines yield their
/// vertices, polygons yield exterior then interior ring vertices, and
/// collections recurse in element order.
///
/// Point queries use this to derive the flat coordinate list sent to an
/// engine; the per-zone coordinate count is what lets the dispatch layer
/// regroup flat results afterwards.
pub fn geom_xys(geom: &Geometry<f64>) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    push_xys(geom, &mut out);
    out
}

fn push_xys(geom: &Geometry<f64>, out: &mut Vec<(f64, f64)>) {
    match geom {
        Geometry::Point(p) => out.push((p.x(), p.y())),
        Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                out.push((p.x(), p.y()));
            }
        }
        Geometry::Line(l) => {
            out.push((l.start.x, l.start.y));
            out.push((l.end.x, l.end.y));
        }
        Geometry::LineString(ls) => {
            for c in &ls.0 {
                out.push((c.x, c.y));
            }
        }
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                push_xys(&Geometry::LineString(ls.clone()), out);
            }
        }
        Geometry::Polygon(poly) => {
            for c in &poly.exterior().0 {
                out.push((c.x, c.y));
            }
            for ring in poly.interiors() {
                for c in &ring.0 {
                    out.push((c.x, c.y));
                }
            }
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                push_xys(&Geometry::Polygon(poly.clone()), out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                push_xys(g, out);
            }
        }
        Geometry::Rect(r) => push_xys(&Geometry::Polygon(r.to_polygon()), out),
        Geometry::Triangle(t) => push_xys(&Geometry::Polygon(t.to_polygon()), out),
    }
}

/// Whether a geometry has an areal component. Non-areal zones are
/// rasterized by intersection rather than cell-center containment,
/// since a center test would select no cells for points and lines.
pub fn is_areal(geom: &Geometry<f64>) -> bool {
    match geom {
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => true,
        Geometry::GeometryCollection(gc) => gc.0.iter().any(is_areal),
        _ => false,
    }
}

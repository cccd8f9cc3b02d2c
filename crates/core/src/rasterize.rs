//! Geometry-to-cell-mask rasterization
//!
//! Replaces a full rasterizer for the narrow case the engines need:
//! a boolean mask over a read window, computed with `geo` predicates.

use crate::raster::GeoTransform;
use crate::vector::is_areal;
use geo::{Contains, Intersects};
use geo_types::{coord, Geometry, Point, Rect};

/// Compute the zone mask for a window of `width` x `height` cells whose
/// world placement is described by `transform` (the window's own
/// transform, not the full raster's).
///
/// Default policy selects cells whose center lies inside the geometry.
/// With `all_touched`, or whenever the geometry has no areal component
/// (points and lines never contain a cell center), any intersection
/// between the cell rectangle and the geometry selects the cell.
pub fn geometry_mask(
    geom: &Geometry<f64>,
    transform: &GeoTransform,
    width: usize,
    height: usize,
    all_touched: bool,
) -> Vec<bool> {
    let touch = all_touched || !is_areal(geom);
    let mut mask = vec![false; width * height];

    for row in 0..height {
        for col in 0..width {
            let selected = if touch {
                let (x0, y0) = transform.pixel_to_geo_corner(col, row);
                let (x1, y1) = transform.pixel_to_geo_corner(col + 1, row + 1);
                let cell = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 });
                geom.intersects(&cell)
            } else {
                let (cx, cy) = transform.pixel_to_geo(col, row);
                geom.contains(&Point::new(cx, cy))
            };
            if selected {
                mask[row * width + col] = true;
            }
        }
    }

    mask
}

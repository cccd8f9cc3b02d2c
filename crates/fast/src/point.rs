//! Path-based point sampling

use crate::raster::RasterContext;
use std::path::Path;
use terrastat_core::error::{Error, Result};
use terrastat_core::request::Interpolation;

/// Bilinear blend over a 2x2 neighborhood in unit-square coordinates.
/// When any corner is missing (nodata or out of extent) the nearest
/// corner is returned instead, which keeps samples near a nodata
/// boundary close to their nearest-neighbor value.
fn bilinear(values: [[Option<f64>; 2]; 2], x: f64, y: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return None;
    }

    let ul = values[0][0];
    let ur = values[0][1];
    let ll = values[1][0];
    let lr = values[1][1];

    if ul.is_none() || ur.is_none() || ll.is_none() || lr.is_none() {
        let row = (1.0 - y).round() as usize;
        let col = x.round() as usize;
        return values.get(row).and_then(|r| r.get(col)).copied().flatten();
    }

    let ul = ul.unwrap_or_default();
    let ur = ur.unwrap_or_default();
    let ll = ll.unwrap_or_default();
    let lr = lr.unwrap_or_default();

    Some(
        (ll * (1.0 - x) * (1.0 - y))
            + (lr * x * (1.0 - y))
            + (ul * (1.0 - x) * y)
            + (ur * x * y),
    )
}

/// Sample a raster at a flat list of coordinates. Output is index-aligned
/// with the input; nodata and out-of-extent samples are `None`. When
/// `boundless` is off, a read reaching outside the raster extent is an
/// error instead of `None`.
pub fn point_query_path(
    raster_path: &Path,
    coords: &[(f64, f64)],
    band: usize,
    nodata: Option<f64>,
    interpolation: Interpolation,
    boundless: bool,
) -> Result<Vec<Option<f64>>> {
    let raster = RasterContext::open(raster_path, band, nodata)?;
    let mut out = Vec::with_capacity(coords.len());

    for &(x, y) in coords {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidInput(format!(
                "point coordinates must be finite, got ({x}, {y})"
            )));
        }
        let (fcol, frow) = raster.world_to_pixel(x, y);

        let read = |row: isize, col: isize| -> Result<Option<f64>> {
            if !boundless && !raster.is_inside(row, col) {
                return Err(Error::InvalidInput(format!(
                    "point ({x}, {y}) reads outside the raster extent \
                     and boundless reads are disabled"
                )));
            }
            Ok(raster.read_value(row, col))
        };

        match interpolation {
            Interpolation::Nearest => {
                let row = frow.floor() as isize;
                let col = fcol.floor() as isize;
                out.push(read(row, col)?);
            }
            Interpolation::Bilinear => {
                let r = frow.round() as isize;
                let c = fcol.round() as isize;
                let unitx = 0.5 - ((c as f64) - fcol);
                let unity = 0.5 + ((r as f64) - frow);

                let ul = read(r - 1, c - 1)?;
                let ur = read(r - 1, c)?;
                let ll = read(r, c - 1)?;
                let lr = read(r, c)?;
                out.push(bilinear([[ul, ur], [ll, lr]], unitx, unity));
            }
        }
    }

    Ok(out)
}

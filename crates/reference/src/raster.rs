//! In-memory raster access for the reference engine

use terrastat_core::error::{Error, Result};
use terrastat_core::io::read_geotiff;
use terrastat_core::raster::{GeoTransform, Raster};
use terrastat_core::request::RasterSource;

/// Fill value for boundless padding when the raster declares no nodata.
/// Matches the fast engine's convention so both paths account padded
/// cells identically.
pub(crate) const FALLBACK_NODATA: f64 = -999.0;

/// A fully-loaded raster band with resolved nodata
pub(crate) struct SourceRaster {
    pub raster: Raster<f64>,
    pub nodata: Option<f64>,
}

/// Inclusive pixel window; indices may exceed the raster extent
#[derive(Clone, Copy, Debug)]
pub(crate) struct PixelWindow {
    pub row_start: isize,
    pub row_end: isize,
    pub col_start: isize,
    pub col_end: isize,
}

impl PixelWindow {
    pub fn is_empty(&self) -> bool {
        self.row_end < self.row_start || self.col_end < self.col_start
    }

    pub fn width(&self) -> usize {
        (self.col_end - self.col_start + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.row_end - self.row_start + 1) as usize
    }
}

impl SourceRaster {
    pub fn load(source: &RasterSource, band: usize, nodata: Option<f64>) -> Result<Self> {
        if band < 1 {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: "band indexes are 1-based".to_string(),
            });
        }
        if band > 1 {
            return Err(Error::InvalidInput(format!(
                "band {band} out of range; sources are single-band"
            )));
        }

        let raster = match source {
            RasterSource::Path(path) => read_geotiff::<f64, _>(path)?,
            RasterSource::Array(raster) => raster.clone(),
        };
        if !raster.transform().is_invertible() {
            return Err(Error::Raster(
                "raster geotransform is not invertible".to_string(),
            ));
        }

        let nodata = nodata.or_else(|| raster.nodata());
        Ok(Self { raster, nodata })
    }

    pub fn effective_nodata(&self) -> f64 {
        self.nodata.unwrap_or(FALLBACK_NODATA)
    }

    /// Pixel window covering a world bounding box, unclipped
    pub fn window_for_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> PixelWindow {
        let corners = [
            self.raster.geo_to_pixel(min_x, min_y),
            self.raster.geo_to_pixel(min_x, max_y),
            self.raster.geo_to_pixel(max_x, min_y),
            self.raster.geo_to_pixel(max_x, max_y),
        ];

        let cols = corners.iter().map(|(c, _)| *c);
        let rows = corners.iter().map(|(_, r)| *r);

        PixelWindow {
            row_start: rows.clone().fold(f64::INFINITY, f64::min).floor() as isize,
            row_end: rows.fold(f64::NEG_INFINITY, f64::max).ceil() as isize,
            col_start: cols.clone().fold(f64::INFINITY, f64::min).floor() as isize,
            col_end: cols.fold(f64::NEG_INFINITY, f64::max).ceil() as isize,
        }
    }

    /// Clamp a window to the raster extent. Empty when disjoint.
    pub fn clip(&self, window: PixelWindow) -> PixelWindow {
        PixelWindow {
            row_start: window.row_start.max(0),
            row_end: window.row_end.min(self.raster.rows() as isize - 1),
            col_start: window.col_start.max(0),
            col_end: window.col_end.min(self.raster.cols() as isize - 1),
        }
    }

    /// Read a window row-major, padding beyond-extent cells with the
    /// effective nodata value.
    pub fn read_window(&self, window: PixelWindow) -> Vec<f64> {
        let width = window.width();
        let height = window.height();
        let fill = self.effective_nodata();
        let mut out = vec![fill; width * height];
        let data = self.raster.data();

        let overlap = self.clip(window);
        if overlap.is_empty() {
            return out;
        }

        let dst_row_off = (overlap.row_start - window.row_start) as usize;
        let dst_col_off = (overlap.col_start - window.col_start) as usize;
        for (i, src_row) in (overlap.row_start..=overlap.row_end).enumerate() {
            let dst_start = (dst_row_off + i) * width + dst_col_off;
            for (j, src_col) in (overlap.col_start..=overlap.col_end).enumerate() {
                out[dst_start + j] = data[(src_row as usize, src_col as usize)];
            }
        }
        out
    }

    /// Transform describing a window's world placement
    pub fn window_transform(&self, window: PixelWindow) -> GeoTransform {
        self.raster
            .transform()
            .window(window.col_start, window.row_start)
    }

    pub fn in_extent(&self, row: isize, col: isize) -> bool {
        row >= 0
            && col >= 0
            && row < self.raster.rows() as isize
            && col < self.raster.cols() as isize
    }

    /// Single-cell read resolving nodata and non-finite values to `None`
    pub fn sample(&self, row: isize, col: isize) -> Option<f64> {
        if !self.in_extent(row, col) {
            return None;
        }
        let v = self.raster.get(row as usize, col as usize).ok()?;
        if !v.is_finite() {
            return None;
        }
        if self
            .nodata
            .map(|n| (v - n).abs() <= f64::EPSILON)
            .unwrap_or(false)
        {
            return None;
        }
        Some(v)
    }
}

//! Windowed raster access for the fast engine

use std::path::Path;
use terrastat_core::error::{Error, Result};
use terrastat_core::io::read_geotiff;
use terrastat_core::raster::{GeoTransform, Raster};

/// A pixel-space read window with inclusive end indices. Indices may be
/// negative or beyond the raster extent; boundless reads pad those cells.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub row_start: isize,
    pub row_end: isize,
    pub col_start: isize,
    pub col_end: isize,
}

impl Window {
    pub fn is_inverted(&self) -> bool {
        self.row_end < self.row_start || self.col_end < self.col_start
    }
}

/// An opened raster with the plumbing the fast engine needs: fractional
/// world-to-pixel mapping, boundless windowed reads, and single-value
/// lookups with nodata resolution.
pub struct RasterContext {
    raster: Raster<f64>,
    pub nodata: Option<f64>,
}

impl RasterContext {
    pub fn open(path: &Path, band: usize, nodata: Option<f64>) -> Result<Self> {
        if band < 1 {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: "band indexes are 1-based".to_string(),
            });
        }
        if band > 1 {
            return Err(Error::InvalidInput(format!(
                "{}: band {band} out of range; native GeoTIFF sources are single-band",
                path.display()
            )));
        }

        let raster: Raster<f64> = read_geotiff(path)?;
        if !raster.transform().is_invertible() {
            return Err(Error::Raster(format!(
                "{}: raster geotransform is not invertible",
                path.display()
            )));
        }

        let nodata = nodata.or_else(|| raster.nodata());
        Ok(Self { raster, nodata })
    }

    pub fn width(&self) -> usize {
        self.raster.cols()
    }

    pub fn height(&self) -> usize {
        self.raster.rows()
    }

    /// Fractional (col, row) for a world coordinate
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.raster.geo_to_pixel(x, y)
    }

    pub fn is_inside(&self, row: isize, col: isize) -> bool {
        row >= 0 && row < self.height() as isize && col >= 0 && col < self.width() as isize
    }

    /// Single-cell read resolving nodata and non-finite cells to `None`.
    /// Out-of-extent reads are `None` whether or not the request is
    /// boundless; boundless only widens what windowed reads may cover.
    pub fn read_value(&self, row: isize, col: isize) -> Option<f64> {
        if !self.is_inside(row, col) {
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

    /// Unclipped pixel window covering a world-space bounding box
    pub fn window_for_bounds_unclipped(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Window {
        let corners = [
            self.world_to_pixel(min_x, min_y),
            self.world_to_pixel(min_x, max_y),
            self.world_to_pixel(max_x, min_y),
            self.world_to_pixel(max_x, max_y),
        ];

        let min_col = corners
            .iter()
            .map(|(c, _)| *c)
            .fold(f64::INFINITY, f64::min)
            .floor() as isize;
        let max_col = corners
            .iter()
            .map(|(c, _)| *c)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil() as isize;
        let min_row = corners
            .iter()
            .map(|(_, r)| *r)
            .fold(f64::INFINITY, f64::min)
            .floor() as isize;
        let max_row = corners
            .iter()
            .map(|(_, r)| *r)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil() as isize;

        Window {
            row_start: min_row,
            row_end: max_row,
            col_start: min_col,
            col_end: max_col,
        }
    }

    /// Transform describing the window's placement in world space
    pub fn window_transform(&self, window: Window) -> GeoTransform {
        self.raster
            .transform()
            .window(window.col_start, window.row_start)
    }

    pub fn window_beyond_extent(&self, window: Window) -> bool {
        window.row_start < 0
            || window.col_start < 0
            || window.row_end >= self.height() as isize
            || window.col_end >= self.width() as isize
    }

    fn clip_window(&self, window: Window) -> Option<Window> {
        let clipped = Window {
            row_start: window.row_start.max(0),
            row_end: window.row_end.min((self.height() as isize) - 1),
            col_start: window.col_start.max(0),
            col_end: window.col_end.min((self.width() as isize) - 1),
        };
        if clipped.is_inverted() {
            None
        } else {
            Some(clipped)
        }
    }

    /// Read a window as a row-major buffer, padding cells beyond the
    /// raster extent with `fill_nodata`. Non-boundless requests reject
    /// windows that reach past the extent.
    pub fn read_window_boundless(
        &self,
        window: Window,
        boundless: bool,
        fill_nodata: f64,
    ) -> Result<(usize, usize, Vec<f64>)> {
        if window.is_inverted() {
            return Ok((0, 0, Vec::new()));
        }

        if self.window_beyond_extent(window) && !boundless {
            return Err(Error::InvalidInput(
                "window reaches outside the raster extent and boundless reads are disabled"
                    .to_string(),
            ));
        }

        let width = (window.col_end - window.col_start + 1) as usize;
        let height = (window.row_end - window.row_start + 1) as usize;
        let mut out = vec![fill_nodata; width * height];

        let Some(overlap) = self.clip_window(window) else {
            return Ok((width, height, out));
        };

        let dst_row_off = (overlap.row_start - window.row_start) as usize;
        let dst_col_off = (overlap.col_start - window.col_start) as usize;
        let data = self.raster.data();

        for (i, src_row) in (overlap.row_start..=overlap.row_end).enumerate() {
            let dst_start = (dst_row_off + i) * width + dst_col_off;
            for (j, src_col) in (overlap.col_start..=overlap.col_end).enumerate() {
                out[dst_start + j] = data[(src_row as usize, src_col as usize)];
            }
        }

        Ok((width, height, out))
    }
}

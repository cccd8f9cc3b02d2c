//! Error types shared across the terrastat workspace

use thiserror::Error;

/// Main error type for terrastat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied input is malformed or inconsistent. This is the only
    /// error category a caller of the dispatch layer ever observes; both
    /// engines raise it identically for the same input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("raster error: {0}")]
    Raster(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for terrastat operations
pub type Result<T> = std::result::Result<T, Error>;

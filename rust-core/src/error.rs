//! Error types shared by the windowing, accumulation and pipeline stages

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the spectral averaging core
#[derive(Error, Debug)]
pub enum SpectraError {
    /// Invalid window length, sampling frequency, taper or channel set.
    /// Always detected at construction, never mid-run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sample array or batch column had the wrong number of rows
    #[error("shape mismatch for {context}: expected {expected} samples, got {actual}")]
    Shape {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A logged cell could not be unwrapped to a single scalar
    #[error("cell at row {row} of channel '{channel}' is not a scalar")]
    CellShape { channel: String, row: usize },

    /// Spectrum requested before any full window was accumulated
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Failure reported by the column store, passed through unchanged
    #[error(transparent)]
    Upstream(#[from] StoreError),

    /// FFT backend rejected a buffer
    #[error("transform failed: {0}")]
    Transform(String),
}

impl SpectraError {
    /// True for both sample-count and cell-unwrap failures
    pub fn is_shape_error(&self) -> bool {
        matches!(self, SpectraError::Shape { .. } | SpectraError::CellShape { .. })
    }
}

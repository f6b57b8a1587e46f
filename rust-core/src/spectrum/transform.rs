//! Frequency transforms an accumulator can average

use serde::{Deserialize, Serialize};

use super::fft::FftEngine;
use crate::error::SpectraError;

/// Closed set of per-window transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Scaled amplitude spectrum `|2 F[k] / N|`
    Magnitude,
    /// One-sided periodogram, power per Hz
    Periodogram,
}

impl Transform {
    /// Map a tapered window of length N to N/2 + 1 bins
    ///
    /// The engine only supplies scratch space; the result depends on
    /// `signal` and `sampling_freq` alone.
    pub fn apply(
        self,
        engine: &mut FftEngine,
        signal: &[f64],
        sampling_freq: f64,
    ) -> Result<Vec<f64>, SpectraError> {
        match self {
            Transform::Magnitude => engine.scaled_magnitude(signal),
            Transform::Periodogram => engine.periodogram(signal, sampling_freq),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Transform::Magnitude => "magnitude",
            Transform::Periodogram => "psd",
        }
    }
}

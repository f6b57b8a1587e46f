//! Taper (window) functions applied before each transform
//!
//! Coefficients use the periodic (DFT-even) form: the cosine terms have
//! period N rather than N-1, which is the usual choice for spectral
//! estimation as opposed to filter design.

use std::f64::consts::PI;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::SpectraError;

/// Built-in taper shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaperKind {
    /// Flat window, no weighting
    #[default]
    Boxcar,

    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/N)
    /// Sidelobe attenuation: ~31 dB
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/N)
    /// Sidelobe attenuation: ~43 dB
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/N) + 0.08*cos(4πn/N)
    /// Sidelobe attenuation: ~58 dB
    Blackman,
}

impl TaperKind {
    /// Generate `length` coefficients of this shape
    pub fn coefficients(self, length: usize) -> Vec<f64> {
        let m = length as f64;
        let cosine_sum = |a0: f64, a1: f64, a2: f64| -> Vec<f64> {
            (0..length)
                .map(|n| {
                    let angle = 2.0 * PI * n as f64 / m;
                    a0 - a1 * angle.cos() + a2 * (2.0 * angle).cos()
                })
                .collect()
        };

        match self {
            TaperKind::Boxcar => vec![1.0; length],
            TaperKind::Hann => cosine_sum(0.5, 0.5, 0.0),
            TaperKind::Hamming => cosine_sum(0.54, 0.46, 0.0),
            TaperKind::Blackman => cosine_sum(0.42, 0.5, 0.08),
        }
    }
}

/// A fixed set of taper coefficients for one window length
#[derive(Debug, Clone, PartialEq)]
pub struct Taper {
    coefficients: Array1<f64>,
}

impl Taper {
    /// Build a taper of the given shape and length
    pub fn new(kind: TaperKind, length: usize) -> Self {
        Self {
            coefficients: Array1::from(kind.coefficients(length)),
        }
    }

    /// Use caller-supplied coefficients
    pub fn from_coefficients(coefficients: Vec<f64>) -> Result<Self, SpectraError> {
        if coefficients.is_empty() {
            return Err(SpectraError::Configuration("taper must not be empty".to_string()));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SpectraError::Configuration(
                "taper coefficients must be finite".to_string(),
            ));
        }
        Ok(Self {
            coefficients: Array1::from(coefficients),
        })
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Multiply `signal` element-wise by the taper
    ///
    /// Lengths are checked by the caller.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        signal
            .iter()
            .zip(self.coefficients.iter())
            .map(|(&s, &w)| s * w)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxcar_is_flat() {
        let taper = Taper::new(TaperKind::Boxcar, 100);
        assert_eq!(taper.len(), 100);
        assert!(taper.coefficients().iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_periodic_hann() {
        let n = 16;
        let w = TaperKind::Hann.coefficients(n);

        assert_eq!(w.len(), n);
        assert!(w[0].abs() < 1e-12);
        // periodic form peaks at N/2 and is not symmetric about the last sample
        assert!((w[n / 2] - 1.0).abs() < 1e-12);
        assert!((w[1] - w[n - 1]).abs() < 1e-12);
        assert!(w[n - 1] > 0.0);
    }

    #[test]
    fn test_hamming_and_blackman_endpoints() {
        let hamming = TaperKind::Hamming.coefficients(64);
        let blackman = TaperKind::Blackman.coefficients(64);

        assert!((hamming[0] - 0.08).abs() < 1e-12);
        assert!(blackman[0].abs() < 1e-12);
        assert!((blackman[32] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply() {
        let taper = Taper::from_coefficients(vec![0.0, 0.5, 1.0, 2.0]).unwrap();
        assert_eq!(taper.apply(&[4.0, 4.0, 4.0, 4.0]), vec![0.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_rejects_bad_coefficients() {
        assert!(Taper::from_coefficients(vec![]).is_err());
        assert!(Taper::from_coefficients(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_kind_from_config_name() {
        let kind: TaperKind = serde_json::from_str("\"hann\"").unwrap();
        assert_eq!(kind, TaperKind::Hann);
        assert_eq!(TaperKind::default(), TaperKind::Boxcar);
    }
}

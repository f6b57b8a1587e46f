//! Running average of a per-window frequency transform
//!
//! One accumulator per (channel, transform) pair. Every full window adds its
//! transform to a running sum; the average is taken only when the spectrum is
//! read. All windows carry equal weight.

use ndarray::{Array1, ArrayView1};
use serde::Serialize;

use super::fft::{frequency_axis, FftEngine};
use super::taper::Taper;
use super::transform::Transform;
use crate::error::SpectraError;

/// Averaged one-sided spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Bin centre frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Averaged transform values, one per bin
    pub values: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Strongest non-DC bin as `(frequency, value)`
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(&self.values)
            .skip(1)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(&f, &v)| (f, v))
    }
}

/// Running-average state for one channel and one transform
pub struct SpectralAccumulator {
    label: String,
    window_length: usize,
    sampling_freq: f64,
    transform: Transform,
    taper: Taper,
    engine: FftEngine,
    running_sum: Array1<f64>,
    iterations: usize,
}

impl SpectralAccumulator {
    /// Create an empty accumulator
    ///
    /// # Arguments
    /// * `label` - Name used in error messages (usually the channel)
    /// * `window_length` - Samples per window (N)
    /// * `sampling_freq` - Sampling frequency in Hz
    /// * `transform` - Per-window transform to average
    /// * `taper` - Window applied before the transform, length N
    pub fn new(
        label: impl Into<String>,
        window_length: usize,
        sampling_freq: f64,
        transform: Transform,
        taper: Taper,
    ) -> Result<Self, SpectraError> {
        if window_length == 0 {
            return Err(SpectraError::Configuration(
                "window length must be greater than zero".to_string(),
            ));
        }
        if !(sampling_freq.is_finite() && sampling_freq > 0.0) {
            return Err(SpectraError::Configuration(format!(
                "sampling frequency must be positive, got {}",
                sampling_freq
            )));
        }
        if taper.len() != window_length {
            return Err(SpectraError::Configuration(format!(
                "taper has {} coefficients, window length is {}",
                taper.len(),
                window_length
            )));
        }

        Ok(Self {
            label: label.into(),
            window_length,
            sampling_freq,
            transform,
            taper,
            engine: FftEngine::new(window_length),
            running_sum: Array1::zeros(window_length / 2 + 1),
            iterations: 0,
        })
    }

    /// Add one window to the average
    ///
    /// Fails without touching the running state when `signal` is not exactly
    /// N samples long.
    pub fn update(&mut self, signal: &[f64]) -> Result<(), SpectraError> {
        if signal.len() != self.window_length {
            return Err(SpectraError::Shape {
                context: format!("{} {} update", self.label, self.transform.label()),
                expected: self.window_length,
                actual: signal.len(),
            });
        }

        let tapered = self.taper.apply(signal);
        let result = self
            .transform
            .apply(&mut self.engine, &tapered, self.sampling_freq)?;

        self.running_sum += &ArrayView1::from(result.as_slice());
        self.iterations += 1;
        Ok(())
    }

    /// Current average and its frequency axis
    pub fn spectrum(&self) -> Result<Spectrum, SpectraError> {
        if self.iterations == 0 {
            return Err(SpectraError::InvalidState(format!(
                "no windows accumulated for {} {}",
                self.label,
                self.transform.label()
            )));
        }

        let values = &self.running_sum / self.iterations as f64;
        Ok(Spectrum {
            frequencies: frequency_axis(self.window_length, self.sampling_freq),
            values: values.to_vec(),
        })
    }

    /// Number of windows accumulated
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn sampling_freq(&self) -> f64 {
        self.sampling_freq
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::taper::TaperKind;
    use std::f64::consts::PI;

    fn boxcar(n: usize) -> Taper {
        Taper::new(TaperKind::Boxcar, n)
    }

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        // small LCG, deterministic across runs
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            SpectralAccumulator::new("x", 0, 200.0, Transform::Magnitude, boxcar(0)),
            Err(SpectraError::Configuration(_))
        ));
        assert!(matches!(
            SpectralAccumulator::new("x", 8, 0.0, Transform::Magnitude, boxcar(8)),
            Err(SpectraError::Configuration(_))
        ));
        assert!(matches!(
            SpectralAccumulator::new("x", 8, f64::NAN, Transform::Magnitude, boxcar(8)),
            Err(SpectraError::Configuration(_))
        ));
        assert!(matches!(
            SpectralAccumulator::new("x", 8, 200.0, Transform::Periodogram, boxcar(7)),
            Err(SpectraError::Configuration(_))
        ));
    }

    #[test]
    fn test_spectrum_before_update_is_invalid_state() {
        let acc = SpectralAccumulator::new("x", 16, 200.0, Transform::Magnitude, boxcar(16)).unwrap();
        assert!(matches!(acc.spectrum(), Err(SpectraError::InvalidState(_))));
    }

    #[test]
    fn test_repeated_identical_updates_average_to_single_transform() {
        let n = 64;
        let fs = 200.0;
        let x = noise(n, 7);
        let taper = Taper::new(TaperKind::Hann, n);

        for transform in [Transform::Magnitude, Transform::Periodogram] {
            let mut engine = FftEngine::new(n);
            let expected = transform.apply(&mut engine, &taper.apply(&x), fs).unwrap();

            for k in [1usize, 3, 10] {
                let mut acc = SpectralAccumulator::new("x", n, fs, transform, taper.clone()).unwrap();
                for _ in 0..k {
                    acc.update(&x).unwrap();
                }
                let spectrum = acc.spectrum().unwrap();
                assert_eq!(acc.iterations(), k);
                for (got, want) in spectrum.values.iter().zip(&expected) {
                    assert!((got - want).abs() <= 1e-12 * want.abs().max(1e-12));
                }
            }
        }
    }

    #[test]
    fn test_average_is_order_independent() {
        let n = 32;
        let windows: Vec<Vec<f64>> = (0..5).map(|s| noise(n, s)).collect();

        let mut forward = SpectralAccumulator::new("x", n, 100.0, Transform::Periodogram, boxcar(n)).unwrap();
        let mut reverse = SpectralAccumulator::new("x", n, 100.0, Transform::Periodogram, boxcar(n)).unwrap();
        for w in &windows {
            forward.update(w).unwrap();
        }
        for w in windows.iter().rev() {
            reverse.update(w).unwrap();
        }

        let a = forward.spectrum().unwrap();
        let b = reverse.spectrum().unwrap();
        for (x, y) in a.values.iter().zip(&b.values) {
            assert!((x - y).abs() <= 1e-12 * x.abs().max(1e-12));
        }
    }

    #[test]
    fn test_frequency_axis() {
        let n = 1024;
        let fs = 200.0;
        let mut acc = SpectralAccumulator::new("x", n, fs, Transform::Magnitude, boxcar(n)).unwrap();
        acc.update(&noise(n, 1)).unwrap();
        let freqs = acc.spectrum().unwrap().frequencies;

        assert_eq!(freqs.len(), n / 2 + 1);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[n / 2] - fs / 2.0).abs() < 1e-12);
        for pair in freqs.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!((pair[1] - pair[0] - fs / n as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tone_recovery() {
        let n = 512;
        let fs = 200.0;
        let amplitude = 0.75;
        let bin = 40;
        let freq = bin as f64 * fs / n as f64;
        let signal: Vec<f64> = (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs + 0.3).sin())
            .collect();

        let mut acc = SpectralAccumulator::new("x", n, fs, Transform::Magnitude, boxcar(n)).unwrap();
        acc.update(&signal).unwrap();
        let spectrum = acc.spectrum().unwrap();

        assert!((spectrum.values[bin] - amplitude).abs() < 1e-9);
        for (k, v) in spectrum.values.iter().enumerate() {
            if k != bin {
                assert!(*v < 1e-9, "bin {} has {}", k, v);
            }
        }
        let (peak_freq, _) = spectrum.peak().unwrap();
        assert!((peak_freq - freq).abs() < 1e-12);
    }

    #[test]
    fn test_shape_rejection_leaves_state_unchanged() {
        let n = 32;
        let x = noise(n, 3);
        let y = noise(n, 4);

        let mut clean = SpectralAccumulator::new("x", n, 100.0, Transform::Magnitude, boxcar(n)).unwrap();
        clean.update(&x).unwrap();
        clean.update(&y).unwrap();

        let mut disturbed = SpectralAccumulator::new("x", n, 100.0, Transform::Magnitude, boxcar(n)).unwrap();
        disturbed.update(&x).unwrap();
        let err = disturbed.update(&y[..n - 1]).unwrap_err();
        assert!(matches!(err, SpectraError::Shape { expected: 32, actual: 31, .. }));
        assert_eq!(disturbed.iterations(), 1);
        let mut longer = y.clone();
        longer.push(0.0);
        assert!(disturbed.update(&longer).is_err());
        disturbed.update(&y).unwrap();

        assert_eq!(disturbed.iterations(), 2);
        assert_eq!(clean.spectrum().unwrap(), disturbed.spectrum().unwrap());
    }
}

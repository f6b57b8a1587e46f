//! FFT engine using realfft for real-valued signals
//!
//! Produces the one-sided (0 .. Nyquist) spectrum of a fixed-length window

use std::sync::Arc;

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::SpectraError;

/// FFT engine for real-valued signals of one fixed length
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer, overwritten by every transform
    input_buffer: Vec<f64>,

    /// Reusable output buffer (one-sided complex spectrum)
    output_buffer: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples), any non-zero length
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
        }
    }

    /// Compute the one-sided DFT of `signal`
    ///
    /// # Returns
    /// `F[k]` for k = 0..fft_size/2, unscaled
    pub fn forward(&mut self, signal: &[f64]) -> Result<&[Complex<f64>], SpectraError> {
        if signal.len() != self.fft_size {
            return Err(SpectraError::Shape {
                context: "FFT input".to_string(),
                expected: self.fft_size,
                actual: signal.len(),
            });
        }
        self.input_buffer.copy_from_slice(signal);

        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)
            .map_err(|e| SpectraError::Transform(e.to_string()))?;

        Ok(&self.output_buffer)
    }

    /// Amplitude spectrum `|2 F[k] / N|`
    ///
    /// A sinusoid centred on a bin reads out as its peak amplitude.
    pub fn scaled_magnitude(&mut self, signal: &[f64]) -> Result<Vec<f64>, SpectraError> {
        let n = self.fft_size as f64;
        let spectrum = self.forward(signal)?;
        Ok(spectrum.iter().map(|c| 2.0 * c.norm() / n).collect())
    }

    /// One-sided periodogram in power per Hz
    ///
    /// The mean of `signal` is removed first, so a tapered window never leaks
    /// its residual offset into DC. Then `|F[k]|^2 / (fs N)`, with every bin
    /// except DC and (for even N) Nyquist doubled to fold in the negative
    /// frequencies.
    pub fn periodogram(&mut self, signal: &[f64], sampling_freq: f64) -> Result<Vec<f64>, SpectraError> {
        let n = self.fft_size;
        let scale = 1.0 / (sampling_freq * n as f64);
        let mean = signal.iter().sum::<f64>() / signal.len().max(1) as f64;
        let detrended: Vec<f64> = signal.iter().map(|x| x - mean).collect();
        let spectrum = self.forward(&detrended)?;

        let mut psd: Vec<f64> = spectrum.iter().map(|c| c.norm_sqr() * scale).collect();

        let last_doubled = if n % 2 == 0 { psd.len() - 1 } else { psd.len() };
        for p in psd.iter_mut().take(last_doubled).skip(1) {
            *p *= 2.0;
        }
        Ok(psd)
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Bin centre frequencies in Hz: `k * fs / N` for k = 0..N/2
pub fn frequency_axis(fft_size: usize, sampling_freq: f64) -> Vec<f64> {
    let step = sampling_freq / fft_size as f64;
    (0..fft_size / 2 + 1).map(|k| k as f64 * step).collect()
}

//! Python bindings for spectral averaging

use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::spectrum::{SpectralAccumulator, Spectrum, Taper, TaperKind, Transform};

/// Taper shape exposed to Python
#[pyclass(name = "Taper")]
#[derive(Clone)]
pub enum PyTaper {
    Boxcar,
    Hann,
    Hamming,
    Blackman,
}

impl From<PyTaper> for TaperKind {
    fn from(py_taper: PyTaper) -> Self {
        match py_taper {
            PyTaper::Boxcar => TaperKind::Boxcar,
            PyTaper::Hann => TaperKind::Hann,
            PyTaper::Hamming => TaperKind::Hamming,
            PyTaper::Blackman => TaperKind::Blackman,
        }
    }
}

/// Convert a spectrum into a `(frequencies, values)` tuple of numpy arrays
pub(crate) fn spectrum_tuple<'py>(
    py: Python<'py>,
    spectrum: &Spectrum,
) -> (&'py PyArray1<f64>, &'py PyArray1<f64>) {
    (
        PyArray1::from_slice(py, &spectrum.frequencies),
        PyArray1::from_slice(py, &spectrum.values),
    )
}

/// Running spectral average exposed to Python
#[pyclass(name = "SpectralAccumulator")]
pub struct PySpectralAccumulator {
    accumulator: SpectralAccumulator,
}

#[pymethods]
impl PySpectralAccumulator {
    /// Create a new accumulator
    ///
    /// Args:
    ///     window_length: Samples per window (N)
    ///     sampling_frequency: Sampling frequency in Hz
    ///     kind: "magnitude" or "psd"
    ///     taper: Taper applied before each transform
    #[new]
    #[pyo3(signature = (window_length, sampling_frequency, kind="magnitude", taper=PyTaper::Boxcar))]
    fn new(
        window_length: usize,
        sampling_frequency: f64,
        kind: &str,
        taper: PyTaper,
    ) -> PyResult<Self> {
        let transform = match kind {
            "magnitude" => Transform::Magnitude,
            "psd" | "periodogram" => Transform::Periodogram,
            other => {
                return Err(PyValueError::new_err(format!(
                    "unknown spectrum kind '{}', expected 'magnitude' or 'psd'",
                    other
                )))
            }
        };
        let taper = Taper::new(taper.into(), window_length);
        let accumulator = SpectralAccumulator::new(
            "python",
            window_length,
            sampling_frequency,
            transform,
            taper,
        )?;

        Ok(Self { accumulator })
    }

    /// Add one window to the average
    ///
    /// Args:
    ///     signal: numpy array of exactly window_length samples
    fn update(&mut self, signal: PyReadonlyArray1<f64>) -> PyResult<()> {
        let samples = signal.as_array().to_vec();
        self.accumulator.update(&samples)?;
        Ok(())
    }

    /// Averaged spectrum
    ///
    /// Returns:
    ///     Tuple of (frequencies in Hz, averaged values) numpy arrays
    fn spectrum<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let spectrum = self.accumulator.spectrum()?;
        Ok(spectrum_tuple(py, &spectrum))
    }

    /// Number of windows accumulated so far
    #[getter]
    fn iterations(&self) -> usize {
        self.accumulator.iterations()
    }

    /// Window length N
    #[getter]
    fn window_length(&self) -> usize {
        self.accumulator.window_length()
    }
}

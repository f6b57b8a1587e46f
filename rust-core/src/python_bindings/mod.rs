//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::SpectraError;

mod run_bindings;
mod spectrum_bindings;

impl From<SpectraError> for PyErr {
    fn from(err: SpectraError) -> Self {
        match err {
            SpectraError::Configuration(_)
            | SpectraError::Shape { .. }
            | SpectraError::CellShape { .. } => PyValueError::new_err(err.to_string()),
            SpectraError::InvalidState(_) | SpectraError::Transform(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            SpectraError::Upstream(_) => PyIOError::new_err(err.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn vibespec(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrum_bindings::PySpectralAccumulator>()?;
    m.add_class::<spectrum_bindings::PyTaper>()?;
    m.add_function(wrap_pyfunction!(run_bindings::run, m)?)?;

    Ok(())
}

//! Python entry point for a complete configured run

use std::path::Path;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::spectrum_bindings::spectrum_tuple;
use crate::pipeline::{analyze, RunConfig};
use crate::store::CsvStore;

/// Run the analysis described by a TOML config file
///
/// Args:
///     config_path: Path to the run configuration
///
/// Returns:
///     Dict mapping channel name to {"magnitude": (freqs, values) | None,
///     "psd": (freqs, values) | None}
#[pyfunction]
pub fn run(py: Python<'_>, config_path: &str) -> PyResult<PyObject> {
    let config = RunConfig::load(Path::new(config_path))
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let store = CsvStore::new(&config.source.path).with_batch_rows(config.source.batch_rows);
    let query = config.query();

    let outcome = py.allow_threads(|| analyze(&store, &query, &config.analysis))?;

    let result = PyDict::new(py);
    for ch in &outcome.channels {
        let entry = PyDict::new(py);
        entry.set_item("magnitude", ch.magnitude.as_ref().map(|s| spectrum_tuple(py, s)))?;
        entry.set_item("psd", ch.psd.as_ref().map(|s| spectrum_tuple(py, s)))?;
        result.set_item(&ch.channel, entry)?;
    }
    Ok(result.to_object(py))
}

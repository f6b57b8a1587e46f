//! Vibespec - Streaming Spectral Averaging Core
//!
//! Pulls multichannel sensor logs from a columnar store in bounded batches,
//! re-chunks them into fixed-length windows and keeps a running average of
//! the amplitude spectrum and periodogram of every channel.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod error;
pub mod pipeline;
pub mod report;
pub mod spectrum;
pub mod store;
pub mod window;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use error::SpectraError;
pub use pipeline::{analyze, AnalysisSettings, RunConfig, RunOutcome};
pub use spectrum::{SpectralAccumulator, Spectrum, TaperKind, Transform};
pub use store::{ColumnStore, CsvStore, MemoryStore};
pub use window::{Window, WindowAssembler};

//! End-to-end run: store query, window assembly, per-channel averaging

pub mod config;
pub mod orchestrator;

pub use config::{AnalysisSettings, ConfigError, OutputConfig, RunConfig, SourceConfig};
pub use orchestrator::{remove_mean, ChannelSpectra, Pipeline, RunSummary, StopReason};

use serde::Serialize;

use crate::error::SpectraError;
use crate::store::{ColumnStore, Query};
use crate::window::WindowAssembler;

/// Everything a run hands to the render boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub channels: Vec<ChannelSpectra>,
}

/// Run the whole analysis over one store query
///
/// Settings are validated before the store is queried.
pub fn analyze<S: ColumnStore>(
    store: &S,
    query: &Query,
    settings: &AnalysisSettings,
) -> Result<RunOutcome, SpectraError> {
    let names: Vec<String> = query.channels.iter().map(|c| c.name.clone()).collect();
    let mut pipeline = Pipeline::new(&names, settings)?;

    let windows = WindowAssembler::open(store, query, settings.window_length)?;
    let summary = pipeline.run(windows)?;

    Ok(RunOutcome {
        summary,
        channels: pipeline.spectra()?,
    })
}

//! Run configuration loaded from TOML
//!
//! ```toml
//! [source]
//! path = "day.csv"
//! timeline = "rel_system_time"
//! range = [3600.0, 10800.0]
//!
//! [[source.channels]]
//! name = "/sensors/icm42688/accel_m_s2/x"
//!
//! [analysis]
//! window_length = 16384
//! sampling_frequency = 200.0
//! taper = "boxcar"
//! max_iterations = 50000
//!
//! [output]
//! directory = "spectra"
//! format = "csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::report::{find_stem_collision, ReportFormat};
use crate::spectrum::TaperKind;
use crate::store::csv_file::DEFAULT_BATCH_ROWS;
use crate::store::{ChannelSelector, Query, TimeRange};

/// Errors raised while loading or validating a run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Complete description of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the sensor log comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// CSV export of the log
    pub path: PathBuf,
    /// Timeline (index) column, in seconds
    pub timeline: String,
    /// Rows pulled from the file per upstream batch
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,
    /// Optional half-open `[start, end)` timeline range in seconds
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    pub channels: Vec<ChannelSelector>,
}

fn default_batch_rows() -> usize {
    DEFAULT_BATCH_ROWS
}

/// Parameters shared by every channel's accumulators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Samples per window (N)
    pub window_length: usize,
    /// Sampling frequency in Hz
    pub sampling_frequency: f64,
    pub taper: TaperKind,
    /// Upper bound on full windows processed
    pub max_iterations: usize,
    /// Log an info-level progress line every this many windows
    pub progress_every: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window_length: 1 << 14,
            sampling_frequency: 200.0,
            taper: TaperKind::Boxcar,
            max_iterations: 50_000,
            progress_every: 100,
        }
    }
}

impl AnalysisSettings {
    /// Collect every problem with these settings
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.window_length == 0 {
            problems.push("analysis.window_length must be greater than zero".to_string());
        }
        if !(self.sampling_frequency.is_finite() && self.sampling_frequency > 0.0) {
            problems.push(format!(
                "analysis.sampling_frequency must be positive, got {}",
                self.sampling_frequency
            ));
        }
        if self.max_iterations == 0 {
            problems.push("analysis.max_iterations must be at least 1".to_string());
        }
        if self.progress_every == 0 {
            problems.push("analysis.progress_every must be at least 1".to_string());
        }
        problems
    }
}

/// Where finished spectra are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: ReportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("spectra"),
            format: ReportFormat::Csv,
        }
    }
}

impl RunConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        info!(
            path = %path.display(),
            channels = config.source.channels.len(),
            window_length = config.analysis.window_length,
            "Loaded run config"
        );
        Ok(config)
    }

    /// Check every field, reporting all problems at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = self.analysis.problems();

        if self.source.batch_rows == 0 {
            problems.push("source.batch_rows must be at least 1".to_string());
        }
        if self.source.timeline.trim().is_empty() {
            problems.push("source.timeline must not be empty".to_string());
        }
        if self.source.channels.is_empty() {
            problems.push("source.channels must list at least one channel".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        let mut distinct = Vec::with_capacity(self.source.channels.len());
        for channel in &self.source.channels {
            if seen.insert(channel.name.as_str()) {
                distinct.push(channel.name.as_str());
            } else {
                problems.push(format!("channel '{}' is listed more than once", channel.name));
            }
        }
        if self.output.format == ReportFormat::Csv {
            if let Some((stem, first, second)) = find_stem_collision(distinct) {
                problems.push(format!(
                    "channels '{}' and '{}' would share the report file stem '{}'",
                    first, second, stem
                ));
            }
        }
        if let Some([start, end]) = self.source.range {
            if !(start.is_finite() && end.is_finite() && start < end) {
                problems.push(format!(
                    "source.range must satisfy start < end, got [{}, {}]",
                    start, end
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Upstream query described by the `[source]` section
    pub fn query(&self) -> Query {
        Query {
            timeline: self.source.timeline.clone(),
            channels: self.source.channels.clone(),
            range: self.source.range.map(|[start, end]| TimeRange::new(start, end)),
        }
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.source.channels.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [source]
        path = "day.csv"
        timeline = "rel_system_time"

        [[source.channels]]
        name = "/sensors/icm42688/accel_m_s2/x"

        [[source.channels]]
        name = "/sensors/icm42688/ang_vel_deg_s/z"
        component = "Scalar"
    "#;

    #[test]
    fn test_defaults() {
        let config: RunConfig = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.analysis, AnalysisSettings::default());
        assert_eq!(config.analysis.window_length, 16384);
        assert_eq!(config.source.batch_rows, DEFAULT_BATCH_ROWS);
        assert_eq!(config.output.format, ReportFormat::Csv);
        assert_eq!(config.source.channels[0].component, "Scalar");

        // no range configured means no filter
        assert!(config.query().range.is_none());
    }

    #[test]
    fn test_full_config() {
        let text = format!(
            "{}\n{}",
            MINIMAL.replace(
                "timeline = \"rel_system_time\"",
                "timeline = \"rel_system_time\"\nrange = [3600.0, 10800.0]\nbatch_rows = 512"
            ),
            r#"
            [analysis]
            window_length = 1024
            sampling_frequency = 400.0
            taper = "hann"
            max_iterations = 10

            [output]
            directory = "out"
            format = "json"
            "#
        );
        let config: RunConfig = toml::from_str(&text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.analysis.taper, TaperKind::Hann);
        assert_eq!(config.analysis.progress_every, 100);
        assert_eq!(config.source.batch_rows, 512);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert_eq!(config.query().range, Some(TimeRange::new(3600.0, 10800.0)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let text = MINIMAL.replace("path = \"day.csv\"", "path = \"day.csv\"\npaht = 1");
        assert!(toml::from_str::<RunConfig>(&text).is_err());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let mut config: RunConfig = toml::from_str(MINIMAL).unwrap();
        config.analysis.window_length = 0;
        config.analysis.sampling_frequency = -1.0;
        config.source.range = Some([5.0, 5.0]);
        config.source.channels.push(config.source.channels[0].clone());

        match config.validate() {
            Err(ConfigError::Validation(problems)) => assert_eq!(problems.len(), 4),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_zero_batch_and_progress() {
        let mut config: RunConfig = toml::from_str(MINIMAL).unwrap();
        config.source.batch_rows = 0;
        config.analysis.progress_every = 0;

        match config.validate() {
            Err(ConfigError::Validation(problems)) => {
                assert_eq!(problems.len(), 2);
                assert!(problems.iter().any(|p| p.contains("source.batch_rows")));
                assert!(problems.iter().any(|p| p.contains("analysis.progress_every")));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_colliding_csv_stems() {
        let mut config: RunConfig = toml::from_str(MINIMAL).unwrap();
        config
            .source
            .channels
            .push(ChannelSelector::scalar("sensors_icm42688_accel_m_s2_x"));

        match config.validate() {
            Err(ConfigError::Validation(problems)) => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].contains("sensors_icm42688_accel_m_s2_x"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        // JSON output keys spectra by channel name, so no file clash
        config.output.format = ReportFormat::Json;
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = RunConfig::load(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

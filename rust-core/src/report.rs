//! Hand-off of finished spectra to external plotting tools

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::pipeline::{ChannelSpectra, RunOutcome};
use crate::spectrum::Spectrum;

/// Errors raised while writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channels '{first}' and '{second}' would both be written as '{stem}'")]
    StemCollision {
        stem: String,
        first: String,
        second: String,
    },
}

/// Output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One `frequency_hz,value` file per channel and spectrum kind
    Csv,
    /// A single `spectra.json` with the run summary and every spectrum
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

#[derive(Serialize)]
struct SpectrumRow {
    frequency_hz: f64,
    value: f64,
}

/// File-system friendly stem for a channel name
///
/// `/sensors/icm42688/accel_m_s2/x` becomes `sensors_icm42688_accel_m_s2_x`.
pub fn channel_file_stem(channel: &str) -> String {
    let stem: String = channel
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "channel".to_string()
    } else {
        stem
    }
}

/// First pair of channel names that share a file stem, if any
pub fn find_stem_collision<'a, I>(channels: I) -> Option<(String, &'a str, &'a str)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, &'a str> = HashMap::new();
    for channel in channels {
        let stem = channel_file_stem(channel);
        if let Some(&first) = seen.get(&stem) {
            return Some((stem, first, channel));
        }
        seen.insert(stem, channel);
    }
    None
}

fn create_dir(dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_spectrum_csv(path: &Path, spectrum: &Spectrum) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for (&frequency_hz, &value) in spectrum.frequencies.iter().zip(&spectrum.values) {
        writer.serialize(SpectrumRow { frequency_hz, value })?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Write one CSV per channel and kind into `dir`
///
/// Empty spectra produce no file. Fails before writing anything when two
/// channels map to the same file stem.
///
/// # Returns
/// Paths of the files written
pub fn write_csv(dir: &Path, channels: &[ChannelSpectra]) -> Result<Vec<PathBuf>, ReportError> {
    if let Some((stem, first, second)) = find_stem_collision(channels.iter().map(|c| c.channel.as_str())) {
        return Err(ReportError::StemCollision {
            stem,
            first: first.to_string(),
            second: second.to_string(),
        });
    }
    create_dir(dir)?;
    let mut written = Vec::new();

    for ch in channels {
        let stem = channel_file_stem(&ch.channel);
        for (kind, spectrum) in [("magnitude", &ch.magnitude), ("psd", &ch.psd)] {
            if let Some(spectrum) = spectrum {
                let path = dir.join(format!("{}.{}.csv", stem, kind));
                write_spectrum_csv(&path, spectrum)?;
                written.push(path);
            }
        }
    }

    info!(dir = %dir.display(), files = written.len(), "Wrote CSV spectra");
    Ok(written)
}

/// Write the whole outcome as `spectra.json` inside `dir`
pub fn write_json(dir: &Path, outcome: &RunOutcome) -> Result<PathBuf, ReportError> {
    create_dir(dir)?;
    let path = dir.join("spectra.json");
    let file = File::create(&path).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, outcome)?;
    writer.flush().map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "Wrote JSON spectra");
    Ok(path)
}

/// Write `outcome` in the requested format
pub fn write_report(
    dir: &Path,
    format: ReportFormat,
    outcome: &RunOutcome,
) -> Result<Vec<PathBuf>, ReportError> {
    match format {
        ReportFormat::Csv => write_csv(dir, &outcome.channels),
        ReportFormat::Json => write_json(dir, outcome).map(|p| vec![p]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunSummary, StopReason};

    fn outcome() -> RunOutcome {
        RunOutcome {
            summary: RunSummary {
                windows_processed: 2,
                rows_processed: 8,
                last_index: Some(0.035),
                stop_reason: StopReason::EndOfStream,
            },
            channels: vec![
                ChannelSpectra {
                    channel: "/imu/accel/x".into(),
                    magnitude: Some(Spectrum {
                        frequencies: vec![0.0, 50.0, 100.0],
                        values: vec![0.0, 1.5, 0.25],
                    }),
                    psd: None,
                },
                ChannelSpectra {
                    channel: "gyro z".into(),
                    magnitude: None,
                    psd: None,
                },
            ],
        }
    }

    #[test]
    fn test_channel_file_stem() {
        assert_eq!(
            channel_file_stem("/sensors/icm42688/accel_m_s2/x"),
            "sensors_icm42688_accel_m_s2_x"
        );
        assert_eq!(channel_file_stem("gyro z"), "gyro_z");
        assert_eq!(channel_file_stem("/"), "channel");
    }

    #[test]
    fn test_write_csv_skips_empty_spectra() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let files = write_csv(&out, &outcome().channels).unwrap();

        assert_eq!(files, vec![out.join("imu_accel_x.magnitude.csv")]);
        let text = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "frequency_hz,value");
        let row: Vec<f64> = lines[2].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(row, vec![50.0, 1.5]);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_write_csv_rejects_colliding_stems() {
        let dir = tempfile::tempdir().unwrap();
        let mut channels = outcome().channels;
        channels[1].channel = "imu_accel_x".into();
        channels[1].magnitude = channels[0].magnitude.clone();

        match write_csv(dir.path(), &channels) {
            Err(ReportError::StemCollision { stem, first, second }) => {
                assert_eq!(stem, "imu_accel_x");
                assert_eq!(first, "/imu/accel/x");
                assert_eq!(second, "imu_accel_x");
            }
            other => panic!("expected stem collision, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_find_stem_collision() {
        assert!(find_stem_collision(["/imu/x", "/imu/y"]).is_none());
        assert_eq!(
            find_stem_collision(["a b", "c", "a_b"]),
            Some(("a_b".to_string(), "a b", "a_b"))
        );
    }

    #[test]
    fn test_write_json_round_trips_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), &outcome()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["summary"]["windows_processed"], 2);
        assert_eq!(value["summary"]["stop_reason"]["kind"], "end_of_stream");
        assert_eq!(value["channels"][0]["magnitude"]["values"][1], 1.5);
        assert!(value["channels"][1]["psd"].is_null());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}

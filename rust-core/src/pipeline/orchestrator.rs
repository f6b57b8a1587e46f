//! Window loop driving one magnitude and one PSD accumulator per channel

use ndarray::Array1;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::AnalysisSettings;
use crate::error::SpectraError;
use crate::spectrum::{SpectralAccumulator, Spectrum, Taper, Transform};
use crate::window::Window;

/// Observed and configured sample rates may differ by this fraction before
/// a warning is logged
const RATE_TOLERANCE: f64 = 0.1;

/// Why the window loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Upstream ran out with no leftover rows
    EndOfStream,
    /// Upstream ran out and the last window was short; it was not accumulated
    PartialWindow { rows: usize },
    /// `max_iterations` full windows were processed
    IterationCap,
}

/// Bookkeeping for one run of the window loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub windows_processed: usize,
    pub rows_processed: usize,
    /// Last timeline value of the last processed window
    pub last_index: Option<f64>,
    pub stop_reason: StopReason,
}

/// Finished spectra for one channel; `None` when no full window was seen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpectra {
    pub channel: String,
    pub magnitude: Option<Spectrum>,
    pub psd: Option<Spectrum>,
}

struct ChannelAccumulators {
    channel: String,
    magnitude: SpectralAccumulator,
    psd: SpectralAccumulator,
}

/// Feeds full windows into per-channel accumulators
pub struct Pipeline {
    settings: AnalysisSettings,
    channels: Vec<ChannelAccumulators>,
    windows_processed: usize,
    rows_processed: usize,
    last_index: Option<f64>,
    rate_warned: bool,
}

impl Pipeline {
    /// Create accumulators for every channel
    ///
    /// # Arguments
    /// * `channels` - Channel names, in the column order of incoming windows
    /// * `settings` - Window length, sampling frequency, taper and iteration cap
    pub fn new(channels: &[String], settings: &AnalysisSettings) -> Result<Self, SpectraError> {
        let problems = settings.problems();
        if !problems.is_empty() {
            return Err(SpectraError::Configuration(problems.join("; ")));
        }
        if channels.is_empty() {
            return Err(SpectraError::Configuration(
                "at least one channel is required".to_string(),
            ));
        }

        let taper = Taper::new(settings.taper, settings.window_length);
        let channels = channels
            .iter()
            .map(|name| -> Result<ChannelAccumulators, SpectraError> {
                let make = |transform| {
                    SpectralAccumulator::new(
                        name.clone(),
                        settings.window_length,
                        settings.sampling_frequency,
                        transform,
                        taper.clone(),
                    )
                };
                Ok(ChannelAccumulators {
                    channel: name.clone(),
                    magnitude: make(Transform::Magnitude)?,
                    psd: make(Transform::Periodogram)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            settings: settings.clone(),
            channels,
            windows_processed: 0,
            rows_processed: 0,
            last_index: None,
            rate_warned: false,
        })
    }

    /// Detrend every channel of a full window and update its accumulators
    ///
    /// All channels are unwrapped before any accumulator is touched, so a
    /// bad cell leaves every accumulator as it was.
    pub fn process_window(&mut self, window: &Window) -> Result<(), SpectraError> {
        if window.len() != self.settings.window_length {
            return Err(SpectraError::Shape {
                context: format!("window {}", window.ordinal),
                expected: self.settings.window_length,
                actual: window.len(),
            });
        }
        if window.columns.len() != self.channels.len() {
            return Err(SpectraError::Configuration(format!(
                "window carries {} channels, pipeline expects {}",
                window.columns.len(),
                self.channels.len()
            )));
        }

        let detrended = self
            .channels
            .iter()
            .enumerate()
            .map(|(slot, ch)| window.scalars(slot, &ch.channel).map(remove_mean))
            .collect::<Result<Vec<_>, _>>()?;

        for (ch, samples) in self.channels.iter_mut().zip(&detrended) {
            ch.magnitude.update(samples)?;
            ch.psd.update(samples)?;
        }

        self.windows_processed += 1;
        self.rows_processed += window.len();
        self.observe_timing(window);
        Ok(())
    }

    fn observe_timing(&mut self, window: &Window) {
        let Some(timing) = window.timing() else {
            return;
        };
        self.last_index = Some(timing.end);

        debug!(
            window = window.ordinal,
            start = timing.start,
            end = timing.end,
            "processed window"
        );

        if let Some(rate) = timing.observed_rate() {
            let configured = self.settings.sampling_frequency;
            if !self.rate_warned && ((rate - configured) / configured).abs() > RATE_TOLERANCE {
                warn!(
                    window = window.ordinal,
                    observed_hz = rate,
                    configured_hz = configured,
                    "timeline spacing disagrees with configured sampling frequency"
                );
                self.rate_warned = true;
            }
        }
    }

    /// Pull windows until end of stream, a partial window, or the iteration cap
    ///
    /// The window source is not advanced once the cap is reached.
    pub fn run<I>(&mut self, windows: I) -> Result<RunSummary, SpectraError>
    where
        I: IntoIterator<Item = Result<Window, SpectraError>>,
    {
        let mut windows = windows.into_iter();

        let stop_reason = loop {
            if self.windows_processed >= self.settings.max_iterations {
                break StopReason::IterationCap;
            }
            let window = match windows.next() {
                Some(window) => window?,
                None => break StopReason::EndOfStream,
            };
            if window.is_partial() {
                info!(
                    rows = window.len(),
                    window_length = self.settings.window_length,
                    "partial trailing window excluded from averages"
                );
                break StopReason::PartialWindow { rows: window.len() };
            }

            self.process_window(&window)?;

            if self.windows_processed % self.settings.progress_every == 0 {
                info!(
                    windows = self.windows_processed,
                    rows = self.rows_processed,
                    last_index = self.last_index.unwrap_or(f64::NAN),
                    "Processing"
                );
            }
        };

        let summary = self.summary(stop_reason);
        info!(
            windows = summary.windows_processed,
            rows = summary.rows_processed,
            stop = ?summary.stop_reason,
            "Run finished"
        );
        Ok(summary)
    }

    pub fn summary(&self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            windows_processed: self.windows_processed,
            rows_processed: self.rows_processed,
            last_index: self.last_index,
            stop_reason,
        }
    }

    /// Finished spectra per channel, in channel order
    pub fn spectra(&self) -> Result<Vec<ChannelSpectra>, SpectraError> {
        self.channels
            .iter()
            .map(|ch| {
                Ok(ChannelSpectra {
                    channel: ch.channel.clone(),
                    magnitude: finished(&ch.magnitude)?,
                    psd: finished(&ch.psd)?,
                })
            })
            .collect()
    }

    pub fn windows_processed(&self) -> usize {
        self.windows_processed
    }

    pub fn channels(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel.as_str()).collect()
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }
}

fn finished(acc: &SpectralAccumulator) -> Result<Option<Spectrum>, SpectraError> {
    if acc.iterations() == 0 {
        warn!(
            channel = acc.label(),
            kind = acc.transform().label(),
            "no full windows accumulated, reporting empty spectrum"
        );
        return Ok(None);
    }
    acc.spectrum().map(Some)
}

/// Subtract the window mean so sensor bias does not dominate the 0 Hz bin
pub fn remove_mean(samples: Vec<f64>) -> Vec<f64> {
    let mut samples = Array1::from(samples);
    if let Some(mean) = samples.mean() {
        samples -= mean;
    }
    samples.into_raw_vec()
}

//! Re-chunking of upstream batches into fixed-length analysis windows

pub mod assembler;
pub mod ring;

pub use assembler::WindowAssembler;
pub use ring::ColumnRing;

use crate::error::SpectraError;
use crate::store::Cell;

/// A run of consecutive rows across the timeline and every channel
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// 0-based position of this window in the stream
    pub ordinal: usize,
    /// Length a full window would have
    pub nominal_len: usize,
    /// Timeline values
    pub index: Vec<f64>,
    /// One column of cells per channel, in query order
    pub columns: Vec<Vec<Cell>>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Only full windows are eligible for spectral accumulation
    pub fn is_full(&self) -> bool {
        self.len() == self.nominal_len
    }

    pub fn is_partial(&self) -> bool {
        !self.is_full()
    }

    /// Unwrap one channel's cells to scalars
    ///
    /// # Arguments
    /// * `slot` - Column position of the channel in this window
    /// * `channel` - Channel name, used for error reporting
    pub fn scalars(&self, slot: usize, channel: &str) -> Result<Vec<f64>, SpectraError> {
        let column = self.columns.get(slot).ok_or_else(|| {
            SpectraError::Configuration(format!(
                "window has {} channel columns, channel '{}' expects slot {}",
                self.columns.len(),
                channel,
                slot
            ))
        })?;

        if column.len() != self.len() {
            return Err(SpectraError::Shape {
                context: format!("channel '{}'", channel),
                expected: self.len(),
                actual: column.len(),
            });
        }

        column
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.scalar().ok_or_else(|| SpectraError::CellShape {
                    channel: channel.to_string(),
                    row,
                })
            })
            .collect()
    }

    /// Timeline extent and mean sample interval
    pub fn timing(&self) -> Option<WindowTiming> {
        let start = *self.index.first()?;
        let end = *self.index.last()?;
        let mean_interval = if self.len() > 1 {
            Some((end - start) / (self.len() - 1) as f64)
        } else {
            None
        };
        Some(WindowTiming {
            start,
            end,
            mean_interval,
        })
    }
}

/// Where a window sits on the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowTiming {
    pub start: f64,
    pub end: f64,
    /// Mean spacing between consecutive timeline values, in seconds
    pub mean_interval: Option<f64>,
}

impl WindowTiming {
    /// Sample rate implied by the timeline, in Hz
    pub fn observed_rate(&self) -> Option<f64> {
        self.mean_interval
            .filter(|dt| *dt > 0.0 && dt.is_finite())
            .map(|dt| 1.0 / dt)
    }
}

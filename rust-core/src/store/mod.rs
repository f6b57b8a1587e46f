//! Column store boundary
//!
//! The analysis core pulls time-indexed rows from a store as a sequence of
//! batches. Batch size is chosen by the store; the core never assumes one.

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading from a column store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{0}' not found in store")]
    MissingColumn(String),

    #[error("unparsable value '{value}' in column '{column}' at record {record}")]
    Parse {
        column: String,
        record: u64,
        value: String,
    },
}

/// Selects the value column holding one channel
///
/// Columns are addressed as `<name>:<component>`, e.g.
/// `/sensors/icm42688/accel_m_s2/x:Scalar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSelector {
    pub name: String,
    #[serde(default = "default_component")]
    pub component: String,
}

fn default_component() -> String {
    "Scalar".to_string()
}

impl ChannelSelector {
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
        }
    }

    /// Selector for a plain scalar channel
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, default_component())
    }

    /// Fully qualified column name in the store
    pub fn column(&self) -> String {
        format!("{}:{}", self.name, self.component)
    }
}

/// Half-open interval `[start, end)` in timeline units (seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// A bounded query over the store
#[derive(Debug, Clone)]
pub struct Query {
    /// Name of the index/timeline column
    pub timeline: String,
    /// Channels to read, in output column order
    pub channels: Vec<ChannelSelector>,
    /// Only rows with a timeline value inside this range are returned.
    /// `None` reads everything.
    pub range: Option<TimeRange>,
}

/// One logged value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Scalar(f64),
    List(Vec<f64>),
}

impl Cell {
    /// Unwrap to a scalar. Lists unwrap only when they hold exactly one value.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Cell::Scalar(v) => Some(*v),
            Cell::List(values) if values.len() == 1 => Some(values[0]),
            Cell::List(_) => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Scalar(v)
    }
}

/// A run of rows covering the timeline column and every queried channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnBatch {
    pub index: Vec<f64>,
    /// One column per channel, in query order
    pub columns: Vec<Vec<Cell>>,
}

impl ColumnBatch {
    pub fn new(index: Vec<f64>, columns: Vec<Vec<Cell>>) -> Self {
        Self { index, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }
}

/// Item type produced by every store's batch iterator
pub type BatchResult = Result<ColumnBatch, StoreError>;

/// A time-indexed columnar source of sensor rows
pub trait ColumnStore {
    type Batches: Iterator<Item = BatchResult>;

    /// Start a forward-only read of the rows matching `query`
    fn query(&self, query: &Query) -> Result<Self::Batches, StoreError>;
}

//! Streaming CSV column store
//!
//! Reads a log exported as CSV: one header row, one timeline column in
//! seconds, and value columns named `<entity>:<component>`. Value cells may
//! be plain numbers or bracketed lists (`[0.25]`), as produced by dataframe
//! exports of list-typed columns. Rows are read lazily, `batch_rows` at a time.
//!
//! The timeline column must be non-decreasing: once a row reaches the end of
//! the query range the rest of the file is not read.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::debug;

use super::{BatchResult, Cell, ColumnBatch, ColumnStore, Query, StoreError, TimeRange};

/// Default number of rows per upstream batch
pub const DEFAULT_BATCH_ROWS: usize = 4096;

/// Column store over a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    batch_rows: usize,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }

    /// Rows per batch; clamped to at least one
    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ColumnStore for CsvStore {
    type Batches = CsvBatches;

    fn query(&self, query: &Query) -> Result<CsvBatches, StoreError> {
        let file = File::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
        };

        let timeline_idx = find(query.timeline.as_str())?;
        let mut channel_idx = Vec::with_capacity(query.channels.len());
        let mut channel_names = Vec::with_capacity(query.channels.len());
        for sel in &query.channels {
            let column = sel.column();
            channel_idx.push(find(column.as_str())?);
            channel_names.push(column);
        }

        debug!(
            path = %self.path.display(),
            channels = channel_idx.len(),
            batch_rows = self.batch_rows,
            "opened CSV store"
        );

        Ok(CsvBatches {
            reader,
            record: StringRecord::new(),
            timeline: query.timeline.clone(),
            timeline_idx,
            channel_idx,
            channel_names,
            range: query.range,
            batch_rows: self.batch_rows,
            records_read: 0,
            past_range: false,
            finished: false,
        })
    }
}

/// Batch iterator returned by [`CsvStore::query`]
pub struct CsvBatches {
    reader: csv::Reader<File>,
    record: StringRecord,
    timeline: String,
    timeline_idx: usize,
    channel_idx: Vec<usize>,
    channel_names: Vec<String>,
    range: Option<TimeRange>,
    batch_rows: usize,
    records_read: u64,
    /// A row at or after `range.end` has been seen
    past_range: bool,
    finished: bool,
}

impl CsvBatches {
    fn read_batch(&mut self) -> Result<Option<ColumnBatch>, StoreError> {
        if self.past_range {
            return Ok(None);
        }
        let mut batch = ColumnBatch::new(
            Vec::with_capacity(self.batch_rows),
            vec![Vec::with_capacity(self.batch_rows); self.channel_idx.len()],
        );
        let mut saw_record = false;

        while batch.num_rows() < self.batch_rows {
            if !self.reader.read_record(&mut self.record)? {
                break;
            }
            saw_record = true;
            self.records_read += 1;

            let raw_t = self.record.get(self.timeline_idx).unwrap_or("");
            let t: f64 = raw_t.parse().map_err(|_| StoreError::Parse {
                column: self.timeline.clone(),
                record: self.records_read,
                value: raw_t.to_string(),
            })?;

            if let Some(range) = self.range {
                if t >= range.end {
                    debug!(record = self.records_read, end = range.end, "reached end of range");
                    self.past_range = true;
                    break;
                }
                if !range.contains(t) {
                    continue;
                }
            }

            batch.index.push(t);
            for (slot, (&idx, name)) in self.channel_idx.iter().zip(&self.channel_names).enumerate() {
                let raw = self.record.get(idx).unwrap_or("");
                let cell = parse_cell(raw).ok_or_else(|| StoreError::Parse {
                    column: name.clone(),
                    record: self.records_read,
                    value: raw.to_string(),
                })?;
                batch.columns[slot].push(cell);
            }
        }

        if !saw_record {
            return Ok(None);
        }
        Ok(Some(batch))
    }
}

impl Iterator for CsvBatches {
    type Item = BatchResult;

    fn next(&mut self) -> Option<BatchResult> {
        if self.finished {
            return None;
        }
        match self.read_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse one CSV field into a cell
///
/// Accepts `1.5`, `[1.5]`, `[1.5, 2.0]`, `[]`, `null` and the empty field.
pub fn parse_cell(raw: &str) -> Option<Cell> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Some(Cell::List(Vec::new()));
    }
    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let values = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()?;
        return Some(Cell::List(values));
    }
    raw.parse::<f64>().ok().map(Cell::Scalar)
}

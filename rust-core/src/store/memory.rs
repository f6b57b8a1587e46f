//! In-memory column store
//!
//! Holds fully materialized columns and replays them in batches following a
//! configurable size schedule. Used for embedding the pipeline and in tests.

use std::collections::HashMap;

use super::{BatchResult, Cell, ColumnBatch, ColumnStore, Query, StoreError};

/// Column store backed by vectors
#[derive(Debug, Clone)]
pub struct MemoryStore {
    timeline: String,
    index: Vec<f64>,
    columns: HashMap<String, Vec<Cell>>,
    batch_sizes: Vec<usize>,
}

impl MemoryStore {
    /// Create a store with the given timeline column and no value columns
    pub fn new(timeline: impl Into<String>, index: Vec<f64>) -> Self {
        Self {
            timeline: timeline.into(),
            index,
            columns: HashMap::new(),
            batch_sizes: vec![1024],
        }
    }

    /// Add a value column, addressed by its full column name
    ///
    /// The column must have one cell per timeline row; missing rows are not
    /// padded.
    pub fn with_column(mut self, column: impl Into<String>, cells: Vec<Cell>) -> Self {
        self.columns.insert(column.into(), cells);
        self
    }

    /// Batch size schedule, cycled until the data is exhausted.
    /// Zero-sized entries produce empty batches.
    pub fn with_batch_sizes(mut self, sizes: Vec<usize>) -> Self {
        if sizes.iter().any(|&s| s > 0) {
            self.batch_sizes = sizes;
        }
        self
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }
}

impl ColumnStore for MemoryStore {
    type Batches = MemoryBatches;

    fn query(&self, query: &Query) -> Result<MemoryBatches, StoreError> {
        if query.timeline != self.timeline {
            return Err(StoreError::MissingColumn(query.timeline.clone()));
        }

        let sources = query
            .channels
            .iter()
            .map(|sel| {
                let name = sel.column();
                self.columns
                    .get(&name)
                    .ok_or(StoreError::MissingColumn(name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<usize> = match query.range {
            Some(range) => (0..self.index.len())
                .filter(|&i| range.contains(self.index[i]))
                .collect(),
            None => (0..self.index.len()).collect(),
        };

        let index = rows.iter().map(|&i| self.index[i]).collect();
        let columns = sources
            .iter()
            .map(|cells| rows.iter().filter_map(|&i| cells.get(i).cloned()).collect())
            .collect();

        Ok(MemoryBatches {
            index,
            columns,
            position: 0,
            batch_sizes: self.batch_sizes.clone(),
            step: 0,
        })
    }
}

/// Batch iterator returned by [`MemoryStore::query`]
#[derive(Debug)]
pub struct MemoryBatches {
    index: Vec<f64>,
    columns: Vec<Vec<Cell>>,
    position: usize,
    batch_sizes: Vec<usize>,
    step: usize,
}

impl Iterator for MemoryBatches {
    type Item = BatchResult;

    fn next(&mut self) -> Option<BatchResult> {
        if self.position >= self.index.len() {
            return None;
        }

        let size = self.batch_sizes[self.step % self.batch_sizes.len()];
        self.step += 1;

        let start = self.position;
        let end = (start + size).min(self.index.len());
        self.position = end;

        let columns = self
            .columns
            .iter()
            .map(|col| col[start.min(col.len())..end.min(col.len())].to_vec())
            .collect();

        Some(Ok(ColumnBatch::new(self.index[start..end].to_vec(), columns)))
    }
}

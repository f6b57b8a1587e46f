//! Batch to window re-chunking
//!
//! Upstream batches arrive in whatever size the store picks. Rows are moved
//! one batch at a time into per-column rings of capacity `N`; a full ring is
//! emitted as a window and the rest of the batch stays queued for the next
//! call. At end of stream any leftover rows form one final partial window.

use tracing::{debug, trace};

use super::ring::ColumnRing;
use super::Window;
use crate::error::SpectraError;
use crate::store::{BatchResult, Cell, ColumnBatch, ColumnStore, Query};

/// Rows of the batch currently being drained into the rings
struct PendingBatch {
    index: std::vec::IntoIter<f64>,
    columns: Vec<std::vec::IntoIter<Cell>>,
}

impl PendingBatch {
    fn remaining(&self) -> usize {
        self.index.len()
    }
}

/// Lazy, forward-only sequence of fixed-length windows over an upstream
/// batch stream
pub struct WindowAssembler<I> {
    window_length: usize,
    channels: Vec<String>,
    upstream: Option<I>,
    current: Option<PendingBatch>,
    index_ring: ColumnRing<f64>,
    cell_rings: Vec<ColumnRing<Cell>>,
    windows_emitted: usize,
    rows_emitted: usize,
    finished: bool,
}

impl<I> WindowAssembler<I>
where
    I: Iterator<Item = BatchResult>,
{
    /// Query `store` and assemble its rows into windows of `window_length`
    ///
    /// The window length is validated before the store is touched.
    pub fn open<S>(store: &S, query: &Query, window_length: usize) -> Result<Self, SpectraError>
    where
        S: ColumnStore<Batches = I>,
    {
        validate_window_length(window_length)?;
        let batches = store.query(query)?;
        let channels = query.channels.iter().map(|c| c.name.clone()).collect();
        Self::new(batches, window_length, channels)
    }

    /// Assemble windows from an existing batch iterator
    ///
    /// # Arguments
    /// * `batches` - Upstream batches, each with one column per channel
    /// * `window_length` - Rows per full window (N)
    /// * `channels` - Channel names in column order
    pub fn new(batches: I, window_length: usize, channels: Vec<String>) -> Result<Self, SpectraError> {
        validate_window_length(window_length)?;

        let cell_rings = channels.iter().map(|_| ColumnRing::new(window_length)).collect();

        Ok(Self {
            window_length,
            channels,
            upstream: Some(batches),
            current: None,
            index_ring: ColumnRing::new(window_length),
            cell_rings,
            windows_emitted: 0,
            rows_emitted: 0,
            finished: false,
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Windows handed out so far, full and partial
    pub fn windows_emitted(&self) -> usize {
        self.windows_emitted
    }

    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    /// Rows buffered but not yet emitted
    pub fn pending_rows(&self) -> usize {
        self.index_ring.len()
    }

    fn accept(&mut self, batch: ColumnBatch) -> Result<(), SpectraError> {
        if batch.columns.len() != self.channels.len() {
            return Err(SpectraError::Shape {
                context: "upstream batch column count".to_string(),
                expected: self.channels.len(),
                actual: batch.columns.len(),
            });
        }
        let rows = batch.num_rows();
        for (name, column) in self.channels.iter().zip(&batch.columns) {
            if column.len() != rows {
                return Err(SpectraError::Shape {
                    context: format!("upstream batch column of channel '{}'", name),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }

        trace!(rows, pending = self.index_ring.len(), "accepted upstream batch");
        if rows > 0 {
            self.current = Some(PendingBatch {
                index: batch.index.into_iter(),
                columns: batch.columns.into_iter().map(Vec::into_iter).collect(),
            });
        }
        Ok(())
    }

    /// Move as many rows as fit from the current batch into the rings
    fn fill_from_current(&mut self) -> bool {
        let Some(batch) = self.current.as_mut() else {
            return false;
        };
        let n = batch.remaining().min(self.index_ring.free_len());
        if n == 0 {
            if batch.remaining() == 0 {
                self.current = None;
            }
            return false;
        }

        for t in batch.index.by_ref().take(n) {
            let pushed = self.index_ring.push(t).is_ok();
            debug_assert!(pushed, "index ring overflow");
        }
        for (column, ring) in batch.columns.iter_mut().zip(self.cell_rings.iter_mut()) {
            for cell in column.by_ref().take(n) {
                let pushed = ring.push(cell).is_ok();
                debug_assert!(pushed, "cell ring overflow");
            }
        }
        if batch.remaining() == 0 {
            self.current = None;
        }
        true
    }

    fn take_window(&mut self, rows: usize) -> Window {
        let index = self.index_ring.drain_front(rows);
        let columns = self
            .cell_rings
            .iter_mut()
            .map(|ring| ring.drain_front(rows))
            .collect();

        let window = Window {
            ordinal: self.windows_emitted,
            nominal_len: self.window_length,
            index,
            columns,
        };
        self.windows_emitted += 1;
        self.rows_emitted += window.len();
        window
    }

    /// Drop upstream resources and stop producing windows
    fn finish(&mut self) {
        self.finished = true;
        self.upstream = None;
        self.current = None;
    }
}

impl<I> Iterator for WindowAssembler<I>
where
    I: Iterator<Item = BatchResult>,
{
    type Item = Result<Window, SpectraError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.index_ring.is_full() {
                return Some(Ok(self.take_window(self.window_length)));
            }
            if self.fill_from_current() {
                continue;
            }

            let next = self.upstream.as_mut().and_then(|up| up.next());
            match next {
                Some(Ok(batch)) => {
                    if let Err(e) = self.accept(batch) {
                        self.finish();
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => {
                    self.finish();
                    return Some(Err(e.into()));
                }
                None => {
                    self.finish();
                    let leftover = self.index_ring.len();
                    debug!(
                        windows = self.windows_emitted,
                        leftover, "upstream exhausted"
                    );
                    if leftover > 0 {
                        return Some(Ok(self.take_window(leftover)));
                    }
                    return None;
                }
            }
        }
    }
}

fn validate_window_length(window_length: usize) -> Result<(), SpectraError> {
    if window_length == 0 {
        return Err(SpectraError::Configuration(
            "window length must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

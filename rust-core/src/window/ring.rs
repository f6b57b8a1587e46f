//! Bounded FIFO for rows awaiting window assembly
//!
//! One ring per column. Capacity equals the window length, so a full ring is
//! exactly one window's worth of rows.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Fixed-capacity FIFO holding one column of pending rows
pub struct ColumnRing<T> {
    producer: HeapProducer<T>,
    consumer: HeapConsumer<T>,
    capacity: usize,
}

impl<T> ColumnRing<T> {
    /// Create a ring with room for `capacity` rows
    ///
    /// # Arguments
    /// * `capacity` - Ring capacity in rows, must be non-zero
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<T>::new(capacity);
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            capacity,
        }
    }

    /// Append one row; hands the value back when the ring is full
    pub fn push(&mut self, value: T) -> Result<(), T> {
        self.producer.push(value)
    }

    /// Remove up to `n` rows from the front, in arrival order
    pub fn drain_front(&mut self, n: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(n.min(self.len()));
        while out.len() < n {
            match self.consumer.pop() {
                Some(v) => out.push(v),
                None => break,
            }
        }
        out
    }

    /// Number of rows waiting
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.producer.free_len() == 0
    }

    /// Number of free slots
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

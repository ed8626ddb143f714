use std::mem;

use polycall_value::FfiValue;

use crate::error::{FfiError, Result};

/// A call waiting for the next drain.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub function_name: String,
    pub args: Vec<FfiValue>,
    pub target_language: String,
}

impl BatchEntry {
    pub fn new(
        function_name: impl Into<String>,
        args: Vec<FfiValue>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            args,
            target_language: target_language.into(),
        }
    }

    fn heap_size(&self) -> usize {
        self.function_name.capacity()
            + self.target_language.capacity()
            + self.args.capacity() * mem::size_of::<FfiValue>()
            + self.args.iter().map(FfiValue::heap_size).sum::<usize>()
    }
}

/// Bounded FIFO of pending calls.
#[derive(Debug)]
pub struct BatchQueue {
    entries: Vec<BatchEntry>,
    capacity: usize,
    sequence: u64,
}

impl BatchQueue {
    pub fn new(capacity: usize, preallocate: bool) -> Self {
        let entries = if preallocate {
            Vec::with_capacity(capacity)
        } else {
            Vec::new()
        };
        Self {
            entries,
            capacity,
            sequence: 0,
        }
    }

    pub fn push(&mut self, entry: BatchEntry) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(FfiError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.entries
            .try_reserve(1)
            .map_err(|_| FfiError::OutOfMemory)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Pending entries in submission order.
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Empty the queue after a drain. Only successful drains advance the
    /// batch sequence.
    pub fn finish_drain(&mut self, succeeded: bool) {
        self.entries.clear();
        if succeeded {
            self.sequence += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn memory_usage(&self) -> usize {
        self.entries.capacity() * mem::size_of::<BatchEntry>()
            + self.entries.iter().map(BatchEntry::heap_size).sum::<usize>()
    }
}

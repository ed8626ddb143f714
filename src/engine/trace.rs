use std::mem;
use std::time::Instant;

use serde::Serialize;

/// Timing record of one call. Field names follow the export schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub function_name: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(rename = "start_time_ns")]
    pub start_ns: u64,
    #[serde(rename = "end_time_ns")]
    pub end_ns: u64,
    #[serde(rename = "execution_time_ns")]
    pub execution_ns: u64,
    #[serde(rename = "marshalling_time_ns")]
    pub marshalling_ns: u64,
    pub arg_count: usize,
    pub cached: bool,
    pub batched: bool,
    pub sequence: u32,
}

impl TraceEntry {
    fn heap_size(&self) -> usize {
        self.function_name.capacity()
            + self.source_language.capacity()
            + self.target_language.capacity()
    }
}

/// Open span returned by `trace_begin`.
///
/// Set the flags and the marshaling time before handing the span back to
/// `trace_end`; the counters only see what the span carries at that point.
#[derive(Debug)]
#[must_use = "a span only counts once it is passed to trace_end"]
pub struct TraceSpan {
    sequence: u32,
    start_ns: u64,
    pub arg_count: usize,
    pub cached: bool,
    pub batched: bool,
    pub marshalling_ns: u64,
}

impl TraceSpan {
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn start_ns(&self) -> u64 {
        self.start_ns
    }
}

/// Timing data of a closed span, folded into the aggregate metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanTiming {
    pub execution_ns: u64,
    pub marshalling_ns: u64,
    pub cached: bool,
    pub batched: bool,
}

/// Growable, sequence-ordered log of spans.
#[derive(Debug)]
pub struct TraceBuffer {
    entries: Vec<TraceEntry>,
    initial_capacity: usize,
    next_sequence: u32,
    epoch: Instant,
}

impl TraceBuffer {
    pub fn new(initial_capacity: usize, preallocate: bool) -> Self {
        let entries = if preallocate {
            Vec::with_capacity(initial_capacity)
        } else {
            Vec::new()
        };
        Self {
            entries,
            initial_capacity: initial_capacity.max(1),
            next_sequence: 0,
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds on the buffer's monotonic clock.
    pub fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    pub fn begin(
        &mut self,
        function_name: &str,
        source_language: &str,
        target_language: &str,
    ) -> TraceSpan {
        if self.entries.len() == self.entries.capacity() {
            let additional = self.entries.capacity().max(self.initial_capacity);
            self.entries.reserve_exact(additional);
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let start_ns = self.now_ns();

        self.entries.push(TraceEntry {
            function_name: function_name.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            start_ns,
            end_ns: 0,
            execution_ns: 0,
            marshalling_ns: 0,
            arg_count: 0,
            cached: false,
            batched: false,
            sequence,
        });

        TraceSpan {
            sequence,
            start_ns,
            arg_count: 0,
            cached: false,
            batched: false,
            marshalling_ns: 0,
        }
    }

    /// Close `span`. The timing is returned even when the entry was cleared
    /// while the span was open.
    pub fn finish(&mut self, span: TraceSpan) -> SpanTiming {
        let end_ns = self.now_ns();
        let execution_ns = end_ns.saturating_sub(span.start_ns);

        if let Some(entry) = self.entry_mut(span.sequence) {
            entry.end_ns = end_ns;
            entry.execution_ns = execution_ns;
            entry.marshalling_ns = span.marshalling_ns;
            entry.arg_count = span.arg_count;
            entry.cached = span.cached;
            entry.batched = span.batched;
        }

        SpanTiming {
            execution_ns,
            marshalling_ns: span.marshalling_ns,
            cached: span.cached,
            batched: span.batched,
        }
    }

    fn entry_mut(&mut self, sequence: u32) -> Option<&mut TraceEntry> {
        match self
            .entries
            .binary_search_by_key(&sequence, |entry| entry.sequence)
        {
            Ok(index) => self.entries.get_mut(index),
            // sequence wrapped around; fall back to a scan
            Err(_) => self
                .entries
                .iter_mut()
                .find(|entry| entry.sequence == sequence),
        }
    }

    /// Cloned entries in ascending sequence order.
    pub fn entries(&self) -> Vec<TraceEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Drop every entry. Sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn memory_usage(&self) -> usize {
        self.entries.capacity() * mem::size_of::<TraceEntry>()
            + self.entries.iter().map(TraceEntry::heap_size).sum::<usize>()
    }
}

//! Performance manager and the batch, trace and metrics structures it owns.

pub mod batch;
pub mod manager;
pub mod metrics;
pub mod trace;

pub use batch::{BatchEntry, BatchQueue};
pub use manager::PerformanceManager;
pub use metrics::{EngineMetrics, Metrics};
pub use trace::{SpanTiming, TraceBuffer, TraceEntry, TraceSpan};

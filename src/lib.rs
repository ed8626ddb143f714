//! Call performance engine for a cross-language FFI runtime.
//!
//! [`PerformanceManager`] sits between callers and the cross-language
//! dispatcher. It caches call results, memoizes conversion plans, queues
//! calls for batched execution and records a timing trace of every call.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod export;

pub use config::{Feature, OptimizationLevel, PerformanceConfig};
pub use dispatch::CallDispatcher;
pub use engine::{BatchEntry, Metrics, PerformanceManager, TraceEntry, TraceSpan};
pub use error::{FfiError, Result};
pub use export::ExportFormat;

pub use polycall_cache::{CacheStats, ConversionKey, ConversionPlan};
pub use polycall_utils::logger::init_logging;
pub use polycall_value::{FfiValue, OpaqueHandle, ValueKind};

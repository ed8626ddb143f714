use std::fs::File;
use std::io::BufWriter;
use std::mem;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use polycall_cache::{CacheStats, CallCache, ConversionKey, ConversionPlan, TypeCache};
use polycall_value::FfiValue;
use tracing::{debug, info, trace, warn};

use super::batch::{BatchEntry, BatchQueue};
use super::metrics::{EngineMetrics, Metrics};
use super::trace::{TraceBuffer, TraceEntry, TraceSpan};
use crate::config::{Feature, OptimizationLevel, PerformanceConfig};
use crate::dispatch::CallDispatcher;
use crate::error::{FfiError, Result};
use crate::export::{self, ExportFormat};

/// Façade over the call cache, type cache, batch queue and trace buffer.
///
/// Each structure has its own lock; there is no global lock. Counters are
/// atomics and may be read while other threads update them.
pub struct PerformanceManager {
    config: RwLock<PerformanceConfig>,
    call_cache: CallCache,
    type_cache: TypeCache,
    batch: Mutex<BatchQueue>,
    /// Bytes held by the batch queue, refreshed on every change so readers
    /// never wait on a running drain.
    batch_bytes: AtomicUsize,
    traces: Mutex<TraceBuffer>,
    metrics: EngineMetrics,
    dispatcher: RwLock<Option<Arc<dyn CallDispatcher>>>,
}

impl PerformanceManager {
    pub fn init(config: PerformanceConfig) -> Result<Self> {
        config.validate()?;

        let preallocate = !config.enable_lazy_initialization;
        let (call_cache, type_cache) = if preallocate {
            (
                CallCache::new(config.cache_size, config.cache_ttl_ms),
                TypeCache::new(config.type_cache_size),
            )
        } else {
            (
                CallCache::lazy(config.cache_size, config.cache_ttl_ms),
                TypeCache::lazy(config.type_cache_size),
            )
        };

        info!(
            opt_level = %config.opt_level,
            cache_size = config.cache_size,
            cache_ttl_ms = config.cache_ttl_ms,
            batch_size = config.batch_size,
            lazy = !preallocate,
            "performance manager initialised"
        );

        let batch = BatchQueue::new(config.batch_size, preallocate);
        Ok(Self {
            batch_bytes: AtomicUsize::new(batch.memory_usage()),
            batch: Mutex::new(batch),
            traces: Mutex::new(TraceBuffer::new(config.trace_capacity, preallocate)),
            call_cache,
            type_cache,
            metrics: EngineMetrics::new(),
            dispatcher: RwLock::new(None),
            config: RwLock::new(config),
        })
    }

    /// Tear the manager down, releasing every cache entry, pending batch
    /// entry and trace.
    pub fn cleanup(self) {
        let metrics = self.get_metrics();
        info!(
            total_calls = metrics.total_calls,
            cache_hits = metrics.cache_hits,
            cache_misses = metrics.cache_misses,
            batched_calls = metrics.batched_calls,
            "performance manager shut down"
        );
    }

    pub fn config(&self) -> PerformanceConfig {
        self.config.read().clone()
    }

    pub fn attach_dispatcher(&self, dispatcher: Arc<dyn CallDispatcher>) -> Result<()> {
        let mut slot = self.dispatcher.write();
        if slot.is_some() {
            return Err(FfiError::AlreadyInitialized("call dispatcher"));
        }
        *slot = Some(dispatcher);
        Ok(())
    }

    pub fn detach_dispatcher(&self) -> Option<Arc<dyn CallDispatcher>> {
        self.dispatcher.write().take()
    }

    fn dispatcher(&self) -> Result<Arc<dyn CallDispatcher>> {
        self.dispatcher
            .read()
            .clone()
            .ok_or(FfiError::NotInitialized("call dispatcher"))
    }
}

impl PerformanceManager {
    pub fn set_optimization_level(&self, level: OptimizationLevel) {
        let mut config = self.config.write();
        config.apply_level(level);
        if let Err(err) = config.validate() {
            warn!(level = %level, error = %err, "optimization level enables a feature sized to zero");
        }
        drop(config);
        info!(level = %level, "optimization level changed");
    }

    pub fn set_feature(&self, name: &str, enabled: bool) -> Result<()> {
        let feature: Feature = name.parse()?;
        let mut config = self.config.write();
        let mut updated = config.clone();
        updated.set_feature(feature, enabled);
        updated.validate()?;
        *config = updated;
        drop(config);
        debug!(feature = feature.name(), enabled, "feature toggled");
        Ok(())
    }

    /// Accepts a hot-function hint. This is a stub: the hint is validated and
    /// logged, and no specialised call path is built for it.
    pub fn register_hot_function(&self, function_name: &str, level: OptimizationLevel) -> Result<()> {
        validate_name(function_name)?;
        info!(
            function = function_name,
            level = %level,
            "hot function registered (no optimization applied)"
        );
        Ok(())
    }
}

impl PerformanceManager {
    pub fn get_metrics(&self) -> Metrics {
        let memory = u64::try_from(self.memory_usage()).unwrap_or(u64::MAX);
        self.metrics.snapshot(memory)
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
        debug!("metrics reset");
    }

    /// Bytes owned by the manager and every structure it holds, measured now.
    fn memory_usage(&self) -> usize {
        mem::size_of::<Self>()
            + self.call_cache.memory_usage()
            + self.type_cache.memory_usage()
            + self.batch_bytes.load(Ordering::Relaxed)
            + self.traces.lock().memory_usage()
    }
}

impl PerformanceManager {
    /// Cached result of the call, if any. A miss is counted in the metrics;
    /// hits are counted when the caller closes a span flagged `cached`.
    pub fn check_cache(&self, function_name: &str, args: &[FfiValue]) -> Option<FfiValue> {
        if !self.config.read().enable_call_caching {
            return None;
        }
        let hit = self.call_cache.lookup(function_name, args);
        if hit.is_none() {
            self.metrics.record_miss();
        }
        hit
    }

    pub fn cache_result(&self, function_name: &str, args: &[FfiValue], result: &FfiValue) {
        if !self.config.read().enable_call_caching {
            return;
        }
        self.call_cache.insert(function_name, args, result.clone());
    }

    pub fn clear_cache(&self) {
        self.call_cache.clear();
        self.type_cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.call_cache.stats()
    }

    pub fn type_cache_stats(&self) -> CacheStats {
        self.type_cache.stats()
    }
}

impl PerformanceManager {
    /// Conversion plan for `value` travelling to `target_language`, served
    /// from the type cache when type caching is enabled.
    pub fn conversion_plan(&self, value: &FfiValue, target_language: &str) -> ConversionPlan {
        let key = ConversionKey::new(value.kind(), target_language);
        self.metrics.record_conversion();
        if self.config.read().enable_type_caching {
            let (plan, built) = self
                .type_cache
                .get_or_insert_with(&key, ConversionPlan::for_target);
            if built {
                trace!(kind = %key.kind, target = target_language, "conversion plan cached");
            }
            plan
        } else {
            ConversionPlan::for_target(&key)
        }
    }

    /// Plans every argument and returns the nanoseconds it took.
    fn marshal_args(&self, args: &[FfiValue], target_language: &str) -> u64 {
        let started = Instant::now();
        for arg in args {
            let _plan = self.conversion_plan(arg, target_language);
        }
        u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl PerformanceManager {
    pub fn trace_begin(
        &self,
        function_name: &str,
        source_language: &str,
        target_language: &str,
    ) -> TraceSpan {
        let span = self
            .traces
            .lock()
            .begin(function_name, source_language, target_language);
        self.metrics.record_call();
        span
    }

    pub fn trace_end(&self, span: TraceSpan) {
        let timing = self.traces.lock().finish(span);
        self.metrics
            .record_timing(timing.execution_ns, timing.marshalling_ns);
        if timing.cached {
            self.metrics.record_hit();
        }
        if timing.batched {
            self.metrics.record_batched();
        }
    }

    /// Every recorded trace, ascending by sequence.
    pub fn get_traces(&self) -> Vec<TraceEntry> {
        self.traces.lock().entries()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn clear_traces(&self) {
        self.traces.lock().clear();
    }
}

impl PerformanceManager {
    /// Full call path: trace, marshal, serve from cache or dispatch and cache.
    pub fn invoke(
        &self,
        function_name: &str,
        args: &[FfiValue],
        source_language: &str,
        target_language: &str,
    ) -> Result<FfiValue> {
        validate_name(function_name)?;
        let dispatcher = self.dispatcher()?;

        let mut span = self.trace_begin(function_name, source_language, target_language);
        span.arg_count = args.len();
        span.marshalling_ns = self.marshal_args(args, target_language);

        if let Some(hit) = self.check_cache(function_name, args) {
            span.cached = true;
            self.trace_end(span);
            return Ok(hit);
        }

        let outcome = dispatcher.dispatch(function_name, args, target_language);
        match &outcome {
            Ok(value) => self.cache_result(function_name, args, value),
            Err(err) => debug!(function = function_name, error = %err, "dispatch failed"),
        }
        self.trace_end(span);
        outcome
    }
}

impl PerformanceManager {
    pub fn enqueue(
        &self,
        function_name: &str,
        args: Vec<FfiValue>,
        target_language: &str,
    ) -> Result<()> {
        if !self.config.read().enable_call_batching {
            return Err(FfiError::UnsupportedOperation(
                "call batching is disabled".to_string(),
            ));
        }
        validate_name(function_name)?;
        if target_language.is_empty() {
            return Err(FfiError::invalid("target language must not be empty"));
        }

        let mut queue = self.batch.lock();
        queue.push(BatchEntry::new(function_name, args, target_language))?;
        self.batch_bytes.store(queue.memory_usage(), Ordering::Relaxed);
        Ok(())
    }

    /// Run every queued call in submission order and return the results in
    /// the same order.
    ///
    /// The batch lock is held for the whole drain, dispatch included, so
    /// concurrent enqueues wait until the drain finishes. The first failing
    /// call aborts the drain: results gathered so far are dropped and the
    /// queue is emptied, but calls already dispatched are not undone.
    pub fn execute_batch(&self) -> Result<Vec<FfiValue>> {
        let (enabled, host_language) = {
            let config = self.config.read();
            (config.enable_call_batching, config.host_language.clone())
        };
        if !enabled {
            return Err(FfiError::UnsupportedOperation(
                "call batching is disabled".to_string(),
            ));
        }
        let dispatcher = self.dispatcher()?;

        let mut queue = self.batch.lock();
        let mut results = Vec::with_capacity(queue.len());
        let mut failure = None;

        for (index, entry) in queue.entries().iter().enumerate() {
            let mut span = self.trace_begin(
                &entry.function_name,
                &host_language,
                &entry.target_language,
            );
            span.batched = true;
            span.arg_count = entry.args.len();
            span.marshalling_ns = self.marshal_args(&entry.args, &entry.target_language);

            let outcome =
                dispatcher.dispatch(&entry.function_name, &entry.args, &entry.target_language);
            self.trace_end(span);

            match outcome {
                Ok(value) => results.push(value),
                Err(err) => {
                    failure = Some(FfiError::BatchAborted {
                        index,
                        function_name: entry.function_name.clone(),
                        source: Box::new(err),
                    });
                    break;
                }
            }
        }

        let drained = queue.len();
        queue.finish_drain(failure.is_none());
        self.batch_bytes.store(queue.memory_usage(), Ordering::Relaxed);
        let sequence = queue.sequence();
        drop(queue);

        match failure {
            Some(err) => {
                warn!(drained, completed = results.len(), error = %err, "batch aborted");
                Err(err)
            }
            None => {
                debug!(drained, sequence, "batch executed");
                Ok(results)
            }
        }
    }

    pub fn pending_batch_len(&self) -> usize {
        self.batch.lock().len()
    }

    /// Number of successful drains so far.
    pub fn batch_sequence(&self) -> u64 {
        self.batch.lock().sequence()
    }
}

impl PerformanceManager {
    /// Write the current metrics and every trace to `path`.
    pub fn export_data(&self, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
        let path = path.as_ref();
        let metrics = self.get_metrics();
        let traces = self.get_traces();

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        export::write_report(&mut writer, format, &metrics, &traces)?;

        debug!(path = %path.display(), format = %format, traces = traces.len(), "exported performance data");
        Ok(())
    }
}

fn validate_name(function_name: &str) -> Result<()> {
    if function_name.trim().is_empty() {
        return Err(FfiError::invalid("function name must not be empty"));
    }
    Ok(())
}

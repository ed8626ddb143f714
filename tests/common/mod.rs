#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use polycall::{CallDispatcher, FfiError, FfiValue, PerformanceConfig, PerformanceManager, Result};

/// Dispatcher that sums integer arguments, echoes strings and records every
/// call it receives.
#[derive(Default)]
pub struct RecordingDispatcher {
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(function_name: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(function_name.to_string()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl CallDispatcher for RecordingDispatcher {
    fn dispatch(
        &self,
        function_name: &str,
        args: &[FfiValue],
        target_language: &str,
    ) -> Result<FfiValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .push(format!("{target_language}:{function_name}"));

        if self.fail_on.as_deref() == Some(function_name) {
            return Err(FfiError::dispatch(format!("{function_name} raised")));
        }

        match args.first() {
            Some(FfiValue::String(s)) => Ok(FfiValue::String(format!("{function_name}({s})"))),
            _ => Ok(FfiValue::Int(
                args.iter().filter_map(FfiValue::as_int).sum::<i64>(),
            )),
        }
    }
}

pub fn manager_with(config: PerformanceConfig) -> (PerformanceManager, Arc<RecordingDispatcher>) {
    polycall::init_logging();
    let manager = PerformanceManager::init(config).expect("config should be valid");
    let dispatcher = RecordingDispatcher::new();
    manager
        .attach_dispatcher(dispatcher.clone())
        .expect("first dispatcher attaches");
    (manager, dispatcher)
}

pub fn manager() -> (PerformanceManager, Arc<RecordingDispatcher>) {
    manager_with(PerformanceConfig::default())
}

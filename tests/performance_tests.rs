mod common;

use std::fs;
use std::thread;

use anyhow::Result;
use polycall::{
    ExportFormat, FfiError, FfiValue, OptimizationLevel, PerformanceConfig, PerformanceManager,
};

fn temp_export_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("polycall-export-test")
        .tempdir()
        .expect("failed to create temp dir")
}

#[test]
fn trace_sequences_increase_across_threads() {
    let manager = PerformanceManager::init(PerformanceConfig {
        trace_capacity: 4,
        ..PerformanceConfig::default()
    })
    .expect("valid config");

    thread::scope(|scope| {
        for worker in 0..4 {
            let manager = &manager;
            scope.spawn(move || {
                for _ in 0..50 {
                    let span = manager.trace_begin(&format!("worker{worker}"), "rust", "c");
                    manager.trace_end(span);
                }
            });
        }
    });

    let traces = manager.get_traces();
    assert_eq!(traces.len(), 200);
    assert!(traces.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
    assert_eq!(manager.get_metrics().total_calls, 200);
}

#[test]
fn span_flags_drive_counters() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");

    let mut cached = manager.trace_begin("f", "rust", "python");
    cached.cached = true;
    cached.marshalling_ns = 40;
    manager.trace_end(cached);

    let mut batched = manager.trace_begin("g", "rust", "python");
    batched.batched = true;
    manager.trace_end(batched);

    let metrics = manager.get_metrics();
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.batched_calls, 1);
    assert_eq!(metrics.total_marshalling_time_ns, 40);

    let traces = manager.get_traces();
    assert!(traces[0].end_ns >= traces[0].start_ns);
    assert_eq!(traces[0].execution_ns, traces[0].end_ns - traces[0].start_ns);
    assert_eq!(traces[0].marshalling_ns, 40);
}

#[test]
fn clear_traces_keeps_counting_sequences() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");
    for _ in 0..3 {
        let span = manager.trace_begin("f", "rust", "c");
        manager.trace_end(span);
    }
    manager.clear_traces();
    assert_eq!(manager.trace_count(), 0);

    let span = manager.trace_begin("g", "rust", "c");
    assert_eq!(span.sequence(), 3);
    manager.trace_end(span);
    assert_eq!(manager.get_traces()[0].function_name, "g");
}

#[test]
fn optimization_levels_rewrite_toggles() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");

    manager.set_optimization_level(OptimizationLevel::None);
    let config = manager.config();
    assert!(!config.enable_call_caching);
    assert!(!config.enable_call_batching);
    assert!(!config.enable_lazy_initialization);

    manager.set_optimization_level(OptimizationLevel::Basic);
    let config = manager.config();
    assert!(config.enable_call_caching);
    assert!(!config.enable_call_batching);

    manager.set_optimization_level(OptimizationLevel::Moderate);
    let config = manager.config();
    assert!(config.enable_call_caching && config.enable_call_batching);
    assert!(!config.enable_lazy_initialization);

    manager.set_optimization_level(OptimizationLevel::Aggressive);
    let config = manager.config();
    assert!(config.enable_call_caching);
    assert!(config.enable_type_caching);
    assert!(config.enable_call_batching);
    assert!(config.enable_lazy_initialization);
    assert_eq!(config.opt_level, OptimizationLevel::Aggressive);
}

#[test]
fn unknown_feature_is_invalid() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");
    let err = manager
        .set_feature("compression", true)
        .expect_err("no such feature");
    assert!(matches!(err, FfiError::InvalidParameter(_)));
}

#[test]
fn disabling_type_caching_still_counts_conversions() -> Result<()> {
    let (manager, _dispatcher) = common::manager();
    manager.set_feature("type_caching", false)?;
    assert!(!manager.config().enable_type_caching);

    manager.invoke("add", &[FfiValue::Int(1), FfiValue::Double(2.0)], "rust", "c")?;

    assert_eq!(manager.type_cache_stats().entries, 0);
    assert_eq!(manager.get_metrics().type_conversions, 2);

    manager.set_feature("type_caching", true)?;
    manager.invoke("add", &[FfiValue::Int(3)], "rust", "c")?;
    assert_eq!(manager.type_cache_stats().entries, 1);
    Ok(())
}

#[test]
fn optimization_level_none_bypasses_the_type_cache() -> Result<()> {
    let (manager, _dispatcher) = common::manager();
    manager.set_optimization_level(OptimizationLevel::None);
    assert!(!manager.config().enable_type_caching);

    manager.invoke("add", &[FfiValue::Int(1)], "rust", "lua")?;

    assert_eq!(manager.type_cache_stats().entries, 0);
    let metrics = manager.get_metrics();
    assert_eq!(metrics.type_conversions, 1);
    assert_eq!(metrics.cache_hits + metrics.cache_misses, 0);
    Ok(())
}

#[test]
fn lazy_initialization_can_be_toggled() -> Result<()> {
    let manager = PerformanceManager::init(PerformanceConfig::default())?;
    assert!(!manager.config().enable_lazy_initialization);

    manager.set_feature("lazy_initialization", true)?;
    assert!(manager.config().enable_lazy_initialization);

    manager.set_feature("lazy_initialization", false)?;
    assert!(!manager.config().enable_lazy_initialization);
    Ok(())
}

#[test]
fn enabling_a_zero_sized_feature_is_rejected() -> Result<()> {
    let manager = PerformanceManager::init(PerformanceConfig {
        enable_call_caching: false,
        cache_size: 0,
        ..PerformanceConfig::default()
    })?;

    let err = manager
        .set_feature("caching", true)
        .expect_err("cache_size is zero");
    assert!(matches!(err, FfiError::InvalidParameter(_)));
    assert!(!manager.config().enable_call_caching);
    Ok(())
}

#[test]
fn invalid_config_is_rejected() {
    let result = PerformanceManager::init(PerformanceConfig {
        batch_size: 0,
        ..PerformanceConfig::default()
    });
    assert!(matches!(result, Err(FfiError::InvalidParameter(_))));
}

#[test]
fn reset_clears_counters_but_not_memory_estimate() -> Result<()> {
    let (manager, _dispatcher) = common::manager();
    manager.invoke("add", &[FfiValue::Int(1)], "rust", "c")?;
    assert!(manager.get_metrics().total_calls > 0);

    manager.reset_metrics();
    let metrics = manager.get_metrics();
    assert_eq!(metrics.total_calls, 0);
    assert_eq!(metrics.cache_misses, 0);
    assert_eq!(metrics.type_conversions, 0);
    assert!(metrics.memory_usage_bytes > 0);
    Ok(())
}

#[test]
fn memory_estimate_tracks_owned_data() -> Result<()> {
    let (manager, _dispatcher) = common::manager_with(PerformanceConfig {
        enable_lazy_initialization: true,
        ..PerformanceConfig::default()
    });
    let before = manager.get_metrics().memory_usage_bytes;

    let payload = "x".repeat(4096);
    manager.invoke("echo", &[FfiValue::from(payload.as_str())], "rust", "python")?;
    let after = manager.get_metrics().memory_usage_bytes;
    assert!(after >= before + 4096, "{before} -> {after}");

    manager.clear_cache();
    manager.clear_traces();
    assert!(manager.get_metrics().memory_usage_bytes < after);
    Ok(())
}

#[test]
fn json_export_contains_metrics_and_traces() -> Result<()> {
    let dir = temp_export_dir();
    let (manager, _dispatcher) = common::manager();
    manager.invoke("add", &[FfiValue::Int(1), FfiValue::Int(2)], "rust", "python")?;
    manager.invoke("add", &[FfiValue::Int(1), FfiValue::Int(2)], "rust", "python")?;

    let path = dir.path().join("perf.json");
    manager.export_data(&path, ExportFormat::Json)?;

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(report["metrics"]["total_calls"], 2);
    assert_eq!(report["metrics"]["cache_hits"], 1);
    let traces = report["traces"].as_array().expect("trace array");
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0]["function_name"], "add");
    assert_eq!(traces[0]["target_language"], "python");
    assert_eq!(traces[1]["cached"], true);
    assert_eq!(traces[1]["sequence"], 1);
    Ok(())
}

#[test]
fn csv_and_text_exports_are_written() -> Result<()> {
    let dir = temp_export_dir();
    let (manager, _dispatcher) = common::manager();
    manager.enqueue("batched", vec![FfiValue::Int(7)], "lua")?;
    manager.execute_batch()?;

    let csv_path = dir.path().join("perf.csv");
    manager.export_data(&csv_path, ExportFormat::Csv)?;
    let csv = fs::read_to_string(&csv_path)?;
    assert!(csv.starts_with("Metric,Value\n"));
    assert!(csv.contains("\n\nfunction_name,source_language,target_language,"));
    assert!(csv.contains("batched,rust,lua,"));

    let text_path = dir.path().join("perf.txt");
    manager.export_data(&text_path, ExportFormat::Text)?;
    let text = fs::read_to_string(&text_path)?;
    assert!(text.contains("batched_calls"));
    assert!(text.contains("Call Traces (1)"));
    Ok(())
}

#[test]
fn export_to_missing_directory_is_io_error() {
    let dir = temp_export_dir();
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");
    let path = dir.path().join("missing").join("perf.json");

    let err = manager
        .export_data(&path, ExportFormat::Json)
        .expect_err("parent directory does not exist");
    assert!(matches!(err, FfiError::Io(_)));
}

#[test]
fn cleanup_consumes_the_manager() -> Result<()> {
    let (manager, dispatcher) = common::manager();
    manager.enqueue("pending", vec![], "c")?;
    manager.cleanup();
    assert_eq!(dispatcher.calls(), 0);
    Ok(())
}

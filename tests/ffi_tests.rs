mod common;

use std::sync::Arc;

use anyhow::Result;
use common::RecordingDispatcher;
use polycall::{FfiError, FfiValue, OpaqueHandle, PerformanceConfig, PerformanceManager};

#[test]
fn repeated_call_is_served_from_cache() -> Result<()> {
    let (manager, dispatcher) = common::manager();
    let args = [FfiValue::Int(2), FfiValue::Int(3)];

    let first = manager.invoke("add", &args, "rust", "python")?;
    let second = manager.invoke("add", &args, "rust", "python")?;

    assert_eq!(first, FfiValue::Int(5));
    assert_eq!(second, first);
    assert_eq!(dispatcher.calls(), 1);

    let metrics = manager.get_metrics();
    assert_eq!(metrics.total_calls, 2);
    assert_eq!(metrics.cache_hits, 1);
    assert_eq!(metrics.cache_misses, 1);
    assert_eq!(metrics.type_conversions, 4);

    let traces = manager.get_traces();
    assert_eq!(traces.len(), 2);
    assert!(!traces[0].cached);
    assert!(traces[1].cached);
    assert!(traces.iter().all(|trace| trace.arg_count == 2));
    Ok(())
}

#[test]
fn different_arguments_dispatch_again() -> Result<()> {
    let (manager, dispatcher) = common::manager();
    manager.invoke("greet", &[FfiValue::from("ada")], "rust", "lua")?;
    let other = manager.invoke("greet", &[FfiValue::from("grace")], "rust", "lua")?;

    assert_eq!(other, FfiValue::from("greet(grace)"));
    assert_eq!(dispatcher.calls(), 2);
    assert_eq!(dispatcher.log(), vec!["lua:greet", "lua:greet"]);
    Ok(())
}

#[test]
fn opaque_arguments_key_by_address() -> Result<()> {
    let (manager, dispatcher) = common::manager();
    let first = FfiValue::Opaque(OpaqueHandle::from_addr(0x1000));
    let second = FfiValue::Opaque(OpaqueHandle::from_addr(0x2000));

    manager.invoke("release", &[first.clone()], "rust", "c")?;
    manager.invoke("release", &[first], "rust", "c")?;
    manager.invoke("release", &[second], "rust", "c")?;

    assert_eq!(dispatcher.calls(), 2);
    Ok(())
}

#[test]
fn failed_dispatch_is_not_cached() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");
    manager
        .attach_dispatcher(RecordingDispatcher::failing_on("explode"))
        .expect("attach");

    for _ in 0..2 {
        let err = manager
            .invoke("explode", &[], "rust", "java")
            .expect_err("dispatch fails");
        assert!(matches!(err, FfiError::Dispatch(_)));
    }

    assert_eq!(manager.cache_stats().entries, 0);
    assert_eq!(manager.trace_count(), 2);
    assert_eq!(manager.get_metrics().total_calls, 2);
}

#[test]
fn invoke_requires_a_dispatcher() {
    let manager = PerformanceManager::init(PerformanceConfig::default()).expect("valid config");
    let err = manager
        .invoke("add", &[], "rust", "c")
        .expect_err("no dispatcher attached");
    assert!(matches!(err, FfiError::NotInitialized(_)));
    assert_eq!(manager.trace_count(), 0);
}

#[test]
fn second_dispatcher_is_rejected_until_detached() {
    let (manager, _dispatcher) = common::manager();
    let err = manager
        .attach_dispatcher(RecordingDispatcher::new())
        .expect_err("already attached");
    assert!(matches!(err, FfiError::AlreadyInitialized(_)));

    assert!(manager.detach_dispatcher().is_some());
    assert!(manager.attach_dispatcher(RecordingDispatcher::new()).is_ok());
}

#[test]
fn closures_can_dispatch() -> Result<()> {
    let manager = PerformanceManager::init(PerformanceConfig::default())?;
    manager.attach_dispatcher(Arc::new(
        |name: &str, args: &[FfiValue], _target: &str| -> polycall::Result<FfiValue> {
            Ok(FfiValue::from(format!("{name}/{}", args.len())))
        },
    ))?;

    let value = manager.invoke("describe", &[FfiValue::Bool(true)], "rust", "js")?;
    assert_eq!(value.as_str(), Some("describe/1"));
    Ok(())
}

#[test]
fn empty_function_name_is_rejected() {
    let (manager, dispatcher) = common::manager();
    let err = manager
        .invoke("  ", &[], "rust", "c")
        .expect_err("blank name");
    assert!(matches!(err, FfiError::InvalidParameter(_)));
    assert_eq!(dispatcher.calls(), 0);
}

#[test]
fn hot_function_registration_is_accepted() -> Result<()> {
    let (manager, _dispatcher) = common::manager();
    manager.register_hot_function("add", polycall::OptimizationLevel::Aggressive)?;
    assert!(manager.register_hot_function("", polycall::OptimizationLevel::Basic).is_err());
    assert_eq!(manager.get_metrics().total_calls, 0);
    Ok(())
}

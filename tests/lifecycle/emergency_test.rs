/*!
 * Emergency Cleanup Tests
 * Telemetry breaches and forced cleanup
 */

use crate::common::{active, active_with, harness, RecordingComponent, MINUTE_MS};
use lifecycle_kernel::{
    Component, HookResult, LifecycleError, ManagerConfig, ResourceKind, TelemetryOutcome,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_breach_clears_every_cache_once() {
    let h = active();
    let theme = Arc::new(RecordingComponent::default());
    let history = Arc::new(RecordingComponent::default());
    h.manager.register_component("theme", theme.clone()).expect("register");
    h.manager.register_component("history", history.clone()).expect("register");

    h.host.set_memory_mb(180, 512);
    let outcome = h.manager.sample_telemetry().expect("active");
    assert!(outcome.is_breach());
    assert_eq!(theme.cache_clears(), 1);
    assert_eq!(history.cache_clears(), 1);

    h.manager.sample_telemetry().expect("active");
    assert_eq!(theme.cache_clears(), 2);
    assert_eq!(history.cache_clears(), 2);
}

#[test]
fn test_upkeep_sampling_triggers_emergency() {
    let h = active();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("panel", panel.clone()).expect("register");
    h.host.set_memory_mb(200, 512);

    // Telemetry fires every 2 minutes; the first sweep is at 10
    h.host.advance(5 * MINUTE_MS);
    assert_eq!(panel.cache_clears(), 2);

    let stats = h.manager.report().telemetry.expect("session telemetry");
    assert_eq!(stats.samples, 2);
    assert_eq!(stats.breaches, 2);
}

#[test]
fn test_elevated_usage_only_logs() {
    let h = active();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("panel", panel.clone()).expect("register");

    h.host.set_memory_mb(120, 512);
    assert!(matches!(
        h.manager.sample_telemetry().expect("active"),
        TelemetryOutcome::Elevated(_)
    ));

    h.host.set_memory_mb(150, 512);
    assert!(!h.manager.sample_telemetry().expect("active").is_breach());
    assert_eq!(panel.cache_clears(), 0);
}

#[test]
fn test_unavailable_telemetry_is_noop() {
    let h = active();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("panel", panel.clone()).expect("register");

    assert_eq!(
        h.manager.sample_telemetry().expect("active"),
        TelemetryOutcome::Unavailable
    );
    assert_eq!(panel.cache_clears(), 0);
}

#[test]
fn test_emergency_cancels_all_stale_repeating() {
    let h = active();
    let a = h.ambient.schedule_repeating(1_000, || {});
    let b = h.ambient.schedule_repeating(5_000, || {});
    let one_shot = h.ambient.schedule_once(3 * 60 * MINUTE_MS, || {});

    // No upkeep sweep sees either timer past the threshold before 61 minutes
    h.host.advance(61 * MINUTE_MS);
    let fresh = h.ambient.schedule_repeating(1_000, || {});

    h.host.set_gc_supported(true);
    let result = h.manager.force_cleanup().expect("active");

    assert_eq!(result.stats.freed_of(ResourceKind::Timer), 2);
    assert!(!h.host.is_scheduled(a));
    assert!(!h.host.is_scheduled(b));
    assert!(h.host.is_scheduled(one_shot));
    assert!(h.host.is_scheduled(fresh));
    assert_eq!(h.host.gc_requests(), 1);
    assert_eq!(h.timers(), 2);
}

#[derive(Default)]
struct CacheOnly {
    clears: AtomicUsize,
}

impl Component for CacheOnly {
    fn clear_cache(&self) -> Option<HookResult> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }
}

#[test]
fn test_force_cleanup_keeps_cache_only_component() {
    let h = active();
    let cache = Arc::new(CacheOnly::default());
    h.manager.register_component("prompt-cache", cache.clone()).expect("register");

    let result = h.manager.force_cleanup().expect("active");

    assert_eq!(cache.clears.load(Ordering::SeqCst), 1);
    assert_eq!(result.stats.hooks_invoked, 1);
    assert_eq!(h.manager.counts().components, 1);
}

struct PanickingCache;

impl Component for PanickingCache {
    fn clear_cache(&self) -> Option<HookResult> {
        panic!("cache store poisoned");
    }
}

#[test]
fn test_cache_hook_panic_isolated() {
    let h = active();
    let healthy = Arc::new(RecordingComponent::default());
    h.manager.register_component("broken", Arc::new(PanickingCache)).expect("register");
    h.manager.register_component("healthy", healthy.clone()).expect("register");

    let result = h.manager.force_cleanup().expect("active");

    assert_eq!(result.stats.errors_encountered, 1);
    assert_eq!(healthy.cache_clears(), 1);
    assert!(!result.is_success());
}

#[test]
fn test_force_cleanup_requires_active() {
    let h = harness();
    assert!(matches!(
        h.manager.force_cleanup(),
        Err(LifecycleError::InvalidState { .. })
    ));

    h.manager.init(ManagerConfig::default()).expect("init");
    h.manager.destroy();
    assert!(matches!(
        h.manager.force_cleanup(),
        Err(LifecycleError::InvalidState { .. })
    ));
}

#[test]
fn test_low_warning_threshold_from_json() {
    let config = ManagerConfig::from_json_str(r#"{"memoryWarningThresholdMB": 80}"#)
        .expect("warning threshold alone is enough");
    let h = active_with(config);
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("panel", panel.clone()).expect("register");

    h.host.set_memory_mb(60, 512);
    assert!(matches!(
        h.manager.sample_telemetry().expect("active"),
        TelemetryOutcome::Elevated(_)
    ));
    assert_eq!(panel.cache_clears(), 0);

    h.host.set_memory_mb(90, 512);
    assert!(h.manager.sample_telemetry().expect("active").is_breach());
    assert_eq!(panel.cache_clears(), 1);
}

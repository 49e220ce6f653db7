/*!
 * Teardown Tests
 * Full teardown releases everything, restores the originals and is terminal
 */

use crate::common::{active, harness, FireCounter, RecordingComponent, MINUTE_MS};
use lifecycle_kernel::{
    Ambient, Component, HookError, HookResult, LifecycleError, LifecycleManager, ManagerConfig,
    ManagerState, Observer, ResourceKind,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_no_callback_fires_after_teardown() {
    let h = active();
    let counter = FireCounter::default();

    h.ambient.schedule_repeating(1_000, counter.callback());
    h.ambient.schedule_repeating(250, counter.callback());
    h.ambient.schedule_once(5_000, counter.callback());
    assert_eq!(h.timers(), 3);

    h.host.advance(1_000);
    let before = counter.get();
    assert_eq!(before, 5);

    let result = h.manager.destroy().expect("first destroy tears down");
    assert_eq!(result.stats.freed_of(ResourceKind::Timer), 3);
    assert_eq!(h.timers(), 0);

    // Upkeep timers are gone too
    assert_eq!(h.host.live_timers(), 0);

    h.host.advance(10 * MINUTE_MS);
    assert_eq!(counter.get(), before, "cancelled timers must stay silent");
}

#[test]
fn test_destroy_twice_restores_once() {
    let h = active();
    assert!(!h.ambient.is_bound(&h.host_caps()));
    assert!(h.manager.is_intercepting());

    assert!(h.manager.destroy().is_some());
    assert!(h.ambient.is_bound(&h.host_caps()));
    assert!(!h.manager.is_intercepting());

    assert!(h.manager.destroy().is_none());
    assert!(h.ambient.is_bound(&h.host_caps()));
    assert_eq!(h.manager.state(), ManagerState::Destroyed);
}

#[test]
fn test_init_after_destroy_rejected() {
    let h = active();
    h.manager.destroy();

    let err = h
        .manager
        .init(ManagerConfig::default())
        .expect_err("destroyed is terminal");
    assert_eq!(err.to_string(), "Cannot init while manager is destroyed");
    assert!(h.ambient.is_bound(&h.host_caps()));
}

#[test]
fn test_second_manager_on_same_slot_is_refused() {
    let h = active();
    let second = LifecycleManager::builder(h.ambient.clone())
        .with_clock(h.host.clone())
        .with_unload_target(h.window.clone())
        .build();
    let live = h.host.live_timers();

    let err = second
        .init(ManagerConfig::default())
        .expect_err("slot already tracked");
    assert!(matches!(err, LifecycleError::AlreadyInstalled));
    assert_eq!(second.state(), ManagerState::Uninitialized);
    // No upkeep timers or unload binding left behind by the refused init
    assert_eq!(h.host.live_timers(), live);
    assert_eq!(h.host.binding_count(&h.window, "unload"), 1);

    h.ambient.schedule_repeating(1_000, || {});
    assert_eq!(h.timers(), 1);
    assert_eq!(second.counts().timers, 0);

    h.manager.destroy().expect("teardown");
    assert!(h.ambient.is_bound(&h.host_caps()));

    second.init(ManagerConfig::default()).expect("slot is free again");
    h.ambient.schedule_repeating(1_000, || {});
    assert_eq!(second.counts().timers, 1);
    assert_eq!(h.timers(), 0, "destroyed manager records nothing new");

    second.destroy().expect("teardown");
    assert!(h.ambient.is_bound(&h.host_caps()));
    assert_eq!(h.host.live_timers(), 0);
}

#[test]
fn test_handles_from_before_install_stay_valid() {
    let h = harness();
    let counter = FireCounter::default();
    let early = h.ambient.schedule_repeating(100, counter.callback());

    h.manager.init(ManagerConfig::default()).expect("init");
    assert_eq!(h.timers(), 0);

    h.manager.destroy();
    assert!(h.host.is_scheduled(early), "untracked timers are not torn down");

    h.ambient.cancel_repeating(early);
    assert!(!h.host.is_scheduled(early));
}

#[test]
fn test_unload_event_tears_down() {
    let h = active();
    h.ambient.schedule_repeating(1_000, || {});
    assert_eq!(h.host.total_bindings(), 1);

    assert_eq!(h.host.dispatch(&h.window, "unload"), 1);

    assert_eq!(h.manager.state(), ManagerState::Destroyed);
    assert_eq!(h.timers(), 0);
    assert_eq!(h.host.live_timers(), 0);
    assert_eq!(h.host.total_bindings(), 0);
    assert!(h.ambient.is_bound(&h.host_caps()));
}

#[derive(Default)]
struct ReleaseLog {
    disconnects: AtomicUsize,
    stops: AtomicUsize,
    closes: AtomicUsize,
}

struct Disconnectable(Arc<ReleaseLog>);

impl Observer for Disconnectable {
    fn disconnect(&self) -> Option<HookResult> {
        self.0.disconnects.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }

    fn stop(&self) -> Option<HookResult> {
        self.0.stops.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }
}

struct Closeable(Arc<ReleaseLog>);

impl Observer for Closeable {
    fn close(&self) -> Option<HookResult> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }
}

struct Broken;

impl Observer for Broken {
    fn disconnect(&self) -> Option<HookResult> {
        panic!("observer already detached");
    }
}

struct Inert;

impl Observer for Inert {}

#[test]
fn test_observer_release_uses_first_available() {
    let h = active();
    let log = Arc::new(ReleaseLog::default());

    h.manager
        .register_observer(Arc::new(Disconnectable(log.clone())), "mutation-watch")
        .expect("register");
    h.manager
        .register_observer(Arc::new(Closeable(log.clone())), "resize-watch")
        .expect("register");
    h.manager
        .register_observer(Arc::new(Broken), "intersection-watch")
        .expect("register");
    h.manager
        .register_observer(Arc::new(Inert), "noop-watch")
        .expect("register");

    let result = h.manager.destroy().expect("teardown");

    assert_eq!(log.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(log.stops.load(Ordering::SeqCst), 0);
    assert_eq!(log.closes.load(Ordering::SeqCst), 1);
    assert_eq!(result.stats.freed_of(ResourceKind::Observer), 4);
    assert_eq!(result.stats.errors_encountered, 1);
    assert_eq!(h.manager.counts().observers, 0);
}

struct CleanupOnly(AtomicUsize);

impl Component for CleanupOnly {
    fn cleanup(&self) -> Option<HookResult> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }
}

struct FailingDestroy;

impl Component for FailingDestroy {
    fn destroy(&self) -> Option<HookResult> {
        Some(Err(HookError::new("node already removed")))
    }
}

#[test]
fn test_component_hooks_isolated() {
    let h = active();
    let fallback = Arc::new(CleanupOnly(AtomicUsize::new(0)));
    let healthy = Arc::new(RecordingComponent::default());

    h.manager.register_component("fallback", fallback.clone()).expect("register");
    h.manager.register_component("failing", Arc::new(FailingDestroy)).expect("register");
    h.manager.register_component("healthy", healthy.clone()).expect("register");

    let result = h.manager.destroy().expect("teardown");

    assert_eq!(fallback.0.load(Ordering::SeqCst), 1);
    assert_eq!(healthy.destroys(), 1);
    assert_eq!(result.stats.errors_encountered, 1);
    assert_eq!(result.stats.freed_of(ResourceKind::Component), 3);
    assert_eq!(h.manager.counts().components, 0);
}

struct SpawnsOnDestroy(Ambient);

impl Component for SpawnsOnDestroy {
    fn destroy(&self) -> Option<HookResult> {
        self.0.schedule_once(1_000, || {});
        Some(Ok(()))
    }
}

#[test]
fn test_resources_created_during_teardown_are_released() {
    let h = active();
    h.manager
        .register_component("eager", Arc::new(SpawnsOnDestroy(h.ambient.clone())))
        .expect("register");

    h.manager.destroy().expect("teardown");

    assert_eq!(h.timers(), 0);
    assert_eq!(h.host.live_timers(), 0);
}

#[test]
fn test_failed_listener_removal_still_drops_record() {
    let h = active();
    let button = lifecycle_kernel::Target::element(7, "submit");
    let handler = lifecycle_kernel::Handler::new(|_e: &lifecycle_kernel::Event| {});
    h.ambient.add_listener(&button, "click", &handler);

    h.host.set_fail_removals(true);
    let result = h.manager.destroy().expect("teardown");

    assert_eq!(h.manager.counts().listeners, 0);
    assert_eq!(result.stats.freed_of(ResourceKind::Listener), 1);
    // The listener and the unload binding both fail to detach
    assert_eq!(result.stats.errors_encountered, 2);
}

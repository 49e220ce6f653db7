/*!
 * Registration Surface Tests
 */

use crate::common::{active, harness, RecordingComponent};
use lifecycle_kernel::{Component, LifecycleError, ManagerConfig, ManagerState, Observer};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Watch;

impl Observer for Watch {}

#[test]
fn test_timer_register_then_cancel_is_net_zero() {
    let h = active();
    let before = h.manager.counts();

    let repeating = h.ambient.schedule_repeating(500, || {});
    let once = h.ambient.schedule_once(500, || {});
    assert_eq!(h.timers(), before.timers + 2);

    h.ambient.cancel_repeating(repeating);
    h.ambient.cancel_once(once);
    assert_eq!(h.manager.counts(), before);
}

#[test]
fn test_components_registered_before_init_are_tracked() {
    let h = harness();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("stats", panel.clone()).expect("register");
    assert_eq!(h.manager.state(), ManagerState::Uninitialized);

    h.manager.init(ManagerConfig::default()).expect("init");
    h.manager.force_cleanup().expect("active");
    assert_eq!(panel.cache_clears(), 1);
}

#[test]
fn test_registration_rejected_after_destroy() {
    let h = active();
    h.manager.destroy();

    let err = h
        .manager
        .register_component("late", Arc::new(RecordingComponent::default()))
        .expect_err("destroyed");
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert!(h.manager.register_observer(Arc::new(Watch), "late-watch").is_err());
    assert_eq!(h.manager.counts().total(), 0);
}

#[test]
fn test_component_name_is_unique() {
    let h = active();
    let first = Arc::new(RecordingComponent::default());
    let second = Arc::new(RecordingComponent::default());

    h.manager.register_component("theme", first.clone()).expect("register");
    h.manager.register_component("theme", second.clone()).expect("register");
    assert_eq!(h.manager.counts().components, 1);

    h.manager.destroy();
    assert_eq!(first.destroys(), 0);
    assert_eq!(second.destroys(), 1);
}

#[test]
fn test_unregister_skips_hooks() {
    let h = active();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("auth", panel.clone()).expect("register");

    assert!(h.manager.unregister_component("auth"));
    assert!(!h.manager.unregister_component("auth"));

    h.manager.destroy();
    assert_eq!(panel.destroys(), 0);
}

#[test]
fn test_observer_registered_once_per_allocation() {
    let h = active();
    let watch: Arc<dyn Observer> = Arc::new(Watch);

    let id = h
        .manager
        .register_observer(watch.clone(), "mutation-watch")
        .expect("register");
    let again = h
        .manager
        .register_observer(watch, "mutation-watch")
        .expect("register");
    assert_eq!(id, again);
    assert_eq!(h.manager.counts().observers, 1);

    assert!(h.manager.unregister_observer(id));
    assert_eq!(h.manager.counts().observers, 0);
}

/// Component that reports its own liveness
struct SelfDestructing(AtomicBool);

impl Component for SelfDestructing {
    fn is_destroyed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn test_self_reported_destroyed_component_swept() {
    let h = active();
    let modal = Arc::new(SelfDestructing(AtomicBool::new(false)));
    h.manager.register_component("modal", modal.clone()).expect("register");

    h.manager.run_periodic_sweep().expect("active");
    assert_eq!(h.manager.counts().components, 1);

    modal.0.store(true, Ordering::SeqCst);
    h.manager.run_periodic_sweep().expect("active");
    assert_eq!(h.manager.counts().components, 0);
}

#[test]
fn test_destroy_component_is_idempotent() {
    let h = active();
    let panel = Arc::new(RecordingComponent::default());
    h.manager.register_component("enhancer", panel.clone()).expect("register");

    assert!(h.manager.destroy_component("enhancer").expect("hook"));
    assert!(h.manager.destroy_component("enhancer").expect("hook"));
    assert!(!h.manager.destroy_component("missing").expect("no hook"));
    assert_eq!(panel.destroys(), 1);

    // Already destroyed components are not destroyed again on teardown
    h.manager.destroy();
    assert_eq!(panel.destroys(), 1);
}

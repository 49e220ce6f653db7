/*!
 * Diagnostics Tests
 */

use crate::common::{active, harness, RecordingComponent};
use lifecycle_kernel::{ManagerState, Observer, Target, TimerKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Watch;

impl Observer for Watch {}

#[test]
fn test_report_reflects_registrations_immediately() {
    let h = active();
    h.ambient.schedule_repeating(1_000, || {});
    h.host.advance(400);
    h.ambient.schedule_once(2_000, || {});
    h.ambient.add_listener(
        &Target::element(11, "history-list"),
        "scroll",
        &lifecycle_kernel::Handler::labeled("on_history_scroll", |_e| {}),
    );
    h.manager
        .register_observer(Arc::new(Watch), "mutation-watch")
        .expect("register");
    h.manager
        .register_component("history", Arc::new(RecordingComponent::default()))
        .expect("register");

    let report = h.manager.report();
    assert_eq!(report.state, ManagerState::Active);
    assert!(report.interception_installed);
    assert_eq!(report.total(), 5);
    assert_eq!(report.timestamp_ms, 400);

    let kinds: Vec<_> = report.timers.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TimerKind::Repeating, TimerKind::Once]);
    assert_eq!(report.timers[0].age_ms, 400);
    assert_eq!(report.listeners[0].event_type, "scroll");
    assert_eq!(report.listeners[0].target_label, "history-list");
    assert_eq!(report.observers[0].kind_tag, "mutation-watch");
    assert_eq!(report.components[0].name, "history");
    assert!(!report.components[0].destroyed);
}

#[test]
fn test_report_is_pure_read() {
    let h = active();
    h.ambient.schedule_repeating(1_000, || {});

    let first = h.manager.report();
    let second = h.manager.report();
    assert_eq!(first, second);
}

#[test]
fn test_report_json_after_teardown() {
    let h = active();
    h.ambient.schedule_repeating(1_000, || {});
    h.manager.destroy();

    let report = h.manager.report();
    assert_eq!(report.state, ManagerState::Destroyed);
    assert!(!report.interception_installed);
    assert_eq!(report.total(), 0);

    let json = report.to_json().expect("serializable");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["state"], "destroyed");
    assert_eq!(value["counts"]["timers"], 0);
}

#[test]
fn test_report_before_init() {
    let h = harness();
    let report = h.manager.report();
    assert_eq!(report.state, ManagerState::Uninitialized);
    assert!(report.telemetry.is_none());
}

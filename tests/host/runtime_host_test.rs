/*!
 * Runtime Host Tests
 * Tokio-backed timers and bindings, with the manager on top
 */

use lifecycle_kernel::{
    Ambient, Capabilities, Event, Handler, LifecycleManager, ManagerConfig, RuntimeHost, Target,
    TimerCallback,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn counting() -> (TimerCallback, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let callback: TimerCallback = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (callback, fired)
}

#[tokio::test(start_paused = true)]
async fn test_repeating_timer_fires_until_cancelled() {
    let host = RuntimeHost::current().expect("inside runtime");
    let (callback, fired) = counting();

    let handle = host.schedule_repeating(callback, 100);
    sleep(Duration::from_millis(350)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 3);

    host.cancel_repeating(handle);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert_eq!(host.live_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_fires_once_and_forgets() {
    let host = RuntimeHost::current().expect("inside runtime");
    let (callback, fired) = counting();

    host.schedule_once(callback, 50);
    assert_eq!(host.live_timers(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(host.live_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_one_shot_never_fires() {
    let host = RuntimeHost::current().expect("inside runtime");
    let (callback, fired) = counting();

    let handle = host.schedule_once(callback, 50);
    host.cancel_once(handle);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bindings_dispatch() {
    let host = RuntimeHost::current().expect("inside runtime");
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let handler = Handler::new(move |_e: &Event| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let target = Target::document(1);

    host.add_binding(&target, "visibilitychange", &handler, Default::default());
    assert_eq!(host.dispatch(&target, "visibilitychange"), 1);

    host.remove_binding(&target, "visibilitychange", &handler, Default::default())
        .expect("removal");
    assert_eq!(host.dispatch(&target, "visibilitychange"), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manager_teardown_over_runtime_host() {
    let host = Arc::new(RuntimeHost::current().expect("inside runtime"));
    let ambient = Ambient::new(host.clone());
    let manager = LifecycleManager::builder(ambient.clone()).build();
    manager.init(ManagerConfig::default()).expect("init");

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    ambient.schedule_repeating(100, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(manager.counts().timers, 1);
    // Sweep upkeep plus the tracked timer
    assert_eq!(host.live_timers(), 2);

    sleep(Duration::from_millis(250)).await;
    let before = fired.load(Ordering::SeqCst);
    assert_eq!(before, 2);

    manager.destroy().expect("teardown");
    assert_eq!(host.live_timers(), 0);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(fired.load(Ordering::SeqCst), before);
}

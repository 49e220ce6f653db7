/*!
 * Shared fixtures for lifecycle tests
 */

#![allow(dead_code)]

use lifecycle_kernel::{
    Ambient, Capabilities, Component, HookResult, LifecycleManager, ManagerConfig, MemoryProbe,
    SimulatedHost, Target,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MINUTE_MS: u64 = 60_000;

pub struct Harness {
    pub host: Arc<SimulatedHost>,
    pub ambient: Ambient,
    pub manager: LifecycleManager,
    pub window: Target,
}

impl Harness {
    /// Host capabilities as the ambient slot originally bound them
    pub fn host_caps(&self) -> Arc<dyn Capabilities> {
        self.host.clone()
    }

    pub fn timers(&self) -> usize {
        self.manager.counts().timers
    }
}

/// Manager over a simulated host with telemetry and an unload target, not yet initialized
pub fn harness() -> Harness {
    lifecycle_kernel::init_tracing();

    let host = Arc::new(SimulatedHost::new());
    let ambient = Ambient::new(host.clone());
    let window = Target::window(0);
    let manager = LifecycleManager::builder(ambient.clone())
        .with_clock(host.clone())
        .with_memory_probe(host.clone() as Arc<dyn MemoryProbe>)
        .with_unload_target(window.clone())
        .build();

    Harness {
        host,
        ambient,
        manager,
        window,
    }
}

/// Initialized harness with default configuration
pub fn active() -> Harness {
    active_with(ManagerConfig::default())
}

pub fn active_with(config: ManagerConfig) -> Harness {
    let harness = harness();
    harness.manager.init(config).expect("init should succeed");
    harness
}

/// Counts how often the callback it hands out has run
#[derive(Clone, Default)]
pub struct FireCounter(Arc<AtomicUsize>);

impl FireCounter {
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let count = self.0.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Component recording every hook invocation
#[derive(Default)]
pub struct RecordingComponent {
    pub cache_clears: AtomicUsize,
    pub destroys: AtomicUsize,
}

impl RecordingComponent {
    pub fn cache_clears(&self) -> usize {
        self.cache_clears.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl Component for RecordingComponent {
    fn destroy(&self) -> Option<HookResult> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }

    fn clear_cache(&self) -> Option<HookResult> {
        self.cache_clears.fetch_add(1, Ordering::SeqCst);
        Some(Ok(()))
    }
}

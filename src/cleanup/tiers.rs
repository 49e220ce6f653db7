/*!
 * Cleanup Tiers
 * Periodic sweep, emergency cleanup and full teardown over the registry
 */

use super::hooks::{run_hook, HookOutcome};
use super::{CleanupResult, CleanupTier};
use crate::core::config::ManagerConfig;
use crate::core::types::{Millis, ResourceKind, TimerKind};
use crate::host::{Capabilities, Clock, MemoryProbe};
use crate::monitoring::{span_operation, OperationSpan};
use crate::registry::{ComponentRecord, Registry, TimerRecord};
use log::{debug, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Age thresholds the tiers apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    pub one_shot_grace_ms: Millis,
    pub stale_repeating_ms: Millis,
}

impl From<&ManagerConfig> for CleanupPolicy {
    fn from(config: &ManagerConfig) -> Self {
        Self {
            one_shot_grace_ms: config.one_shot_grace_ms,
            stale_repeating_ms: config.stale_repeating_timer_ms,
        }
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::from(&ManagerConfig::default())
    }
}

/// Runs the cleanup tiers
///
/// Every host call goes through the originals passed in, never through the
/// ambient slot, so releases are not themselves intercepted.
pub struct CleanupScheduler {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    probe: Option<Arc<dyn MemoryProbe>>,
    policy: CleanupPolicy,
}

impl CleanupScheduler {
    pub fn new(
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
        probe: Option<Arc<dyn MemoryProbe>>,
        policy: CleanupPolicy,
    ) -> Self {
        Self {
            registry,
            clock,
            probe,
            policy,
        }
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Periodic health sweep
    pub fn periodic_sweep(&self, originals: &dyn Capabilities) -> CleanupResult {
        let span = span_operation("cleanup.periodic_sweep");
        let _entered = span.enter();
        let start = Instant::now();
        let mut result = CleanupResult::new(CleanupTier::PeriodicSweep);
        let now = self.clock.now_ms();

        for spent in self
            .registry
            .take_spent_once(now, self.policy.one_shot_grace_ms)
        {
            debug!("Dropped spent one-shot {}", spent.handle);
            result.stats.freed(ResourceKind::Timer);
        }

        if let Some(oldest) = self
            .registry
            .stale_repeating(now, self.policy.stale_repeating_ms)
            .into_iter()
            .next()
        {
            self.evict_repeating(originals, &oldest, now, &mut result);
        }

        self.clear_caches(&mut result);

        for component in self.registry.components() {
            if component.is_destroyed()
                && self.registry.unregister_component(&component.name).is_some()
            {
                debug!("Removed destroyed component {}", component.name);
                result.stats.freed(ResourceKind::Component);
            }
        }

        result.stats.cleanup_duration_micros = start.elapsed().as_micros() as u64;
        record_on_span(&span, &result);
        info!("{}", result);
        result
    }

    /// Memory-pressure cleanup
    pub fn emergency(&self, originals: &dyn Capabilities) -> CleanupResult {
        let span = span_operation("cleanup.emergency");
        let _entered = span.enter();
        let start = Instant::now();
        let mut result = CleanupResult::new(CleanupTier::Emergency);
        let now = self.clock.now_ms();

        self.clear_caches(&mut result);

        for stale in self
            .registry
            .stale_repeating(now, self.policy.stale_repeating_ms)
        {
            self.evict_repeating(originals, &stale, now, &mut result);
        }

        match &self.probe {
            Some(probe) if probe.request_gc() => debug!("Host accepted GC hint"),
            Some(_) => debug!("Host declined GC hint"),
            None => debug!("No GC hint capability"),
        }

        result.stats.cleanup_duration_micros = start.elapsed().as_micros() as u64;
        record_on_span(&span, &result);
        warn!("{}", result);
        result
    }

    /// Release every tracked resource
    pub fn teardown(&self, originals: &dyn Capabilities) -> CleanupResult {
        let span = span_operation("cleanup.teardown");
        let _entered = span.enter();
        let start = Instant::now();
        let mut result = CleanupResult::new(CleanupTier::Teardown);

        for timer in self.registry.drain_timers() {
            match timer.kind {
                TimerKind::Repeating => originals.cancel_repeating(timer.handle),
                TimerKind::Once => originals.cancel_once(timer.handle),
            }
            result.stats.freed(ResourceKind::Timer);
        }

        for listener in self.registry.drain_listeners() {
            let released = catch_unwind(AssertUnwindSafe(|| {
                originals.remove_binding(
                    &listener.target,
                    &listener.event_type,
                    &listener.handler,
                    listener.options,
                )
            }));
            match released {
                Ok(Ok(())) => {}
                Ok(Err(e)) => result.record_error(format!(
                    "listener {} on {}: {}",
                    listener.event_type, listener.target, e
                )),
                Err(_) => result.record_error(format!(
                    "listener {} on {}: removal panicked",
                    listener.event_type, listener.target
                )),
            }
            result.stats.freed(ResourceKind::Listener);
        }

        for record in self.registry.drain_observers() {
            let name = format!("{} ({})", record.id, record.kind_tag);
            let observer = &record.observer;

            let mut outcome = run_hook(&name, "disconnect", || observer.disconnect());
            if !outcome.ran() {
                outcome = run_hook(&name, "stop", || observer.stop());
            }
            if !outcome.ran() {
                outcome = run_hook(&name, "close", || observer.close());
            }

            if !outcome.ran() {
                debug!("{} exposes no release method", name);
            }
            tally(outcome.into_release_failure(), &mut result);
            result.stats.freed(ResourceKind::Observer);
        }

        for component in self.registry.drain_components() {
            if !component.is_destroyed() {
                tally(self.destroy_instance(&component), &mut result);
            }
            result.stats.freed(ResourceKind::Component);
        }

        result.stats.cleanup_duration_micros = start.elapsed().as_micros() as u64;
        record_on_span(&span, &result);
        info!("{}", result);
        result
    }

    /// Run a component's destroy hook, falling back to cleanup
    pub fn destroy_instance(&self, component: &ComponentRecord) -> HookOutcome {
        let name = format!("component {}", component.name);
        let instance = &component.instance;

        let outcome = run_hook(&name, "destroy", || instance.destroy());
        if outcome.ran() {
            return outcome;
        }
        run_hook(&name, "cleanup", || instance.cleanup())
    }

    fn clear_caches(&self, result: &mut CleanupResult) {
        for component in self.registry.components() {
            if component.is_destroyed() {
                continue;
            }
            let name = format!("component {}", component.name);
            let outcome = run_hook(&name, "clear_cache", || component.instance.clear_cache());
            tally(outcome, result);
        }
    }

    fn evict_repeating(
        &self,
        originals: &dyn Capabilities,
        timer: &TimerRecord,
        now: Millis,
        result: &mut CleanupResult,
    ) {
        originals.cancel_repeating(timer.handle);
        if self.registry.unregister_timer(timer.handle).is_some() {
            info!(
                "Cancelled stale repeating {} (age {}ms, every {}ms)",
                timer.handle,
                timer.age_ms(now),
                timer.delay_ms
            );
            result.stats.freed(ResourceKind::Timer);
        }
    }
}

fn record_on_span(span: &OperationSpan, result: &CleanupResult) {
    span.record_items_processed(result.stats.resources_freed);
    if !result.errors.is_empty() {
        span.record_error(&result.errors.join("; "));
    }
}

fn tally(outcome: HookOutcome, result: &mut CleanupResult) {
    match outcome {
        HookOutcome::Absent => {}
        HookOutcome::Completed => result.stats.hooks_invoked += 1,
        HookOutcome::Failed(e) => {
            result.stats.hooks_invoked += 1;
            result.record_error(e.to_string());
        }
    }
}

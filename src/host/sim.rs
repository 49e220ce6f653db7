/*!
 * Simulated Host
 * Deterministic virtual-time host for tests and replayable scenarios
 */

use super::bindings::BindingTable;
use super::{Capabilities, Clock, MemoryProbe, MemoryUsage};
use crate::core::errors::{HostError, HostResult};
use crate::core::limits::MIN_REPEAT_INTERVAL_MS;
use crate::core::types::{
    BindingOptions, Event, Handler, Millis, Target, TimerCallback, TimerHandle, TimerKind,
};
use ahash::HashMap;
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

struct SimTimer {
    kind: TimerKind,
    delay_ms: Millis,
    due_ms: Millis,
    callback: TimerCallback,
}

#[derive(Default)]
struct SimState {
    now_ms: Millis,
    next_handle: u64,
    timers: HashMap<TimerHandle, SimTimer>,
}

/// Virtual-time host
///
/// Time only moves through `advance`. Timers fire in (due time, handle) order
/// and callbacks run without any host lock held, so they may schedule or
/// cancel freely.
pub struct SimulatedHost {
    state: Mutex<SimState>,
    bindings: BindingTable,
    memory: Mutex<Option<MemoryUsage>>,
    gc_supported: AtomicBool,
    gc_requests: AtomicUsize,
    fired: AtomicU64,
    fail_removals: AtomicBool,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                next_handle: 1,
                ..SimState::default()
            }),
            bindings: BindingTable::new(),
            memory: Mutex::new(None),
            gc_supported: AtomicBool::new(false),
            gc_requests: AtomicUsize::new(0),
            fired: AtomicU64::new(0),
            fail_removals: AtomicBool::new(false),
        }
    }

    /// Move virtual time forward, firing every timer that comes due
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, ms: Millis) -> u64 {
        let deadline = self.state.lock().now_ms.saturating_add(ms);
        let mut fired = 0;

        while let Some(callback) = self.pop_due(deadline) {
            callback();
            fired += 1;
        }

        self.state.lock().now_ms = deadline;
        self.fired.fetch_add(fired, Ordering::Relaxed);
        fired
    }

    fn pop_due(&self, deadline: Millis) -> Option<TimerCallback> {
        let mut state = self.state.lock();

        let (handle, due_ms) = state
            .timers
            .iter()
            .filter(|(_, t)| t.due_ms <= deadline)
            .map(|(h, t)| (*h, t.due_ms))
            .min_by_key(|(h, due)| (*due, *h))?;

        let state = &mut *state;
        state.now_ms = due_ms;
        let timer = state.timers.get_mut(&handle)?;
        let kind = timer.kind;

        match kind {
            TimerKind::Repeating => {
                timer.due_ms = due_ms + timer.delay_ms.max(MIN_REPEAT_INTERVAL_MS);
                Some(timer.callback.clone())
            }
            TimerKind::Once => state.timers.remove(&handle).map(|t| t.callback),
        }
    }

    fn schedule(&self, kind: TimerKind, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        let mut state = self.state.lock();
        let handle = TimerHandle(state.next_handle);
        state.next_handle += 1;

        let first_delay = match kind {
            TimerKind::Repeating => delay_ms.max(MIN_REPEAT_INTERVAL_MS),
            TimerKind::Once => delay_ms,
        };
        let due_ms = state.now_ms + first_delay;

        state.timers.insert(
            handle,
            SimTimer {
                kind,
                delay_ms,
                due_ms,
                callback,
            },
        );
        debug!("Scheduled {} {} ({}ms)", kind.as_str(), handle, delay_ms);
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.state.lock().timers.remove(&handle);
    }

    /// Deliver an event to the handlers bound on its target
    pub fn dispatch(&self, target: &Target, event_type: &str) -> usize {
        self.bindings
            .dispatch(&Event::new(target.clone(), event_type))
    }

    /// Set the memory usage the probe reports; `None` makes it unavailable
    pub fn set_memory(&self, usage: Option<MemoryUsage>) {
        *self.memory.lock() = usage;
    }

    pub fn set_memory_mb(&self, used: u64, total: u64) {
        self.set_memory(Some(MemoryUsage::from_mb(used, total, total * 4)));
    }

    /// Whether `request_gc` reports the hint as accepted
    pub fn set_gc_supported(&self, supported: bool) {
        self.gc_supported.store(supported, Ordering::Relaxed);
    }

    /// Make every binding removal fail
    pub fn set_fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::Relaxed);
    }

    pub fn gc_requests(&self) -> usize {
        self.gc_requests.load(Ordering::Relaxed)
    }

    /// Timers still scheduled on the host
    pub fn live_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.state.lock().timers.contains_key(&handle)
    }

    pub fn binding_count(&self, target: &Target, event_type: &str) -> usize {
        self.bindings.count(target, event_type)
    }

    pub fn total_bindings(&self) -> usize {
        self.bindings.total()
    }

    /// Callbacks run since construction
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities for SimulatedHost {
    fn schedule_repeating(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        self.schedule(TimerKind::Repeating, callback, delay_ms)
    }

    fn schedule_once(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        self.schedule(TimerKind::Once, callback, delay_ms)
    }

    fn cancel_repeating(&self, handle: TimerHandle) {
        self.cancel(handle)
    }

    fn cancel_once(&self, handle: TimerHandle) {
        self.cancel(handle)
    }

    fn add_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) {
        self.bindings.add(target, event_type, handler, options);
    }

    fn remove_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> HostResult<()> {
        if self.fail_removals.load(Ordering::Relaxed) {
            return Err(HostError::RemovalFailed(format!(
                "{} detached from host",
                target
            )));
        }
        self.bindings.remove(target, event_type, handler, options);
        Ok(())
    }
}

impl Clock for SimulatedHost {
    fn now_ms(&self) -> Millis {
        self.state.lock().now_ms
    }
}

impl MemoryProbe for SimulatedHost {
    fn sample(&self) -> Option<MemoryUsage> {
        *self.memory.lock()
    }

    fn request_gc(&self) -> bool {
        self.gc_requests.fetch_add(1, Ordering::Relaxed);
        self.gc_supported.load(Ordering::Relaxed)
    }
}

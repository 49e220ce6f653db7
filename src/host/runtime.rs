/*!
 * Runtime Host
 * Tokio-backed capabilities: timers are spawned tasks, bindings are in-process
 */

use super::bindings::BindingTable;
use super::Capabilities;
use crate::core::errors::{HostError, HostResult};
use crate::core::limits::MIN_REPEAT_INTERVAL_MS;
use crate::core::types::{
    BindingOptions, Event, Handler, Millis, Target, TimerCallback, TimerHandle,
};
use ahash::HashMap;
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type TaskTable = Arc<Mutex<HashMap<TimerHandle, JoinHandle<()>>>>;

/// Host driven by a tokio runtime
///
/// One-shot tasks drop their own entry after firing; cancellation aborts the
/// task so its callback never runs afterwards.
pub struct RuntimeHost {
    runtime: Handle,
    next_handle: AtomicU64,
    tasks: TaskTable,
    bindings: BindingTable,
}

impl RuntimeHost {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_handle: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::default())),
            bindings: BindingTable::new(),
        }
    }

    /// Build on the runtime of the calling context
    pub fn current() -> HostResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| HostError::Unavailable(e.to_string()))
    }

    fn next(&self) -> TimerHandle {
        TimerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Deliver an event to the handlers bound on its target
    pub fn dispatch(&self, target: &Target, event_type: &str) -> usize {
        self.bindings
            .dispatch(&Event::new(target.clone(), event_type))
    }

    /// Timer tasks not yet finished or cancelled
    pub fn live_timers(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn total_bindings(&self) -> usize {
        self.bindings.total()
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.lock().remove(&handle) {
            task.abort();
            debug!("Aborted {}", handle);
        }
    }
}

impl Capabilities for RuntimeHost {
    fn schedule_repeating(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        let handle = self.next();
        let period = Duration::from_millis(delay_ms.max(MIN_REPEAT_INTERVAL_MS));

        // Insert under the lock so the task can never observe a missing entry
        let mut tasks = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                callback();
            }
        });
        tasks.insert(handle, task);
        handle
    }

    fn schedule_once(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        let handle = self.next();
        let delay = Duration::from_millis(delay_ms);
        let table = Arc::clone(&self.tasks);

        let mut tasks = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            table.lock().remove(&handle);
            callback();
        });
        tasks.insert(handle, task);
        handle
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
        self.bindings.remove(target, event_type, handler, options);
        Ok(())
    }
}

impl Drop for RuntimeHost {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

/*!
 * Resource Registry
 *
 * In-memory bookkeeping of every tracked resource, partitioned by kind.
 *
 * ## Identity
 *
 * - Timers: host handle
 * - Listeners: (target id, event type, handler allocation)
 * - Observers: observer allocation
 * - Components: unique name
 *
 * A resource never has two live records. Accessors hand out cloned
 * snapshots so hooks and host calls never run under the registry lock.
 */

mod records;
mod traits;

pub use records::{observer_id, ComponentRecord, ListenerRecord, ObserverRecord, TimerRecord};
pub use traits::{Component, Observer};

use crate::core::types::{
    BindingOptions, Handler, ListenerKey, Millis, ObserverId, ResourceKind, Target,
    TimerCallback, TimerHandle, TimerKind,
};
use ahash::HashMap;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live record counts per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryCounts {
    pub timers: usize,
    pub listeners: usize,
    pub observers: usize,
    pub components: usize,
}

impl RegistryCounts {
    #[inline]
    pub fn total(&self) -> usize {
        self.timers + self.listeners + self.observers + self.components
    }

    pub fn get(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Timer => self.timers,
            ResourceKind::Listener => self.listeners,
            ResourceKind::Observer => self.observers,
            ResourceKind::Component => self.components,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    timers: HashMap<TimerHandle, TimerRecord>,
    listeners: HashMap<ListenerKey, ListenerRecord>,
    observers: HashMap<ObserverId, ObserverRecord>,
    components: HashMap<String, ComponentRecord>,
}

/// Registry of tracked resources
pub struct Registry {
    state: Mutex<RegistryState>,
    next_seq: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            next_seq: AtomicU64::new(1),
        }
    }

    #[inline]
    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    /// Track a timer; a reused handle replaces the previous record
    pub fn register_timer(
        &self,
        handle: TimerHandle,
        kind: TimerKind,
        delay_ms: Millis,
        callback: TimerCallback,
        now: Millis,
    ) {
        let record = TimerRecord {
            handle,
            kind,
            delay_ms,
            created_at: now,
            callback,
            seq: self.seq(),
        };

        if self.state.lock().timers.insert(handle, record).is_some() {
            warn!("Handle {} reissued by host; replaced stale record", handle);
        }
    }

    pub fn unregister_timer(&self, handle: TimerHandle) -> Option<TimerRecord> {
        self.state.lock().timers.remove(&handle)
    }

    /// Remove and return one-shot records whose timer has certainly fired
    pub fn take_spent_once(&self, now: Millis, grace_ms: Millis) -> Vec<TimerRecord> {
        let mut state = self.state.lock();
        let spent: Vec<TimerHandle> = state
            .timers
            .values()
            .filter(|t| t.is_spent(now, grace_ms))
            .map(|t| t.handle)
            .collect();

        let mut taken: Vec<TimerRecord> = spent
            .into_iter()
            .filter_map(|h| state.timers.remove(&h))
            .collect();
        taken.sort_by_key(|t| t.seq);
        taken
    }

    /// Repeating records older than `threshold_ms`, oldest first
    pub fn stale_repeating(&self, now: Millis, threshold_ms: Millis) -> Vec<TimerRecord> {
        let mut stale: Vec<TimerRecord> = self
            .state
            .lock()
            .timers
            .values()
            .filter(|t| t.is_stale(now, threshold_ms))
            .cloned()
            .collect();
        stale.sort_by_key(|t| (t.created_at, t.seq));
        stale
    }

    pub fn timers(&self) -> Vec<TimerRecord> {
        let mut timers: Vec<_> = self.state.lock().timers.values().cloned().collect();
        timers.sort_by_key(|t| t.seq);
        timers
    }

    pub fn drain_timers(&self) -> Vec<TimerRecord> {
        let mut timers: Vec<_> = self.state.lock().timers.drain().map(|(_, t)| t).collect();
        timers.sort_by_key(|t| t.seq);
        timers
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Track a binding; returns false if the same binding is already tracked
    pub fn register_listener(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
        now: Millis,
        label_len: usize,
    ) -> bool {
        let key = ListenerKey::new(target, event_type, handler, options);
        let mut state = self.state.lock();
        if state.listeners.contains_key(&key) {
            debug!(
                "Listener {} on {} already tracked",
                event_type, target
            );
            return false;
        }

        let record = ListenerRecord {
            target: target.clone(),
            event_type: event_type.to_string(),
            handler: handler.clone(),
            options,
            created_at: now,
            label: handler.truncated_label(label_len),
            seq: self.seq(),
        };
        state.listeners.insert(key, record);
        true
    }

    pub fn unregister_listener(&self, key: &ListenerKey) -> Option<ListenerRecord> {
        self.state.lock().listeners.remove(key)
    }

    pub fn listeners(&self) -> Vec<ListenerRecord> {
        let mut listeners: Vec<_> = self.state.lock().listeners.values().cloned().collect();
        listeners.sort_by_key(|l| l.seq);
        listeners
    }

    pub fn drain_listeners(&self) -> Vec<ListenerRecord> {
        let mut listeners: Vec<_> = self
            .state
            .lock()
            .listeners
            .drain()
            .map(|(_, l)| l)
            .collect();
        listeners.sort_by_key(|l| l.seq);
        listeners
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Track an observer; registering the same allocation again keeps one record
    pub fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        kind_tag: &str,
        now: Millis,
    ) -> ObserverId {
        let id = observer_id(&observer);
        let mut state = self.state.lock();

        if let Some(existing) = state.observers.get_mut(&id) {
            debug!("{} already tracked; retagging as {}", id, kind_tag);
            existing.kind_tag = kind_tag.to_string();
            return id;
        }

        let record = ObserverRecord {
            id,
            observer,
            kind_tag: kind_tag.to_string(),
            created_at: now,
            seq: self.seq(),
        };
        state.observers.insert(id, record);
        id
    }

    pub fn unregister_observer(&self, id: ObserverId) -> Option<ObserverRecord> {
        self.state.lock().observers.remove(&id)
    }

    pub fn observers(&self) -> Vec<ObserverRecord> {
        let mut observers: Vec<_> = self.state.lock().observers.values().cloned().collect();
        observers.sort_by_key(|o| o.seq);
        observers
    }

    pub fn drain_observers(&self) -> Vec<ObserverRecord> {
        let mut observers: Vec<_> = self
            .state
            .lock()
            .observers
            .drain()
            .map(|(_, o)| o)
            .collect();
        observers.sort_by_key(|o| o.seq);
        observers
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Track a component under a unique name, returning any record it replaced
    pub fn register_component(
        &self,
        name: &str,
        instance: Arc<dyn Component>,
        now: Millis,
    ) -> Option<ComponentRecord> {
        let record = ComponentRecord {
            name: name.to_string(),
            instance,
            created_at: now,
            destroyed: false,
            seq: self.seq(),
        };
        self.state.lock().components.insert(name.to_string(), record)
    }

    pub fn unregister_component(&self, name: &str) -> Option<ComponentRecord> {
        self.state.lock().components.remove(name)
    }

    /// Flag a component as destroyed; the next sweep removes it
    pub fn mark_component_destroyed(&self, name: &str) -> bool {
        match self.state.lock().components.get_mut(name) {
            Some(record) => {
                record.destroyed = true;
                true
            }
            None => false,
        }
    }

    pub fn component(&self, name: &str) -> Option<ComponentRecord> {
        self.state.lock().components.get(name).cloned()
    }

    pub fn components(&self) -> Vec<ComponentRecord> {
        let mut components: Vec<_> = self.state.lock().components.values().cloned().collect();
        components.sort_by_key(|c| c.seq);
        components
    }

    pub fn drain_components(&self) -> Vec<ComponentRecord> {
        let mut components: Vec<_> = self
            .state
            .lock()
            .components
            .drain()
            .map(|(_, c)| c)
            .collect();
        components.sort_by_key(|c| c.seq);
        components
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    pub fn counts(&self) -> RegistryCounts {
        let state = self.state.lock();
        RegistryCounts {
            timers: state.timers.len(),
            listeners: state.listeners.len(),
            observers: state.observers.len(),
            components: state.components.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

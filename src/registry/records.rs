/*!
 * Registry Records
 * Per-kind bookkeeping entries
 */

use super::traits::{Component, Observer};
use crate::core::types::{
    BindingOptions, Handler, ListenerKey, Millis, ObserverId, Target, TimerCallback, TimerHandle,
    TimerKind,
};
use std::fmt;
use std::sync::Arc;

/// Tracked timer
#[derive(Clone)]
pub struct TimerRecord {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub delay_ms: Millis,
    pub created_at: Millis,
    pub callback: TimerCallback,
    pub seq: u64,
}

impl TimerRecord {
    #[inline]
    pub fn age_ms(&self, now: Millis) -> Millis {
        now.saturating_sub(self.created_at)
    }

    /// One-shot whose delay plus grace has elapsed
    #[inline]
    pub fn is_spent(&self, now: Millis, grace_ms: Millis) -> bool {
        self.kind == TimerKind::Once && self.age_ms(now) > self.delay_ms.saturating_add(grace_ms)
    }

    /// Repeating timer older than `threshold_ms`
    #[inline]
    pub fn is_stale(&self, now: Millis, threshold_ms: Millis) -> bool {
        self.kind == TimerKind::Repeating && self.age_ms(now) > threshold_ms
    }
}

impl fmt::Debug for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRecord")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("delay_ms", &self.delay_ms)
            .field("created_at", &self.created_at)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Tracked event binding
#[derive(Debug, Clone)]
pub struct ListenerRecord {
    pub target: Target,
    pub event_type: String,
    pub handler: Handler,
    pub options: BindingOptions,
    pub created_at: Millis,
    /// Truncated handler text, kept for diagnostics only
    pub label: String,
    pub seq: u64,
}

impl ListenerRecord {
    pub fn key(&self) -> ListenerKey {
        ListenerKey::new(&self.target, &self.event_type, &self.handler, self.options)
    }
}

/// Tracked observer
#[derive(Clone)]
pub struct ObserverRecord {
    pub id: ObserverId,
    pub observer: Arc<dyn Observer>,
    pub kind_tag: String,
    pub created_at: Millis,
    pub seq: u64,
}

impl fmt::Debug for ObserverRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRecord")
            .field("id", &self.id)
            .field("kind_tag", &self.kind_tag)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Registered UI component
#[derive(Clone)]
pub struct ComponentRecord {
    pub name: String,
    pub instance: Arc<dyn Component>,
    pub created_at: Millis,
    pub destroyed: bool,
    pub seq: u64,
}

impl ComponentRecord {
    /// Destroyed by the manager or by the instance's own flag
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed || self.instance.is_destroyed()
    }
}

impl fmt::Debug for ComponentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRecord")
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

/// Identity of an observer allocation
#[inline]
pub fn observer_id(observer: &Arc<dyn Observer>) -> ObserverId {
    ObserverId(Arc::as_ptr(observer) as *const () as usize)
}

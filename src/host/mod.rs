/*!
 * Host Capabilities
 *
 * The capability surface application code creates resources through, plus
 * the optional host services the manager consumes.
 *
 * ## Pieces
 *
 * - **Capabilities**: timer scheduling/cancellation and event binding
 * - **Ambient**: the swappable slot application code calls through
 * - **MemoryProbe**: optional memory introspection and GC hint
 * - **Clock**: host time in milliseconds
 *
 * Hosts: `SimulatedHost` (deterministic virtual time), `RuntimeHost`
 * (tokio tasks) and `ProcMemoryProbe` (Linux procfs).
 */

mod bindings;
mod procfs;
mod runtime;
mod sim;

pub use bindings::BindingTable;
pub use procfs::{parse_meminfo_total, parse_statm, ProcMemoryProbe};
pub use runtime::RuntimeHost;
pub use sim::SimulatedHost;

use crate::core::errors::HostResult;
use crate::core::limits::BYTES_PER_MB;
use crate::core::types::{
    BindingOptions, Handler, Millis, Target, TimerCallback, TimerHandle,
};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Resource-creating primitives of a host
///
/// The tracked wrapper installed by the interception layer implements this
/// same trait, so callers cannot tell the difference.
pub trait Capabilities: Send + Sync {
    fn schedule_repeating(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle;

    fn schedule_once(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle;

    fn cancel_repeating(&self, handle: TimerHandle);

    fn cancel_once(&self, handle: TimerHandle);

    fn add_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    );

    fn remove_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> HostResult<()>;
}

/// Point-in-time memory usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub limit_bytes: u64,
}

impl MemoryUsage {
    pub fn from_mb(used: u64, total: u64, limit: u64) -> Self {
        Self {
            used_bytes: used.saturating_mul(BYTES_PER_MB),
            total_bytes: total.saturating_mul(BYTES_PER_MB),
            limit_bytes: limit.saturating_mul(BYTES_PER_MB),
        }
    }

    #[inline]
    pub fn used_mb(&self) -> f64 {
        self.used_bytes as f64 / BYTES_PER_MB as f64
    }

    #[inline]
    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MB as f64
    }
}

/// Optional memory introspection
pub trait MemoryProbe: Send + Sync {
    /// Current usage, or `None` when the host cannot introspect right now
    fn sample(&self) -> Option<MemoryUsage>;

    /// Ask the host to reclaim memory; returns whether the hint was accepted
    fn request_gc(&self) -> bool {
        false
    }
}

/// Host time source
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Monotonic clock counting from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

struct CapabilitySet(Arc<dyn Capabilities>);

/// Ambient capability binding
///
/// Application code reaches timers and bindings only through this slot.
/// Clones share the slot, so a swap is seen by every holder. At most one
/// tracked layer owns the slot at a time.
#[derive(Clone)]
pub struct Ambient {
    slot: Arc<ArcSwap<CapabilitySet>>,
    owner: Arc<Mutex<Option<Arc<dyn Capabilities>>>>,
}

impl Ambient {
    pub fn new(capabilities: Arc<dyn Capabilities>) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(CapabilitySet(capabilities))),
            owner: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the layer `wrap` builds over the current capabilities
    ///
    /// Returns `(original, layer)`, or `None` when another layer already
    /// owns the slot.
    pub(crate) fn intercept<F>(
        &self,
        wrap: F,
    ) -> Option<(Arc<dyn Capabilities>, Arc<dyn Capabilities>)>
    where
        F: FnOnce(Arc<dyn Capabilities>) -> Arc<dyn Capabilities>,
    {
        let mut owner = self.owner.lock();
        if owner.is_some() {
            return None;
        }

        let original = self.current();
        let layer = wrap(Arc::clone(&original));
        self.replace(Arc::clone(&layer));
        *owner = Some(Arc::clone(&layer));
        Some((original, layer))
    }

    /// Give up ownership held by `layer` and rebind `original`
    ///
    /// Nothing is rebound when `layer` does not own the slot or something
    /// else was bound over it since; returns whether `original` is bound.
    pub(crate) fn release(
        &self,
        layer: &Arc<dyn Capabilities>,
        original: Arc<dyn Capabilities>,
    ) -> bool {
        let mut owner = self.owner.lock();
        if !owner.as_ref().is_some_and(|o| same_capabilities(o, layer)) {
            return false;
        }
        *owner = None;

        if !self.is_bound(layer) {
            return false;
        }
        self.replace(original);
        true
    }

    /// Whether a tracked layer currently owns the slot
    pub fn is_intercepted(&self) -> bool {
        self.owner.lock().is_some()
    }

    /// Capabilities currently bound
    pub fn current(&self) -> Arc<dyn Capabilities> {
        Arc::clone(&self.slot.load().0)
    }

    /// Bind new capabilities, returning the previous binding
    pub(crate) fn replace(&self, capabilities: Arc<dyn Capabilities>) -> Arc<dyn Capabilities> {
        let previous = self.slot.swap(Arc::new(CapabilitySet(capabilities)));
        Arc::clone(&previous.0)
    }

    /// Check whether `capabilities` is the current binding
    pub fn is_bound(&self, capabilities: &Arc<dyn Capabilities>) -> bool {
        same_capabilities(&self.slot.load().0, capabilities)
    }

    pub fn schedule_repeating<F>(&self, delay_ms: Millis, callback: F) -> TimerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.current().schedule_repeating(Arc::new(callback), delay_ms)
    }

    pub fn schedule_once<F>(&self, delay_ms: Millis, callback: F) -> TimerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.current().schedule_once(Arc::new(callback), delay_ms)
    }

    pub fn cancel_repeating(&self, handle: TimerHandle) {
        self.current().cancel_repeating(handle)
    }

    pub fn cancel_once(&self, handle: TimerHandle) {
        self.current().cancel_once(handle)
    }

    pub fn add_listener(&self, target: &Target, event_type: &str, handler: &Handler) {
        self.current()
            .add_binding(target, event_type, handler, BindingOptions::default())
    }

    pub fn add_listener_with(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) {
        self.current().add_binding(target, event_type, handler, options)
    }

    pub fn remove_listener(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
    ) -> HostResult<()> {
        self.current()
            .remove_binding(target, event_type, handler, BindingOptions::default())
    }

    pub fn remove_listener_with(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> HostResult<()> {
        self.current()
            .remove_binding(target, event_type, handler, options)
    }
}

/// Pointer identity of two capability bindings, ignoring vtables
#[inline]
pub(crate) fn same_capabilities(a: &Arc<dyn Capabilities>, b: &Arc<dyn Capabilities>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

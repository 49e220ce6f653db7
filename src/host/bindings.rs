/*!
 * Binding Table
 * In-process event binding storage and dispatch shared by the hosts
 */

use crate::core::types::{BindingOptions, Event, Handler, Target, TargetId};
use ahash::HashMap;
use log::debug;
use parking_lot::Mutex;

#[derive(Clone)]
struct Bound {
    handler: Handler,
    options: BindingOptions,
}

/// Per-(target, event type) handler lists
///
/// A handler is bound at most once per (target, event type, capture) triple.
/// Handlers run outside the table lock, so they may add or remove bindings.
#[derive(Default)]
pub struct BindingTable {
    bindings: Mutex<HashMap<(TargetId, String), Vec<Bound>>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler; returns false if the identical binding already exists
    pub fn add(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> bool {
        let mut bindings = self.bindings.lock();
        let list = bindings
            .entry((target.id, event_type.to_string()))
            .or_default();

        if list
            .iter()
            .any(|b| b.handler.same_as(handler) && b.options.capture == options.capture)
        {
            return false;
        }

        list.push(Bound {
            handler: handler.clone(),
            options,
        });
        true
    }

    /// Unbind a handler; returns whether a binding was removed
    pub fn remove(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> bool {
        let mut bindings = self.bindings.lock();
        let key = (target.id, event_type.to_string());

        let Some(list) = bindings.get_mut(&key) else {
            return false;
        };

        let before = list.len();
        list.retain(|b| !(b.handler.same_as(handler) && b.options.capture == options.capture));
        let removed = list.len() < before;

        if list.is_empty() {
            bindings.remove(&key);
        }
        removed
    }

    /// Deliver an event to every handler bound for it
    ///
    /// Returns the number of handlers invoked. `once` bindings are dropped
    /// before their handler runs.
    pub fn dispatch(&self, event: &Event) -> usize {
        let key = (event.target.id, event.event_type.clone());

        let handlers: Vec<Handler> = {
            let mut bindings = self.bindings.lock();
            let Some(list) = bindings.get_mut(&key) else {
                return 0;
            };

            let handlers = list.iter().map(|b| b.handler.clone()).collect();
            list.retain(|b| !b.options.once);
            if list.is_empty() {
                bindings.remove(&key);
            }
            handlers
        };

        debug!(
            "Dispatching {} to {} handler(s) on {}",
            event.event_type,
            handlers.len(),
            event.target
        );

        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    /// Bindings for one (target, event type)
    pub fn count(&self, target: &Target, event_type: &str) -> usize {
        self.bindings
            .lock()
            .get(&(target.id, event_type.to_string()))
            .map_or(0, Vec::len)
    }

    /// Bindings across all targets
    pub fn total(&self) -> usize {
        self.bindings.lock().values().map(Vec::len).sum()
    }
}

/*!
 * Interception Layer
 *
 * Swaps the ambient capabilities for a tracked decorator that records every
 * timer and binding in the registry, then forwards to the captured original.
 *
 * ## Guarantees
 *
 * - Forwarded calls see unchanged arguments and return the original's handle
 * - Install and uninstall are both idempotent
 * - One tracked layer per ambient slot; a second install reports
 *   `AlreadyInstalled` even from a different interceptor
 * - Uninstall puts the captured original back verbatim, so handles issued
 *   before, during and after interception all stay valid
 * - Uninstall never overwrites a binding made over the tracked layer
 */

use crate::core::errors::{HostResult, LifecycleError, LifecycleResult};
use crate::core::types::{
    BindingOptions, Handler, ListenerKey, Millis, Target, TimerCallback, TimerHandle, TimerKind,
};
use crate::host::{same_capabilities, Ambient, Capabilities, Clock};
use crate::registry::Registry;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tracked decorator over a set of original capabilities
pub struct TrackedCapabilities {
    original: Arc<dyn Capabilities>,
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    label_len: usize,
}

impl TrackedCapabilities {
    pub fn new(
        original: Arc<dyn Capabilities>,
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
        label_len: usize,
    ) -> Self {
        Self {
            original,
            registry,
            clock,
            label_len,
        }
    }

    /// Capabilities calls are forwarded to
    pub fn original(&self) -> &Arc<dyn Capabilities> {
        &self.original
    }
}

impl Capabilities for TrackedCapabilities {
    fn schedule_repeating(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        let handle = self
            .original
            .schedule_repeating(Arc::clone(&callback), delay_ms);
        self.registry.register_timer(
            handle,
            TimerKind::Repeating,
            delay_ms,
            callback,
            self.clock.now_ms(),
        );
        handle
    }

    fn schedule_once(&self, callback: TimerCallback, delay_ms: Millis) -> TimerHandle {
        let handle = self.original.schedule_once(Arc::clone(&callback), delay_ms);
        self.registry.register_timer(
            handle,
            TimerKind::Once,
            delay_ms,
            callback,
            self.clock.now_ms(),
        );
        handle
    }

    fn cancel_repeating(&self, handle: TimerHandle) {
        if self.registry.unregister_timer(handle).is_none() {
            debug!("Cancelling untracked {}", handle);
        }
        self.original.cancel_repeating(handle)
    }

    fn cancel_once(&self, handle: TimerHandle) {
        if self.registry.unregister_timer(handle).is_none() {
            debug!("Cancelling untracked {}", handle);
        }
        self.original.cancel_once(handle)
    }

    fn add_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) {
        self.original.add_binding(target, event_type, handler, options);
        self.registry.register_listener(
            target,
            event_type,
            handler,
            options,
            self.clock.now_ms(),
            self.label_len,
        );
    }

    fn remove_binding(
        &self,
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> HostResult<()> {
        let key = ListenerKey::new(target, event_type, handler, options);
        self.registry.unregister_listener(&key);
        self.original
            .remove_binding(target, event_type, handler, options)
    }
}

struct Installation {
    original: Arc<dyn Capabilities>,
    tracked: Arc<dyn Capabilities>,
}

/// Installs and removes the tracked decorator on an ambient slot
pub struct Interceptor {
    ambient: Ambient,
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    label_len: usize,
    installed: Mutex<Option<Installation>>,
}

impl Interceptor {
    pub fn new(
        ambient: Ambient,
        registry: Arc<Registry>,
        clock: Arc<dyn Clock>,
        label_len: usize,
    ) -> Self {
        Self {
            ambient,
            registry,
            clock,
            label_len,
            installed: Mutex::new(None),
        }
    }

    /// Capture the current ambient capabilities and bind the tracked decorator
    ///
    /// Returns the captured originals. A second install leaves everything in
    /// place and reports `AlreadyInstalled`.
    pub fn install(&self) -> LifecycleResult<Arc<dyn Capabilities>> {
        let mut installed = self.installed.lock();
        if installed.is_some() {
            warn!("Interception layer already installed; ignoring install");
            return Err(LifecycleError::AlreadyInstalled);
        }

        let Some((original, tracked)) = self.ambient.intercept(|original| {
            Arc::new(TrackedCapabilities::new(
                original,
                Arc::clone(&self.registry),
                Arc::clone(&self.clock),
                self.label_len,
            )) as Arc<dyn Capabilities>
        }) else {
            warn!("Ambient capabilities already intercepted by another layer; ignoring install");
            return Err(LifecycleError::AlreadyInstalled);
        };

        *installed = Some(Installation {
            original: Arc::clone(&original),
            tracked,
        });

        info!("Interception layer installed");
        Ok(original)
    }

    /// Restore the captured originals
    ///
    /// Returns false if nothing was installed, or if the slot was rebound
    /// over the tracked layer; that binding is left in place.
    pub fn uninstall(&self) -> bool {
        let Some(installation) = self.installed.lock().take() else {
            debug!("Interception layer not installed; ignoring uninstall");
            return false;
        };

        if !self
            .ambient
            .release(&installation.tracked, installation.original)
        {
            warn!("Ambient capabilities were rebound over the tracked layer; leaving them in place");
            return false;
        }

        info!("Interception layer uninstalled");
        true
    }

    pub fn is_installed(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// Originals captured at install time
    pub fn originals(&self) -> Option<Arc<dyn Capabilities>> {
        self.installed
            .lock()
            .as_ref()
            .map(|i| Arc::clone(&i.original))
    }

    /// Whether `capabilities` is the original this layer decorates
    pub fn is_original(&self, capabilities: &Arc<dyn Capabilities>) -> bool {
        self.installed
            .lock()
            .as_ref()
            .is_some_and(|i| same_capabilities(&i.original, capabilities))
    }
}

/*!
 * Lifecycle Manager
 *
 * Session-wide service tying the interception layer, registry, telemetry and
 * cleanup tiers together.
 *
 * ## Bootstrap
 *
 * `init` captures the ambient originals, schedules the upkeep timers and the
 * unload binding on those originals, and only then installs the tracked
 * wrappers. Upkeep is therefore never visible in the registry, and upkeep
 * callbacks hold a `Weak` reference so they never keep the manager alive.
 *
 * ## Teardown
 *
 * `destroy` is the terminal transition. It cancels upkeep, releases every
 * tracked resource through the originals and restores the ambient slot.
 * Calling it again does nothing.
 */

mod builder;
mod state;

pub use builder::LifecycleManagerBuilder;
pub use state::ManagerState;

use crate::cleanup::{CleanupPolicy, CleanupResult, CleanupScheduler, HookOutcome};
use crate::core::config::ManagerConfig;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::UNLOAD_EVENT;
use crate::core::types::{BindingOptions, Event, Handler, ObserverId, Target, TimerHandle};
use crate::diagnostics::DiagnosticsReport;
use crate::host::{Ambient, Capabilities, Clock, MemoryProbe};
use crate::interception::Interceptor;
use crate::monitoring::{TelemetryMonitor, TelemetryOutcome};
use crate::registry::{Component, Observer, Registry, RegistryCounts};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Everything that exists only between `init` and `destroy`
struct Session {
    config: ManagerConfig,
    originals: Arc<dyn Capabilities>,
    interceptor: Interceptor,
    scheduler: CleanupScheduler,
    monitor: TelemetryMonitor,
    sweep_timer: TimerHandle,
    telemetry_timer: Option<TimerHandle>,
    unload: Option<(Target, Handler)>,
}

struct ManagerInner {
    ambient: Ambient,
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
    probe: Option<Arc<dyn MemoryProbe>>,
    unload_target: Option<Target>,
    // Lock order: state, then session
    state: Mutex<ManagerState>,
    session: Mutex<Option<Arc<Session>>>,
}

/// Resource lifecycle manager
///
/// Cheap to clone; every clone drives the same registry and state machine.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<ManagerInner>,
}

impl LifecycleManager {
    pub fn builder(ambient: Ambient) -> LifecycleManagerBuilder {
        LifecycleManagerBuilder::new(ambient)
    }

    pub(crate) fn from_parts(
        ambient: Ambient,
        clock: Arc<dyn Clock>,
        probe: Option<Arc<dyn MemoryProbe>>,
        unload_target: Option<Target>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                ambient,
                registry: Arc::new(Registry::new()),
                clock,
                probe,
                unload_target,
                state: Mutex::new(ManagerState::Uninitialized),
                session: Mutex::new(None),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start tracking
    ///
    /// A second call while active only logs a warning. Init after destroy is
    /// rejected, and so is init over an ambient slot another manager already
    /// tracks (`AlreadyInstalled`); the manager then stays uninitialized.
    pub fn init(&self, config: ManagerConfig) -> LifecycleResult<()> {
        config.validate()?;

        let mut state = self.inner.state.lock();
        match *state {
            ManagerState::Active => {
                warn!("Lifecycle manager already initialized; ignoring init");
                return Ok(());
            }
            ManagerState::Destroyed => {
                return Err(LifecycleError::invalid_state("init", *state));
            }
            ManagerState::Uninitialized => {}
        }

        let inner = &self.inner;
        let interceptor = Interceptor::new(
            inner.ambient.clone(),
            Arc::clone(&inner.registry),
            Arc::clone(&inner.clock),
            config.handler_label_len,
        );
        // Fails when another manager already tracks this ambient slot
        let originals = interceptor.install()?;
        let weak = Arc::downgrade(inner);

        let sweep_timer = originals.schedule_repeating(
            Arc::new(sweep_upkeep(weak.clone())),
            config.periodic_sweep_interval_ms,
        );
        let telemetry_timer = inner.probe.as_ref().map(|_| {
            originals.schedule_repeating(
                Arc::new(telemetry_upkeep(weak.clone())),
                config.telemetry_interval_ms,
            )
        });

        let unload = inner.unload_target.as_ref().map(|target| {
            let handler = Handler::labeled("lifecycle_unload", unload_handler(weak.clone()));
            originals.add_binding(target, UNLOAD_EVENT, &handler, BindingOptions::default());
            (target.clone(), handler)
        });

        let session = Session {
            scheduler: CleanupScheduler::new(
                Arc::clone(&inner.registry),
                Arc::clone(&inner.clock),
                inner.probe.clone(),
                CleanupPolicy::from(&config),
            ),
            monitor: TelemetryMonitor::new(inner.probe.clone(), &config),
            config,
            originals,
            interceptor,
            sweep_timer,
            telemetry_timer,
            unload,
        };

        let sweep_interval = session.config.periodic_sweep_interval_ms;
        *inner.session.lock() = Some(Arc::new(session));
        *state = ManagerState::Active;

        info!(
            "Lifecycle manager active (sweep every {}ms, telemetry {})",
            sweep_interval,
            if inner.probe.is_some() { "on" } else { "off" }
        );
        Ok(())
    }

    /// Release everything and restore the ambient originals
    ///
    /// Returns the teardown result, or `None` if already destroyed.
    pub fn destroy(&self) -> Option<CleanupResult> {
        let (previous, session) = {
            let mut state = self.inner.state.lock();
            if state.is_terminal() {
                debug!("Lifecycle manager already destroyed; ignoring destroy");
                return None;
            }
            let previous = *state;
            *state = ManagerState::Destroyed;
            (previous, self.inner.session.lock().take())
        };

        let result = match session {
            Some(session) => self.teardown_session(&session),
            None => {
                // Never initialized: nothing is intercepted, so the ambient
                // binding is the original
                debug!("Destroying manager that was never initialized");
                let scheduler = self.detached_scheduler();
                scheduler.teardown(self.inner.ambient.current().as_ref())
            }
        };

        info!("Lifecycle manager destroyed (was {}): {}", previous, result);
        Some(result)
    }

    fn teardown_session(&self, session: &Session) -> CleanupResult {
        let originals = session.originals.as_ref();

        originals.cancel_repeating(session.sweep_timer);
        if let Some(handle) = session.telemetry_timer {
            originals.cancel_repeating(handle);
        }

        let mut result = session.scheduler.teardown(originals);

        if let Some((target, handler)) = &session.unload {
            if let Err(e) =
                originals.remove_binding(target, UNLOAD_EVENT, handler, BindingOptions::default())
            {
                warn!("Failed to remove unload binding on {}: {}", target, e);
                result.record_error(format!("unload binding on {}: {}", target, e));
            }
        }

        if !session.interceptor.uninstall() {
            result.record_error(
                "ambient capabilities were rebound over the tracked layer".to_string(),
            );
        }

        // Hooks may have created resources through the tracked layer mid-teardown
        if !self.inner.registry.is_empty() {
            debug!("Releasing resources registered during teardown");
            let late = session.scheduler.teardown(originals);
            result.stats.merge(late.stats);
            result.errors.extend(late.errors);
        }

        result
    }

    /// Scheduler for work outside an active session
    fn detached_scheduler(&self) -> CleanupScheduler {
        CleanupScheduler::new(
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.clock),
            self.inner.probe.clone(),
            CleanupPolicy::default(),
        )
    }

    fn active_session(&self, operation: &str) -> LifecycleResult<Arc<Session>> {
        let state = self.inner.state.lock();
        if !state.is_active() {
            return Err(LifecycleError::invalid_state(operation, *state));
        }
        self.inner
            .session
            .lock()
            .clone()
            .ok_or_else(|| LifecycleError::invalid_state(operation, *state))
    }

    fn ensure_not_destroyed(&self, operation: &str) -> LifecycleResult<()> {
        let state = *self.inner.state.lock();
        if state.is_terminal() {
            warn!("Rejected {} on destroyed manager", operation);
            return Err(LifecycleError::invalid_state(operation, state));
        }
        Ok(())
    }

    /// Run the emergency tier now
    pub fn force_cleanup(&self) -> LifecycleResult<CleanupResult> {
        let session = self.active_session("force cleanup")?;
        Ok(session.scheduler.emergency(session.originals.as_ref()))
    }

    /// Run the periodic sweep now
    pub fn run_periodic_sweep(&self) -> LifecycleResult<CleanupResult> {
        let session = self.active_session("run periodic sweep")?;
        Ok(session.scheduler.periodic_sweep(session.originals.as_ref()))
    }

    /// Take one telemetry sample, running the emergency tier on a breach
    pub fn sample_telemetry(&self) -> LifecycleResult<TelemetryOutcome> {
        let session = self.active_session("sample telemetry")?;
        let outcome = session.monitor.sample(self.inner.registry.counts());
        if outcome.is_breach() {
            let result = session.scheduler.emergency(session.originals.as_ref());
            debug!("Breach handled: {}", result);
        }
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Track a component under a unique name
    ///
    /// Allowed before `init`. A component already tracked under the same name
    /// is replaced without running its hooks.
    pub fn register_component(
        &self,
        name: &str,
        instance: Arc<dyn Component>,
    ) -> LifecycleResult<()> {
        self.ensure_not_destroyed("register component")?;
        let now = self.inner.clock.now_ms();
        if self
            .inner
            .registry
            .register_component(name, instance, now)
            .is_some()
        {
            warn!("Component {} registered again; previous instance replaced", name);
        } else {
            debug!("Registered component {}", name);
        }
        Ok(())
    }

    /// Stop tracking a component without running any hook
    pub fn unregister_component(&self, name: &str) -> bool {
        self.inner.registry.unregister_component(name).is_some()
    }

    /// Run a component's destroy hook now and flag it for the next sweep
    ///
    /// Returns whether the component was tracked.
    pub fn destroy_component(&self, name: &str) -> LifecycleResult<bool> {
        let Some(record) = self.inner.registry.component(name) else {
            return Ok(false);
        };
        if record.is_destroyed() {
            debug!("Component {} already destroyed", name);
            return Ok(true);
        }

        let outcome = self.detached_scheduler().destroy_instance(&record);
        self.inner.registry.mark_component_destroyed(name);

        match outcome {
            HookOutcome::Absent => {
                debug!("Component {} exposes no destroy hook", name);
                Ok(true)
            }
            HookOutcome::Completed => Ok(true),
            HookOutcome::Failed(e) => Err(e),
        }
    }

    /// Flag a component as destroyed by its owner
    pub fn mark_component_destroyed(&self, name: &str) -> bool {
        self.inner.registry.mark_component_destroyed(name)
    }

    /// Track an observer; released on teardown via disconnect, stop or close
    pub fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        kind_tag: &str,
    ) -> LifecycleResult<ObserverId> {
        self.ensure_not_destroyed("register observer")?;
        let now = self.inner.clock.now_ms();
        Ok(self.inner.registry.register_observer(observer, kind_tag, now))
    }

    /// Stop tracking an observer without releasing it
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.inner.registry.unregister_observer(id).is_some()
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn state(&self) -> ManagerState {
        *self.inner.state.lock()
    }

    /// Ambient slot application code should create resources through
    pub fn ambient(&self) -> &Ambient {
        &self.inner.ambient
    }

    pub fn config(&self) -> Option<ManagerConfig> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.config.clone())
    }

    pub fn counts(&self) -> RegistryCounts {
        self.inner.registry.counts()
    }

    pub fn is_intercepting(&self) -> bool {
        self.inner
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.interceptor.is_installed())
    }

    /// Point-in-time snapshot of everything tracked
    pub fn report(&self) -> DiagnosticsReport {
        let state = self.state();
        let session = self.inner.session.lock().clone();
        DiagnosticsReport::capture(
            &self.inner.registry,
            self.inner.clock.now_ms(),
            state,
            session.as_ref().is_some_and(|s| s.interceptor.is_installed()),
            session.as_ref().map(|s| s.monitor.stats()),
        )
    }
}

fn sweep_upkeep(weak: Weak<ManagerInner>) -> impl Fn() + Send + Sync + 'static {
    move || {
        let Some(inner) = weak.upgrade() else { return };
        if let Err(e) = (LifecycleManager { inner }).run_periodic_sweep() {
            debug!("Skipped periodic sweep: {}", e);
        }
    }
}

fn telemetry_upkeep(weak: Weak<ManagerInner>) -> impl Fn() + Send + Sync + 'static {
    move || {
        let Some(inner) = weak.upgrade() else { return };
        if let Err(e) = (LifecycleManager { inner }).sample_telemetry() {
            debug!("Skipped telemetry sample: {}", e);
        }
    }
}

fn unload_handler(weak: Weak<ManagerInner>) -> impl Fn(&Event) + Send + Sync + 'static {
    move |event: &Event| {
        let Some(inner) = weak.upgrade() else { return };
        info!("Unload received on {}; tearing down", event.target);
        if let Some(result) = (LifecycleManager { inner }).destroy() {
            if !result.is_success() {
                error!("Teardown on unload finished with {} errors", result.errors.len());
            }
        }
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("state", &self.state())
            .field("counts", &self.counts())
            .finish()
    }
}

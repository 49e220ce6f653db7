/*!
 * Lifecycle Kernel Library
 * Tracking and tiered reclamation of session-scoped runtime resources
 */

pub mod cleanup;
pub mod core;
pub mod diagnostics;
pub mod host;
pub mod interception;
pub mod manager;
pub mod monitoring;
pub mod registry;

// Re-exports
pub use cleanup::{CleanupPolicy, CleanupResult, CleanupScheduler, CleanupStats, CleanupTier};
pub use self::core::{
    BindingOptions, Event, Handler, HandlerId, HookError, HookResult, HostError, HostResult,
    LifecycleError, LifecycleResult, ManagerConfig, Millis, ObserverId, ResourceKind, Target,
    TargetId, TargetKind, TimerCallback, TimerHandle, TimerKind,
};
pub use diagnostics::{ComponentInfo, DiagnosticsReport, ListenerInfo, ObserverInfo, TimerInfo};
pub use host::{
    Ambient, Capabilities, Clock, MemoryProbe, MemoryUsage, ProcMemoryProbe, RuntimeHost,
    SimulatedHost, SystemClock,
};
pub use interception::{Interceptor, TrackedCapabilities};
pub use manager::{LifecycleManager, LifecycleManagerBuilder, ManagerState};
pub use monitoring::{init_tracing, TelemetryMonitor, TelemetryOutcome, TelemetryStats};
pub use registry::{Component, Observer, Registry, RegistryCounts};

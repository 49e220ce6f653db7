/*!
 * Core Module
 * Shared types, errors, limits and configuration
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

pub use config::ManagerConfig;
pub use errors::{HookError, HookResult, HostError, HostResult, LifecycleError, LifecycleResult};
pub use types::{
    BindingOptions, Event, Handler, HandlerId, ListenerKey, Millis, ObserverId, ResourceKind,
    Target, TargetId, TargetKind, TimerCallback, TimerHandle, TimerKind,
};

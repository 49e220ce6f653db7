/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle manager errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("Interception layer already installed")]
    #[diagnostic(
        code(interception::already_installed),
        help("One tracked layer owns an ambient slot at a time; the existing one stays in place.")
    )]
    AlreadyInstalled,

    #[error("Interception layer not installed")]
    #[diagnostic(
        code(interception::not_installed),
        help("Call init() before relying on tracked capabilities.")
    )]
    NotInstalled,

    #[error("Cannot {operation} while manager is {state}")]
    #[diagnostic(
        code(manager::invalid_state),
        help("The manager moves uninitialized -> active -> destroyed and never back.")
    )]
    InvalidState { operation: String, state: String },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("Intervals must be positive and the info threshold must not exceed the warning threshold.")
    )]
    InvalidConfig(String),

    #[error("Hook {hook} failed for {resource}: {reason}")]
    #[diagnostic(code(cleanup::hook_failed))]
    HookFailed {
        resource: String,
        hook: String,
        reason: String,
    },

    #[error("Release of {resource} failed: {reason}")]
    #[diagnostic(code(cleanup::release_failed))]
    ReleaseFailed { resource: String, reason: String },

    #[error("Host capability unavailable: {0}")]
    #[diagnostic(
        code(host::unavailable),
        help("Runtime hosts must be constructed inside a tokio runtime.")
    )]
    HostUnavailable(String),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(diagnostics::serialization))]
    Serialization(String),
}

impl LifecycleError {
    pub fn invalid_state(operation: &str, state: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            state: state.to_string(),
        }
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        LifecycleError::Serialization(err.to_string())
    }
}

impl From<HostError> for LifecycleError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Unavailable(reason) => LifecycleError::HostUnavailable(reason),
            HostError::RemovalFailed(reason) => LifecycleError::ReleaseFailed {
                resource: "binding".to_string(),
                reason,
            },
        }
    }
}

/// Error returned by a collaborator hook (destroy, cleanup, cache clear, release)
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Outcome of a collaborator hook; `None` from a hook method means "not exposed"
pub type HookResult = Result<(), HookError>;

/// Host capability errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HostError {
    #[error("Binding removal failed: {0}")]
    RemovalFailed(String),

    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Common result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

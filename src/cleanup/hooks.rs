/*!
 * Hook Execution
 * Runs collaborator hooks with error and panic isolation
 */

use crate::core::errors::{HookResult, LifecycleError};
use log::warn;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What happened when a hook was offered to a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Collaborator does not expose the hook
    Absent,
    /// Hook ran and succeeded
    Completed,
    /// Hook returned an error or panicked
    Failed(LifecycleError),
}

impl HookOutcome {
    #[inline]
    pub fn ran(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Report a failed release method as a release failure of its owner
    pub fn into_release_failure(self) -> Self {
        match self {
            Self::Failed(LifecycleError::HookFailed {
                resource,
                hook,
                reason,
            }) => Self::Failed(LifecycleError::ReleaseFailed {
                resource,
                reason: format!("{}: {}", hook, reason),
            }),
            other => other,
        }
    }
}

/// Invoke a hook, turning errors and panics into `HookOutcome::Failed`
pub fn run_hook<F>(resource: &str, hook: &str, f: F) -> HookOutcome
where
    F: FnOnce() -> Option<HookResult>,
{
    let failure = |reason: String| {
        warn!("Hook {} failed for {}: {}", hook, resource, reason);
        HookOutcome::Failed(LifecycleError::HookFailed {
            resource: resource.to_string(),
            hook: hook.to_string(),
            reason,
        })
    };

    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(None) => HookOutcome::Absent,
        Ok(Some(Ok(()))) => HookOutcome::Completed,
        Ok(Some(Err(e))) => failure(e.to_string()),
        Err(payload) => failure(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/*!
 * Collaborator Traits
 *
 * What the manager may call on registered components and observers.
 * Every hook is optional: a method returning `None` means the collaborator
 * does not expose it.
 */

use crate::core::errors::HookResult;

/// UI module registered for lifecycle tracking
pub trait Component: Send + Sync {
    /// Full teardown hook; preferred over `cleanup`
    fn destroy(&self) -> Option<HookResult> {
        None
    }

    /// Fallback teardown hook
    fn cleanup(&self) -> Option<HookResult> {
        None
    }

    /// Drop cached data without tearing the component down
    fn clear_cache(&self) -> Option<HookResult> {
        None
    }

    /// Liveness flag reported by the instance itself
    fn is_destroyed(&self) -> bool {
        false
    }
}

/// Observer construct (mutation watch, resize watch, ...)
///
/// Release tries `disconnect`, then `stop`, then `close`; the first one
/// exposed is the only one called.
pub trait Observer: Send + Sync {
    fn disconnect(&self) -> Option<HookResult> {
        None
    }

    fn stop(&self) -> Option<HookResult> {
        None
    }

    fn close(&self) -> Option<HookResult> {
        None
    }
}

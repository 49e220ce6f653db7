/*!
 * Manager State
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a manager: uninitialized -> active -> destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Uninitialized,
    Active,
    Destroyed,
}

impl ManagerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Destroyed => "destroyed",
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }

    /// Destroyed is terminal
    #[inline]
    pub fn is_terminal(&self) -> bool {
        *self == Self::Destroyed
    }
}

impl Default for ManagerState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

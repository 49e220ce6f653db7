/*!
 * Cleanup Scheduler
 *
 * Three tiers over the registry, each idempotent and independently invocable:
 *
 * - **Periodic sweep**: spent one-shot records, the oldest stale repeating
 *   timer, component cache clearing, destroyed component removal
 * - **Emergency**: cache clearing, every stale repeating timer, GC hint
 * - **Teardown**: releases every tracked resource through the originals
 *
 * Failures are isolated per resource: a failing hook or release is logged and
 * counted, and the tier moves on. No tier ever adds records.
 */

mod hooks;
mod tiers;

pub use hooks::{run_hook, HookOutcome};
pub use tiers::{CleanupPolicy, CleanupScheduler};

use crate::core::types::ResourceKind;
use ahash::HashMap;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupTier {
    PeriodicSweep,
    Emergency,
    Teardown,
}

impl CleanupTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeriodicSweep => "periodic_sweep",
            Self::Emergency => "emergency",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for CleanupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource cleanup statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupStats {
    pub resources_freed: usize,
    pub hooks_invoked: usize,
    pub errors_encountered: usize,
    pub cleanup_duration_micros: u64,
    pub by_type: HashMap<String, usize>,
}

impl CleanupStats {
    /// Create new stats with timing
    #[inline]
    pub fn with_timing<F>(f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        let start = Instant::now();
        let mut stats = f();
        stats.cleanup_duration_micros = start.elapsed().as_micros() as u64;
        stats
    }

    /// Count a removed record
    #[inline]
    pub fn freed(&mut self, kind: ResourceKind) {
        self.resources_freed += 1;
        *self.by_type.entry(kind.as_str().to_string()).or_insert(0) += 1;
    }

    /// Freed records of one kind
    pub fn freed_of(&self, kind: ResourceKind) -> usize {
        self.by_type.get(kind.as_str()).copied().unwrap_or(0)
    }

    /// Merge another stats into this one
    pub fn merge(&mut self, other: CleanupStats) {
        self.resources_freed += other.resources_freed;
        self.hooks_invoked += other.hooks_invoked;
        self.errors_encountered += other.errors_encountered;
        self.cleanup_duration_micros += other.cleanup_duration_micros;

        for (type_name, count) in other.by_type {
            *self.by_type.entry(type_name).or_insert(0) += count;
        }
    }
}

/// Result of a cleanup tier
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub tier: CleanupTier,
    pub stats: CleanupStats,
    pub errors: Vec<String>,
}

impl CleanupResult {
    pub fn new(tier: CleanupTier) -> Self {
        Self {
            tier,
            stats: CleanupStats::default(),
            errors: Vec::new(),
        }
    }

    /// Record an isolated failure
    pub(crate) fn record_error(&mut self, message: String) {
        self.stats.errors_encountered += 1;
        self.errors.push(message);
    }

    /// Check if cleanup was successful
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if cleanup had any effect
    pub fn has_freed_resources(&self) -> bool {
        self.stats.resources_freed > 0
    }
}

impl fmt::Display for CleanupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cleanup: {} resources freed, {} hooks invoked, {} errors",
            self.tier,
            self.stats.resources_freed,
            self.stats.hooks_invoked,
            self.errors.len()
        )
    }
}

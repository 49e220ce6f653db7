/*!
 * System Limits and Constants
 *
 * Centralized location for the lifecycle kernel's thresholds and cadences.
 * Organized by subsystem; every default in `ManagerConfig` comes from here.
 */

// =============================================================================
// TELEMETRY
// =============================================================================

/// Bytes per megabyte used for all memory thresholds
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Memory usage that triggers emergency cleanup (150MB)
pub const DEFAULT_MEMORY_WARNING_THRESHOLD_MB: u64 = 150;

/// Informational threshold as a fraction of the warning threshold when not
/// configured explicitly (2/3: 100MB against the default 150MB)
pub const INFO_THRESHOLD_NUMERATOR: u64 = 2;
pub const INFO_THRESHOLD_DENOMINATOR: u64 = 3;

/// Memory sampling cadence (2 minutes)
pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 2 * 60 * 1000;

/// Page size assumed when converting /proc/self/statm pages to bytes
pub const PROC_PAGE_SIZE: u64 = 4096;

// =============================================================================
// CLEANUP
// =============================================================================

/// Periodic sweep cadence (10 minutes)
pub const DEFAULT_PERIODIC_SWEEP_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Age after which a repeating timer is considered stale (1 hour)
pub const DEFAULT_STALE_REPEATING_TIMER_MS: u64 = 60 * 60 * 1000;

/// Grace margin past a one-shot timer's delay before its record is stale (5s)
pub const DEFAULT_ONE_SHOT_GRACE_MS: u64 = 5 * 1000;

// =============================================================================
// REGISTRY
// =============================================================================

/// Characters of handler text kept in listener metadata
pub const DEFAULT_HANDLER_LABEL_LEN: usize = 50;

/// Event type that triggers full teardown on the unload target
pub const UNLOAD_EVENT: &str = "unload";

/// Minimum repeat period hosts apply to repeating timers
pub const MIN_REPEAT_INTERVAL_MS: u64 = 1;

/*!
 * Manager Configuration
 * Recognized options for `LifecycleManager::init`
 */

use super::errors::{LifecycleError, LifecycleResult};
use super::limits;
use super::types::Millis;
use serde::{Deserialize, Serialize};

/// Configuration accepted by `init`
///
/// JSON keys follow the host-facing names (`memoryWarningThresholdMB`, ...);
/// missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    #[serde(rename = "memoryWarningThresholdMB")]
    pub memory_warning_threshold_mb: u64,

    /// Derived from the warning threshold when unset
    #[serde(rename = "memoryInfoThresholdMB", skip_serializing_if = "Option::is_none")]
    pub memory_info_threshold_mb: Option<u64>,

    #[serde(rename = "periodicSweepIntervalMs")]
    pub periodic_sweep_interval_ms: Millis,

    #[serde(rename = "telemetryIntervalMs")]
    pub telemetry_interval_ms: Millis,

    #[serde(rename = "staleRepeatingTimerMs")]
    pub stale_repeating_timer_ms: Millis,

    #[serde(rename = "oneShotGraceMs")]
    pub one_shot_grace_ms: Millis,

    #[serde(rename = "handlerLabelLen")]
    pub handler_label_len: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            memory_warning_threshold_mb: limits::DEFAULT_MEMORY_WARNING_THRESHOLD_MB,
            memory_info_threshold_mb: None,
            periodic_sweep_interval_ms: limits::DEFAULT_PERIODIC_SWEEP_INTERVAL_MS,
            telemetry_interval_ms: limits::DEFAULT_TELEMETRY_INTERVAL_MS,
            stale_repeating_timer_ms: limits::DEFAULT_STALE_REPEATING_TIMER_MS,
            one_shot_grace_ms: limits::DEFAULT_ONE_SHOT_GRACE_MS,
            handler_label_len: limits::DEFAULT_HANDLER_LABEL_LEN,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON and validate
    pub fn from_json_str(json: &str) -> LifecycleResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LifecycleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        let intervals = [
            ("periodicSweepIntervalMs", self.periodic_sweep_interval_ms),
            ("telemetryIntervalMs", self.telemetry_interval_ms),
            ("staleRepeatingTimerMs", self.stale_repeating_timer_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(LifecycleError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if let Some(info) = self.memory_info_threshold_mb {
            if info > self.memory_warning_threshold_mb {
                return Err(LifecycleError::InvalidConfig(format!(
                    "memoryInfoThresholdMB ({}) exceeds memoryWarningThresholdMB ({})",
                    info, self.memory_warning_threshold_mb
                )));
            }
        }

        Ok(())
    }

    /// Informational threshold, explicit or derived from the warning threshold
    pub fn effective_info_threshold_mb(&self) -> u64 {
        self.memory_info_threshold_mb.unwrap_or_else(|| {
            // Widened so large warning thresholds cannot overflow; the result
            // never exceeds the warning threshold
            (u128::from(self.memory_warning_threshold_mb)
                * u128::from(limits::INFO_THRESHOLD_NUMERATOR)
                / u128::from(limits::INFO_THRESHOLD_DENOMINATOR)) as u64
        })
    }

    /// Saturates instead of overflowing on out-of-range JSON values
    #[inline]
    pub fn memory_warning_threshold_bytes(&self) -> u64 {
        self.memory_warning_threshold_mb
            .saturating_mul(limits::BYTES_PER_MB)
    }

    #[inline]
    pub fn memory_info_threshold_bytes(&self) -> u64 {
        self.effective_info_threshold_mb()
            .saturating_mul(limits::BYTES_PER_MB)
    }

    #[inline]
    #[must_use]
    pub fn with_memory_warning_threshold_mb(mut self, warning: u64) -> Self {
        self.memory_warning_threshold_mb = warning;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_memory_thresholds_mb(mut self, info: u64, warning: u64) -> Self {
        self.memory_info_threshold_mb = Some(info);
        self.memory_warning_threshold_mb = warning;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_periodic_sweep_interval(mut self, interval_ms: Millis) -> Self {
        self.periodic_sweep_interval_ms = interval_ms;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_telemetry_interval(mut self, interval_ms: Millis) -> Self {
        self.telemetry_interval_ms = interval_ms;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_stale_repeating_timer(mut self, age_ms: Millis) -> Self {
        self.stale_repeating_timer_ms = age_ms;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_one_shot_grace(mut self, grace_ms: Millis) -> Self {
        self.one_shot_grace_ms = grace_ms;
        self
    }
}

/*!
 * Telemetry Monitor
 * Memory sampling with informational and warning thresholds
 */

use crate::core::config::ManagerConfig;
use crate::host::{MemoryProbe, MemoryUsage};
use crate::registry::RegistryCounts;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Classification of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "usage", rename_all = "snake_case")]
pub enum TelemetryOutcome {
    /// No probe, or the probe produced no sample
    Unavailable,
    /// Below the informational threshold
    Normal(MemoryUsage),
    /// Above the informational threshold, below the warning threshold
    Elevated(MemoryUsage),
    /// Above the warning threshold; emergency cleanup is due
    Breach(MemoryUsage),
}

impl TelemetryOutcome {
    #[inline]
    pub fn is_breach(&self) -> bool {
        matches!(self, Self::Breach(_))
    }

    pub fn usage(&self) -> Option<MemoryUsage> {
        match self {
            Self::Unavailable => None,
            Self::Normal(u) | Self::Elevated(u) | Self::Breach(u) => Some(*u),
        }
    }
}

/// Counters kept across samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
    pub available: bool,
    pub samples: u64,
    pub breaches: u64,
    pub last: Option<MemoryUsage>,
}

/// Samples host memory and classifies it against the configured thresholds
///
/// Without a probe every sample is `Unavailable` and nothing is ever
/// triggered.
pub struct TelemetryMonitor {
    probe: Option<Arc<dyn MemoryProbe>>,
    info_threshold_bytes: u64,
    warning_threshold_bytes: u64,
    samples: AtomicU64,
    breaches: AtomicU64,
    last: Mutex<Option<MemoryUsage>>,
    unavailable_logged: AtomicBool,
}

impl TelemetryMonitor {
    pub fn new(probe: Option<Arc<dyn MemoryProbe>>, config: &ManagerConfig) -> Self {
        Self {
            probe,
            info_threshold_bytes: config.memory_info_threshold_bytes(),
            warning_threshold_bytes: config.memory_warning_threshold_bytes(),
            samples: AtomicU64::new(0),
            breaches: AtomicU64::new(0),
            last: Mutex::new(None),
            unavailable_logged: AtomicBool::new(false),
        }
    }

    pub fn is_available(&self) -> bool {
        self.probe.is_some()
    }

    /// Take one sample and log it against the live registry counts
    pub fn sample(&self, counts: RegistryCounts) -> TelemetryOutcome {
        let Some(usage) = self.probe.as_ref().and_then(|p| p.sample()) else {
            if !self.unavailable_logged.swap(true, Ordering::Relaxed) {
                debug!("Memory telemetry unavailable; sampling is a no-op");
            }
            return TelemetryOutcome::Unavailable;
        };

        self.samples.fetch_add(1, Ordering::Relaxed);
        *self.last.lock() = Some(usage);

        let outcome = self.classify(usage);
        match outcome {
            TelemetryOutcome::Breach(_) => {
                self.breaches.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Memory usage {:.1}MB / {:.1}MB exceeds warning threshold; tracked: {} timers, {} listeners, {} observers, {} components",
                    usage.used_mb(),
                    usage.total_mb(),
                    counts.timers,
                    counts.listeners,
                    counts.observers,
                    counts.components
                );
            }
            TelemetryOutcome::Elevated(_) => {
                info!(
                    "Memory usage {:.1}MB / {:.1}MB above informational threshold; tracked: {} timers, {} listeners, {} observers, {} components",
                    usage.used_mb(),
                    usage.total_mb(),
                    counts.timers,
                    counts.listeners,
                    counts.observers,
                    counts.components
                );
            }
            _ => debug!("Memory usage {:.1}MB", usage.used_mb()),
        }
        outcome
    }

    /// Classify a usage reading without recording it
    pub fn classify(&self, usage: MemoryUsage) -> TelemetryOutcome {
        if usage.used_bytes > self.warning_threshold_bytes {
            TelemetryOutcome::Breach(usage)
        } else if usage.used_bytes > self.info_threshold_bytes {
            TelemetryOutcome::Elevated(usage)
        } else {
            TelemetryOutcome::Normal(usage)
        }
    }

    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            available: self.is_available(),
            samples: self.samples.load(Ordering::Relaxed),
            breaches: self.breaches.load(Ordering::Relaxed),
            last: *self.last.lock(),
        }
    }
}

/*!
 * Lifecycle Manager Builder
 * Builder pattern for LifecycleManager construction
 */

use super::LifecycleManager;
use crate::core::types::Target;
use crate::host::{Ambient, Clock, MemoryProbe, SystemClock};
use log::info;
use std::sync::Arc;

/// Builder for LifecycleManager
pub struct LifecycleManagerBuilder {
    ambient: Ambient,
    clock: Option<Arc<dyn Clock>>,
    probe: Option<Arc<dyn MemoryProbe>>,
    unload_target: Option<Target>,
}

impl LifecycleManagerBuilder {
    /// Create a builder over the ambient slot application code calls through
    pub fn new(ambient: Ambient) -> Self {
        Self {
            ambient,
            clock: None,
            probe: None,
            unload_target: None,
        }
    }

    /// Use a host clock instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enable memory telemetry through a host probe
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Run teardown when this target receives an unload event
    pub fn with_unload_target(mut self, target: Target) -> Self {
        self.unload_target = Some(target);
        self
    }

    /// Build the LifecycleManager
    pub fn build(self) -> LifecycleManager {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        let mut features = Vec::new();
        if self.probe.is_some() {
            features.push("telemetry");
        }
        if self.unload_target.is_some() {
            features.push("unload-hook");
        }

        if features.is_empty() {
            info!("Lifecycle manager built");
        } else {
            info!("Lifecycle manager built with: {}", features.join(", "));
        }

        LifecycleManager::from_parts(self.ambient, clock, self.probe, self.unload_target)
    }
}

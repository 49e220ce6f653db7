/*!
 * Diagnostics
 * Immutable point-in-time snapshot of the registry for external reporting
 */

use crate::core::errors::LifecycleResult;
use crate::core::types::{
    BindingOptions, HandlerId, Millis, ObserverId, TargetId, TargetKind, TimerHandle, TimerKind,
};
use crate::manager::ManagerState;
use crate::monitoring::TelemetryStats;
use crate::registry::{Registry, RegistryCounts};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerInfo {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub delay_ms: Millis,
    pub created_at: Millis,
    pub age_ms: Millis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerInfo {
    pub target_id: TargetId,
    pub target_kind: TargetKind,
    pub target_label: String,
    pub event_type: String,
    pub handler_id: HandlerId,
    pub handler: String,
    pub options: BindingOptions,
    pub created_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverInfo {
    pub id: ObserverId,
    pub kind_tag: String,
    pub created_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub name: String,
    pub created_at: Millis,
    pub destroyed: bool,
}

/// Snapshot returned by `LifecycleManager::report`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    pub timestamp_ms: Millis,
    pub state: ManagerState,
    pub interception_installed: bool,
    pub counts: RegistryCounts,
    pub timers: Vec<TimerInfo>,
    pub listeners: Vec<ListenerInfo>,
    pub observers: Vec<ObserverInfo>,
    pub components: Vec<ComponentInfo>,
    pub telemetry: Option<TelemetryStats>,
}

impl DiagnosticsReport {
    /// Read the registry without mutating it
    pub fn capture(
        registry: &Registry,
        now: Millis,
        state: ManagerState,
        interception_installed: bool,
        telemetry: Option<TelemetryStats>,
    ) -> Self {
        let timers: Vec<TimerInfo> = registry
            .timers()
            .into_iter()
            .map(|t| TimerInfo {
                handle: t.handle,
                kind: t.kind,
                delay_ms: t.delay_ms,
                created_at: t.created_at,
                age_ms: t.age_ms(now),
            })
            .collect();

        let listeners: Vec<ListenerInfo> = registry
            .listeners()
            .into_iter()
            .map(|l| ListenerInfo {
                target_id: l.target.id,
                target_kind: l.target.kind,
                target_label: l.target.label.to_string(),
                event_type: l.event_type.clone(),
                handler_id: l.handler.id(),
                handler: l.label.clone(),
                options: l.options,
                created_at: l.created_at,
            })
            .collect();

        let observers: Vec<ObserverInfo> = registry
            .observers()
            .into_iter()
            .map(|o| ObserverInfo {
                id: o.id,
                kind_tag: o.kind_tag.clone(),
                created_at: o.created_at,
            })
            .collect();

        let components: Vec<ComponentInfo> = registry
            .components()
            .into_iter()
            .map(|c| ComponentInfo {
                destroyed: c.is_destroyed(),
                name: c.name,
                created_at: c.created_at,
            })
            .collect();

        // Counts derived from the listings so the snapshot is self-consistent
        let counts = RegistryCounts {
            timers: timers.len(),
            listeners: listeners.len(),
            observers: observers.len(),
            components: components.len(),
        };

        Self {
            timestamp_ms: now,
            state,
            interception_installed,
            counts,
            timers,
            listeners,
            observers,
            components,
            telemetry,
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.counts.total()
    }

    pub fn to_json(&self) -> LifecycleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

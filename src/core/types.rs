/*!
 * Core Types
 * Handles, targets and callbacks shared across the lifecycle kernel
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Milliseconds on the host clock
pub type Millis = u64;

/// Opaque timer handle issued by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerHandle(pub u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Timer flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Repeating,
    Once,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repeating => "repeating",
            Self::Once => "once",
        }
    }
}

/// Callback fired by a timer
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Resource partitions tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Timer,
    Listener,
    Observer,
    Component,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timer => "timers",
            Self::Listener => "listeners",
            Self::Observer => "observers",
            Self::Component => "components",
        }
    }
}

/// Kind of event target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Element,
    Document,
    Window,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Document => "document",
            Self::Window => "window",
        }
    }
}

/// Stable identity of an event target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u64);

/// Event target reference
///
/// Cheap to clone; identity is the `id`, the label is for humans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
    pub label: Arc<str>,
}

impl Target {
    pub fn new(id: u64, kind: TargetKind, label: impl Into<Arc<str>>) -> Self {
        Self {
            id: TargetId(id),
            kind,
            label: label.into(),
        }
    }

    #[inline]
    pub fn element(id: u64, label: impl Into<Arc<str>>) -> Self {
        Self::new(id, TargetKind::Element, label)
    }

    #[inline]
    pub fn document(id: u64) -> Self {
        Self::new(id, TargetKind::Document, "document")
    }

    #[inline]
    pub fn window(id: u64) -> Self {
        Self::new(id, TargetKind::Window, "window")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({})", self.kind.as_str(), self.id.0, self.label)
    }
}

/// Event delivered to bound handlers
#[derive(Debug, Clone)]
pub struct Event {
    pub target: Target,
    pub event_type: String,
}

impl Event {
    pub fn new(target: Target, event_type: impl Into<String>) -> Self {
        Self {
            target,
            event_type: event_type.into(),
        }
    }
}

/// Identity of a handler allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HandlerId(pub usize);

/// Event handler with reference identity
///
/// Clones share identity; two handlers built from the same closure source
/// are still distinct.
#[derive(Clone)]
pub struct Handler {
    func: Arc<dyn Fn(&Event) + Send + Sync>,
    label: Arc<str>,
}

impl Handler {
    /// Wrap a closure, labelling it with its type name
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            label: Arc::from(std::any::type_name::<F>()),
        }
    }

    /// Wrap a closure with an explicit label
    pub fn labeled<F>(label: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            label: label.into(),
        }
    }

    #[inline]
    pub fn id(&self) -> HandlerId {
        HandlerId(Arc::as_ptr(&self.func) as *const () as usize)
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label cut to at most `max_chars` characters
    pub fn truncated_label(&self, max_chars: usize) -> String {
        self.label.chars().take(max_chars).collect()
    }

    #[inline]
    pub fn call(&self, event: &Event) {
        (self.func)(event)
    }

    #[inline]
    pub fn same_as(&self, other: &Handler) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id())
            .field("label", &self.label)
            .finish()
    }
}

/// Options passed alongside a binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl BindingOptions {
    #[inline]
    #[must_use]
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }
}

/// Registry key of a listener binding
///
/// Hosts treat the capture and bubble phases as separate bindings, so the
/// key carries the capture flag too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub target: TargetId,
    pub event_type: String,
    pub handler: HandlerId,
    pub capture: bool,
}

impl ListenerKey {
    pub fn new(
        target: &Target,
        event_type: &str,
        handler: &Handler,
        options: BindingOptions,
    ) -> Self {
        Self {
            target: target.id,
            event_type: event_type.to_string(),
            handler: handler.id(),
            capture: options.capture,
        }
    }
}

/// Identity of a registered observer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObserverId(pub usize);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{:x}", self.0)
    }
}

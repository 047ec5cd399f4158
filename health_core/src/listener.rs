//! Monitor events and the listeners that receive them

use crate::monitor::{MonitorState, Subsystem};
use crate::status::StatusLevel;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A recomputed aggregate, dispatched to every listener.
///
/// Events are produced at construction, on `start`, and on every subsystem
/// update, even when the overall status did not change.
///
/// The subsystem view borrows the monitor's snapshots and is only valid for
/// the duration of the listener callback. Use [`MonitorEvent::to_state`] or
/// [`MonitorEvent::to_subsystems`] to retain it.
#[derive(Debug, Clone, Copy)]
pub struct MonitorEvent<'a> {
    /// The new overall status.
    pub status: StatusLevel,
    /// Timestamp of the update that produced this event. Always UTC.
    pub last_update: DateTime<Utc>,
    /// Whether `status` differs from the previously published status.
    pub status_changed: bool,
    subsystems: &'a [Subsystem],
}

impl<'a> MonitorEvent<'a> {
    pub(crate) fn new(
        status: StatusLevel,
        last_update: DateTime<Utc>,
        status_changed: bool,
        subsystems: &'a [Subsystem],
    ) -> Self {
        Self {
            status,
            last_update,
            status_changed,
            subsystems,
        }
    }

    pub fn subsystem_count(&self) -> usize {
        self.subsystems.len()
    }

    /// Subsystem snapshots, in definition order.
    pub fn subsystems(&self) -> impl ExactSizeIterator<Item = &'a Subsystem> {
        self.subsystems.iter()
    }

    pub fn to_subsystems(&self) -> Vec<Subsystem> {
        self.subsystems.to_vec()
    }

    pub fn to_state(&self) -> MonitorState {
        MonitorState {
            status: self.status,
            last_update: self.last_update,
            subsystems: self.to_subsystems(),
        }
    }
}

/// A sink for monitor events.
///
/// Dispatch runs under the monitor's lock so that listeners observe every
/// update atomically. Implementations must not block, must not panic, and
/// must not call back into the monitor (doing so deadlocks).
pub trait MonitorListener: Send + Sync {
    fn on_monitor_event(&self, event: &MonitorEvent<'_>);
}

impl<F> MonitorListener for F
where
    F: Fn(&MonitorEvent<'_>) + Send + Sync,
{
    fn on_monitor_event(&self, event: &MonitorEvent<'_>) {
        self(event)
    }
}

/// An ordered set of listeners that is itself a listener.
#[derive(Clone, Default)]
pub struct MonitorListeners {
    listeners: Vec<Arc<dyn MonitorListener>>,
}

impl MonitorListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: Arc<dyn MonitorListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for MonitorListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn MonitorListener>> for MonitorListeners {
    fn from_iter<T: IntoIterator<Item = Arc<dyn MonitorListener>>>(iter: T) -> Self {
        Self {
            listeners: iter.into_iter().collect(),
        }
    }
}

impl MonitorListener for MonitorListeners {
    fn on_monitor_event(&self, event: &MonitorEvent<'_>) {
        for listener in &self.listeners {
            listener.on_monitor_event(event);
        }
    }
}

/// Logs overall status transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl MonitorListener for TracingListener {
    fn on_monitor_event(&self, event: &MonitorEvent<'_>) {
        if !event.status_changed {
            debug!(
                status = %event.status,
                subsystems = event.subsystem_count(),
                "Health updated"
            );
            return;
        }

        let unhealthy: Vec<&str> = event
            .subsystems()
            .filter(|s| !s.status.is_good())
            .map(|s| s.name.as_ref())
            .collect();

        match event.status {
            StatusLevel::Good => info!(status = %event.status, "Overall health changed"),
            StatusLevel::Warn => warn!(
                status = %event.status,
                unhealthy = ?unhealthy,
                "Overall health changed"
            ),
            StatusLevel::Bad => error!(
                status = %event.status,
                unhealthy = ?unhealthy,
                "Overall health changed"
            ),
        }
    }
}

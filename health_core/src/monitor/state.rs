//! Published aggregate state and the publisher that produces it

use super::aggregate::overall_status;
use super::Subsystem;
use crate::listener::{MonitorEvent, MonitorListener, MonitorListeners};
use crate::status::StatusLevel;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// A snapshot of a monitor: overall status plus every subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    pub status: StatusLevel,
    /// Timestamp of the last update to any subsystem. Always UTC.
    pub last_update: DateTime<Utc>,
    pub subsystems: Vec<Subsystem>,
}

impl MonitorState {
    pub fn subsystem(&self, name: &str) -> Option<&Subsystem> {
        self.subsystems.iter().find(|s| s.name.as_ref() == name)
    }

    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

/// Recomputes the aggregate, swaps in the new state and fans the event out.
pub(crate) struct Publisher {
    listeners: MonitorListeners,
    state: ArcSwap<MonitorState>,
}

impl Publisher {
    /// Computes and dispatches the initial aggregate.
    pub(crate) fn new(
        listeners: MonitorListeners,
        subsystems: &[Subsystem],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let event = MonitorEvent::new(overall_status(subsystems), timestamp, true, subsystems);
        let publisher = Self {
            listeners,
            state: ArcSwap::from_pointee(event.to_state()),
        };

        publisher.listeners.on_monitor_event(&event);
        publisher
    }

    /// Must run under the monitor lock, so that the swapped state and the
    /// dispatched event always match the snapshots that produced them.
    pub(crate) fn publish(&self, subsystems: &[Subsystem], timestamp: DateTime<Utc>) -> StatusLevel {
        let status = overall_status(subsystems);
        let previous = self.state.load().status;
        let event = MonitorEvent::new(status, timestamp, status != previous, subsystems);

        self.state.store(Arc::new(event.to_state()));
        self.listeners.on_monitor_event(&event);
        status
    }

    pub(crate) fn current(&self) -> Arc<MonitorState> {
        self.state.load_full()
    }
}

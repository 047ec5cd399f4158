//! Subsystem definitions and snapshots

use crate::error::SubsystemError;
use crate::metadata::Metadata;
use crate::probe::SharedProbe;
use crate::status::StatusLevel;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to define one subsystem within a monitor.
///
/// Subsystems are critical by default. A critical subsystem's status flows
/// straight into the overall status; a noncritical one can at worst make the
/// overall status `Warn`.
#[derive(Clone)]
pub struct SubsystemSpec {
    /// Unique within a monitor.
    pub name: String,
    /// Initial status, in effect until the first update.
    pub status: StatusLevel,
    pub non_critical: bool,
    /// Optional probe, invoked on `probe_interval` while the monitor runs.
    /// Without one, the subsystem only changes through its `Updater`.
    pub probe: Option<SharedProbe>,
    /// Ignored without a probe. Zero means the monitor's default interval.
    pub probe_interval: Duration,
    pub metadata: Metadata,
}

impl SubsystemSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StatusLevel::Good,
            non_critical: false,
            probe: None,
            probe_interval: Duration::ZERO,
            metadata: Metadata::default(),
        }
    }

    pub fn with_status(mut self, status: StatusLevel) -> Self {
        self.status = status;
        self
    }

    pub fn non_critical(mut self) -> Self {
        self.non_critical = true;
        self
    }

    pub fn with_probe(mut self, probe: SharedProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl std::fmt::Debug for SubsystemSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemSpec")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("non_critical", &self.non_critical)
            .field("probe", &self.probe.is_some())
            .field("probe_interval", &self.probe_interval)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A point-in-time snapshot of one subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsystem {
    pub name: Arc<str>,
    pub status: StatusLevel,
    /// UTC time of the last status update. Never moves backwards.
    pub last_update: DateTime<Utc>,
    /// The error reported with the most recent update, if any.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub last_error: Option<SubsystemError>,
    pub non_critical: bool,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

fn serialize_error<S: Serializer>(
    error: &Option<SubsystemError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

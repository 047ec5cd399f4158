//! Per-subsystem update path and probe scheduling

use super::state::Publisher;
use super::Subsystem;
use crate::clock::Clock;
use crate::error::{BoxError, SelfStatus, SubsystemError};
use crate::probe::{ProbeResult, SharedProbe};
use crate::status::StatusLevel;
use parking_lot::Mutex;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// State guarded by the monitor's single write lock.
pub(crate) struct MonitorInner {
    pub(crate) subsystems: Vec<Subsystem>,
    /// Present while the monitor is running.
    pub(crate) lifetime: Option<CancellationToken>,
}

/// What a tracker needs from its monitor.
#[derive(Clone)]
pub(crate) struct TrackerContext {
    pub(crate) lock: Arc<Mutex<MonitorInner>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) publisher: Arc<Publisher>,
}

pub(crate) struct SubsystemTracker {
    index: usize,
    name: Arc<str>,
    probe: Option<SharedProbe>,
    probe_interval: Duration,
    context: TrackerContext,
}

impl SubsystemTracker {
    pub(crate) fn new(
        index: usize,
        name: Arc<str>,
        probe: Option<SharedProbe>,
        probe_interval: Duration,
        context: TrackerContext,
    ) -> Self {
        Self {
            index,
            name,
            probe,
            probe_interval,
            context,
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn has_probe(&self) -> bool {
        self.probe.is_some()
    }

    /// The only mutation path for a subsystem. Mutation, recompute and
    /// dispatch all happen under the monitor lock.
    pub(crate) fn update(&self, status: StatusLevel, error: Option<SubsystemError>) {
        let mut inner = self.context.lock.lock();
        let now = self.context.clock.now();

        let current = &mut inner.subsystems[self.index];
        let timestamp = now.max(current.last_update);
        current.status = status;
        current.last_error = error;
        current.last_update = timestamp;

        let overall = self.context.publisher.publish(&inner.subsystems, timestamp);
        debug!(
            subsystem = %self.name,
            status = %status,
            overall = %overall,
            "Subsystem updated"
        );
    }

    /// Spawns the probe loop on `runtime`, if this subsystem has a probe.
    pub(crate) fn spawn_probe(
        self: &Arc<Self>,
        runtime: &tokio::runtime::Handle,
        token: CancellationToken,
    ) {
        if let Some(probe) = self.probe.clone() {
            runtime.spawn(Arc::clone(self).run_probe(probe, token));
        }
    }

    async fn run_probe(self: Arc<Self>, probe: SharedProbe, token: CancellationToken) {
        debug!(
            subsystem = %self.name,
            interval = ?self.probe_interval,
            "Probe task started"
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(subsystem = %self.name, "Probe task stopped");
                    return;
                }
                _ = tokio::time::sleep(self.probe_interval) => {
                    let result = probe.probe(token.clone()).await;
                    if token.is_cancelled() {
                        debug!(subsystem = %self.name, "Discarding probe result after shutdown");
                        return;
                    }
                    self.update(result.status, result.error);
                }
            }
        }
    }
}

/// Pushes status updates into one subsystem.
///
/// Obtained from `Monitor::updater`. Usable at any time, before `start` and
/// after `shutdown` included.
#[derive(Clone)]
pub struct Updater {
    tracker: Arc<SubsystemTracker>,
}

impl Updater {
    pub(crate) fn new(tracker: Arc<SubsystemTracker>) -> Self {
        Self { tracker }
    }

    pub fn name(&self) -> &str {
        self.tracker.name()
    }

    /// Sets the subsystem's status and last error. The new overall state is
    /// published before this returns.
    pub fn update(&self, status: StatusLevel, error: Option<SubsystemError>) {
        self.tracker.update(status, error);
    }

    /// Records the outcome of an operation, deriving the status from any
    /// error with `error_status`.
    pub fn report<E: Into<BoxError>>(&self, result: Result<(), E>) {
        let ProbeResult { status, error } = ProbeResult::from_result(result);
        self.tracker.update(status, error);
    }

    /// Like [`Updater::report`], using the status the error declares for
    /// itself instead of searching it for a `StatusError`.
    pub fn report_status<E>(&self, result: Result<(), E>)
    where
        E: SelfStatus + StdError + Send + Sync + 'static,
    {
        let ProbeResult { status, error } = ProbeResult::from_self_status_result(result);
        self.tracker.update(status, error);
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater").field("name", &self.name()).finish()
    }
}

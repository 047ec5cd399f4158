//! Health monitor: aggregates subsystem statuses into one overall status
//!
//! # Data Flow
//! ```text
//! Updater::update / probe task
//!     → monitor lock
//!     → mutate subsystem snapshot
//!     → recompute overall status (aggregate.rs)
//!     → swap published state, dispatch event to listeners
//!     → unlock
//! ```

pub mod aggregate;
pub mod state;
pub mod subsystem;
pub mod tracker;


pub use state::MonitorState;
pub use subsystem::{Subsystem, SubsystemSpec};
pub use tracker::Updater;

use crate::clock::{Clock, SystemClock};
use crate::error::{MonitorError, Result};
use crate::listener::{MonitorListener, MonitorListeners};
use crate::probe::DEFAULT_PROBE_INTERVAL;
use parking_lot::Mutex;
use state::Publisher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker::{MonitorInner, SubsystemTracker, TrackerContext};
use tracing::{info, warn};

/// Monitor-wide settings.
#[derive(Clone)]
pub struct MonitorOptions {
    /// Interval for probes that don't set one. Zero means [`DEFAULT_PROBE_INTERVAL`].
    pub default_probe_interval: Duration,
    pub listeners: MonitorListeners,
    pub clock: Arc<dyn Clock>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            default_probe_interval: DEFAULT_PROBE_INTERVAL,
            listeners: MonitorListeners::new(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// A health status monitor for application subsystems.
///
/// Each subsystem is updated either through its [`Updater`], at any time, or
/// by a probe invoked on an interval while the monitor is running. Every
/// update recomputes the overall status and publishes it to the listeners
/// before the update call returns.
///
/// The set of subsystems is fixed at construction.
pub struct Monitor {
    context: TrackerContext,
    trackers: Vec<Arc<SubsystemTracker>>,
    by_name: HashMap<Arc<str>, usize>,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    /// Builds a stopped monitor. The initial overall state is computed from
    /// the subsystems' initial statuses, all stamped with the same time.
    pub fn new(specs: impl IntoIterator<Item = SubsystemSpec>, options: MonitorOptions) -> Result<Self> {
        let default_interval = if options.default_probe_interval.is_zero() {
            DEFAULT_PROBE_INTERVAL
        } else {
            options.default_probe_interval
        };

        let initial_update = options.clock.now();
        let mut by_name = HashMap::new();
        let mut subsystems = Vec::new();
        let mut probes = Vec::new();

        for (index, spec) in specs.into_iter().enumerate() {
            let name: Arc<str> = Arc::from(spec.name);
            if by_name.insert(Arc::clone(&name), index).is_some() {
                return Err(MonitorError::DuplicateSubsystem(name.to_string()));
            }

            let probe_interval = match spec.probe {
                None => Duration::ZERO,
                Some(_) if spec.probe_interval.is_zero() => default_interval,
                Some(_) => spec.probe_interval,
            };

            subsystems.push(Subsystem {
                name: Arc::clone(&name),
                status: spec.status,
                last_update: initial_update,
                last_error: None,
                non_critical: spec.non_critical,
                metadata: spec.metadata,
            });
            probes.push((name, spec.probe, probe_interval));
        }

        let publisher = Arc::new(Publisher::new(options.listeners, &subsystems, initial_update));
        let context = TrackerContext {
            lock: Arc::new(Mutex::new(MonitorInner {
                subsystems,
                lifetime: None,
            })),
            clock: options.clock,
            publisher,
        };

        let trackers = probes
            .into_iter()
            .enumerate()
            .map(|(index, (name, probe, interval))| {
                Arc::new(SubsystemTracker::new(index, name, probe, interval, context.clone()))
            })
            .collect();

        Ok(Self {
            context,
            trackers,
            by_name,
        })
    }

    /// Number of subsystems.
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trackers.iter().map(|t| t.name().as_ref())
    }

    /// Returns the updater for a subsystem.
    pub fn updater(&self, name: &str) -> Result<Updater> {
        // the subsystem set is immutable, no locking needed
        self.by_name
            .get(name)
            .map(|&index| Updater::new(Arc::clone(&self.trackers[index])))
            .ok_or_else(|| MonitorError::SubsystemNotFound(name.to_string()))
    }

    /// Returns the most recently published state. Never blocks on updates.
    pub fn state(&self) -> Arc<MonitorState> {
        self.context.publisher.current()
    }

    pub fn is_running(&self) -> bool {
        self.context.lock.lock().lifetime.is_some()
    }

    /// Publishes the current state and starts a probe task for every
    /// subsystem with a probe.
    ///
    /// Returns [`MonitorError::AlreadyStarted`] without side effects if the
    /// monitor is running. Probes require a tokio runtime; without one this
    /// returns [`MonitorError::NoRuntime`].
    pub fn start(&self) -> Result<()> {
        let mut inner = self.context.lock.lock();
        if inner.lifetime.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }

        let probed: Vec<_> = self.trackers.iter().filter(|t| t.has_probe()).collect();
        let runtime = if probed.is_empty() {
            None
        } else {
            Some(tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?)
        };

        let now = self.context.clock.now();
        let overall = self.context.publisher.publish(&inner.subsystems, now);

        let token = CancellationToken::new();
        if let Some(runtime) = runtime {
            for tracker in &probed {
                tracker.spawn_probe(&runtime, token.clone());
            }
        }
        inner.lifetime = Some(token);

        info!(
            subsystems = self.trackers.len(),
            probes = probed.len(),
            status = %overall,
            "Health monitor started"
        );
        Ok(())
    }

    /// Stops all probe tasks. Subsystem states are kept, and updaters keep
    /// working. Does not wait for the probe tasks to exit.
    ///
    /// Returns [`MonitorError::NotStarted`] if the monitor is not running.
    pub fn shutdown(&self) -> Result<()> {
        let token = self
            .context
            .lock
            .lock()
            .lifetime
            .take()
            .ok_or(MonitorError::NotStarted)?;

        token.cancel();
        info!("Health monitor shut down");
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(token) = self.context.lock.lock().lifetime.take() {
            warn!("Health monitor dropped while running, stopping probes");
            token.cancel();
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("subsystems", &self.trackers.len())
            .field("status", &self.state().status)
            .finish()
    }
}

#[derive(Default)]
pub struct MonitorBuilder {
    specs: Vec<SubsystemSpec>,
    options: MonitorOptions,
}

impl MonitorBuilder {
    pub fn subsystem(mut self, spec: SubsystemSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn subsystems(mut self, specs: impl IntoIterator<Item = SubsystemSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    pub fn default_probe_interval(mut self, interval: Duration) -> Self {
        self.options.default_probe_interval = interval;
        self
    }

    /// Listeners receive events in the order they were added.
    pub fn listener<L: MonitorListener + 'static>(self, listener: L) -> Self {
        self.shared_listener(Arc::new(listener))
    }

    pub fn shared_listener(mut self, listener: Arc<dyn MonitorListener>) -> Self {
        self.options.listeners.push(listener);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.options.clock = clock;
        self
    }

    pub fn build(self) -> Result<Monitor> {
        Monitor::new(self.specs, self.options)
    }
}

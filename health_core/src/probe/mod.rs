//! Probes: callbacks that actively interrogate a subsystem on a timer

pub mod checks;


pub use checks::FilesystemProbe;

use crate::error::{error_status, BoxError, SelfStatus, StatusError, SubsystemError};
use crate::status::StatusLevel;
use futures_util::future::{ready, Ready};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Interval used for probes when neither the subsystem nor the monitor sets one.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(120);

/// The outcome of one probe invocation.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub status: StatusLevel,
    pub error: Option<SubsystemError>,
}

impl ProbeResult {
    pub fn new(status: StatusLevel, error: Option<SubsystemError>) -> Self {
        Self { status, error }
    }

    pub fn good() -> Self {
        Self::new(StatusLevel::Good, None)
    }

    pub fn warn() -> Self {
        Self::new(StatusLevel::Warn, None)
    }

    pub fn bad() -> Self {
        Self::new(StatusLevel::Bad, None)
    }

    /// Records `err` and derives the status from it with [`error_status`].
    pub fn from_error(err: impl Into<BoxError>) -> Self {
        let err: SubsystemError = Arc::from(err.into());
        let status = error_status(Some(&*err));
        Self::new(status, Some(err))
    }

    pub fn from_result<E: Into<BoxError>>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::good(),
            Err(e) => Self::from_error(e),
        }
    }

    /// Records `err` with the status it declares for itself.
    pub fn from_self_status<E>(err: E) -> Self
    where
        E: SelfStatus + StdError + Send + Sync + 'static,
    {
        Self::from_error(StatusError::from_self_status(err))
    }

    pub fn from_self_status_result<E>(result: Result<(), E>) -> Self
    where
        E: SelfStatus + StdError + Send + Sync + 'static,
    {
        match result {
            Ok(()) => Self::good(),
            Err(e) => Self::from_self_status(e),
        }
    }
}

impl From<StatusLevel> for ProbeResult {
    fn from(status: StatusLevel) -> Self {
        Self::new(status, None)
    }
}

/// Interrogates a subsystem's health.
///
/// The token is the monitor's lifetime token; it is cancelled on shutdown so
/// that long-running checks can give up early.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, token: CancellationToken) -> ProbeResult;
}

pub type SharedProbe = Arc<dyn Probe>;

/// Adapts an async closure with the canonical probe signature.
pub struct ProbeFn<F>(F);

#[async_trait::async_trait]
impl<F, Fut> Probe for ProbeFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    async fn probe(&self, token: CancellationToken) -> ProbeResult {
        (self.0)(token).await
    }
}

impl<F> std::fmt::Debug for ProbeFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProbeFn")
    }
}

pub fn probe_fn<F, Fut>(f: F) -> SharedProbe
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    Arc::new(ProbeFn(f))
}

fn sync_probe<F>(f: F) -> SharedProbe
where
    F: Fn() -> ProbeResult + Send + Sync + 'static,
{
    probe_fn(move |_| -> Ready<ProbeResult> { ready(f()) })
}

/// `true` is `Good`, `false` is `Bad`.
pub fn from_bool<F>(f: F) -> SharedProbe
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    sync_probe(move || StatusLevel::from(f()).into())
}

pub fn from_status<F>(f: F) -> SharedProbe
where
    F: Fn() -> StatusLevel + Send + Sync + 'static,
{
    sync_probe(move || f().into())
}

/// Errors are recorded and mapped to a status with [`error_status`].
pub fn from_result<F, E>(f: F) -> SharedProbe
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    sync_probe(move || ProbeResult::from_result(f()))
}

/// Errors are recorded with the status they declare through [`SelfStatus`].
pub fn from_self_status_result<F, E>(f: F) -> SharedProbe
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: SelfStatus + StdError + Send + Sync + 'static,
{
    sync_probe(move || ProbeResult::from_self_status_result(f()))
}

pub fn from_status_result<F>(f: F) -> SharedProbe
where
    F: Fn() -> (StatusLevel, Option<SubsystemError>) + Send + Sync + 'static,
{
    sync_probe(move || {
        let (status, error) = f();
        ProbeResult::new(status, error)
    })
}

/// Async variant of [`from_result`].
pub fn from_async_result<F, Fut, E>(f: F) -> SharedProbe
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    probe_fn(move |token| {
        let fut = f(token);
        async move { ProbeResult::from_result(fut.await) }
    })
}

//! Monitor error types and the error-to-status convention

use crate::status::StatusLevel;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// An error reported by (or about) a single subsystem.
///
/// Shared so that snapshots and published events can hold it without copying.
pub type SubsystemError = Arc<dyn StdError + Send + Sync + 'static>;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("A subsystem with the name [{0}] already exists")]
    DuplicateSubsystem(String),

    #[error("No subsystem with the name [{0}] is registered")]
    SubsystemNotFound(String),

    #[error("The monitor has been started")]
    AlreadyStarted,

    #[error("The monitor has not been started")]
    NotStarted,

    #[error("Probes require a running tokio runtime")]
    NoRuntime,
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match self {
            MonitorError::SubsystemNotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::AlreadyStarted | MonitorError::NotStarted => StatusCode::CONFLICT,
            MonitorError::DuplicateSubsystem(_) => StatusCode::BAD_REQUEST,
            MonitorError::NoRuntime => {
                tracing::error!("Monitor error: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Lets an error type declare the health status it implies.
///
/// Trait objects can't be searched for this trait, so an error only carries
/// its own status through [`error_status`] once it is wrapped in a
/// [`StatusError`]. The `*_self_status` entry points on `ProbeResult`,
/// `Updater` and the probe helpers do that wrapping.
pub trait SelfStatus {
    fn status(&self) -> StatusLevel;
}

/// For errors that only know whether their subsystem is still healthy.
/// `true` is `Good`, `false` is `Bad`.
pub trait SelfHealthy {
    fn is_healthy(&self) -> bool;
}

impl<T: SelfHealthy + ?Sized> SelfStatus for T {
    fn status(&self) -> StatusLevel {
        StatusLevel::from(self.is_healthy())
    }
}

/// An error carrying an explicit health status.
#[derive(Debug)]
pub struct StatusError {
    inner: BoxError,
    status: StatusLevel,
}

impl StatusError {
    /// Associates `status` with `err`. If `err` already carries a status,
    /// that status is replaced rather than nested.
    pub fn new(err: impl Into<BoxError>, status: StatusLevel) -> Self {
        let inner = match err.into().downcast::<StatusError>() {
            Ok(existing) => existing.inner,
            Err(other) => other,
        };

        Self { inner, status }
    }

    pub fn from_self_status<E>(err: E) -> Self
    where
        E: SelfStatus + StdError + Send + Sync + 'static,
    {
        let status = err.status();
        Self::new(err, status)
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl StdError for StatusError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl SelfStatus for StatusError {
    fn status(&self) -> StatusLevel {
        self.status
    }
}

/// Shorthand for [`StatusError::new`].
pub fn with_status(err: impl Into<BoxError>, status: StatusLevel) -> StatusError {
    StatusError::new(err, status)
}

/// Determines the health status implied by an error.
///
/// No error is `Good`. Otherwise the error and its `source()` chain are
/// searched for a [`StatusError`], whose status wins. Any other error is `Bad`.
pub fn error_status(err: Option<&(dyn StdError + 'static)>) -> StatusLevel {
    let mut current = match err {
        Some(err) => Some(err),
        None => return StatusLevel::Good,
    };

    while let Some(err) = current {
        if let Some(status_error) = err.downcast_ref::<StatusError>() {
            return status_error.status();
        }
        current = err.source();
    }

    StatusLevel::Bad
}

pub fn status_of_result<E: SelfStatus>(result: &std::result::Result<(), E>) -> StatusLevel {
    match result {
        Ok(()) => StatusLevel::Good,
        Err(e) => e.status(),
    }
}

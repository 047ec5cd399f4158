//! Ready-made probes for common subsystem checks

use super::{Probe, ProbeResult};
use crate::error::with_status;
use crate::status::StatusLevel;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
#[error("Filesystem access failed: {}", issues.join(", "))]
pub struct FilesystemIssues {
    pub issues: Vec<String>,
}

/// Verifies that a set of paths exist and are readable and writable.
///
/// All paths healthy is `Good`, some failing is `Warn`, all failing is `Bad`.
#[derive(Debug, Clone)]
pub struct FilesystemProbe {
    paths: Vec<PathBuf>,
}

impl FilesystemProbe {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    async fn check_path(path: &Path) -> Vec<String> {
        let mut issues = Vec::new();

        if !path.exists() {
            issues.push(format!("Path does not exist: {}", path.display()));
            return issues;
        }

        if fs::metadata(path).await.is_err() {
            issues.push(format!("Cannot read path: {}", path.display()));
        }

        let probe_dir = if path.is_dir() { Some(path) } else { path.parent() };
        let writable = match probe_dir {
            Some(dir) => {
                let temp_file = dir.join(".health_check_temp");
                match fs::write(&temp_file, "test").await {
                    Ok(_) => {
                        let _ = fs::remove_file(&temp_file).await;
                        true
                    }
                    Err(_) => false,
                }
            }
            None => false,
        };

        if !writable {
            issues.push(format!("Cannot write to path: {}", path.display()));
        }

        issues
    }
}

#[async_trait::async_trait]
impl Probe for FilesystemProbe {
    async fn probe(&self, _token: CancellationToken) -> ProbeResult {
        let mut issues = Vec::new();
        let mut failing_paths = 0;

        for path in &self.paths {
            let path_issues = Self::check_path(path).await;
            if !path_issues.is_empty() {
                failing_paths += 1;
                issues.extend(path_issues);
            }
        }

        debug!(
            paths = self.paths.len(),
            failing = failing_paths,
            "Filesystem probe completed"
        );

        if failing_paths == 0 {
            ProbeResult::good()
        } else if failing_paths < self.paths.len() {
            ProbeResult::from_error(with_status(FilesystemIssues { issues }, StatusLevel::Warn))
        } else {
            ProbeResult::from_error(FilesystemIssues { issues })
        }
    }
}

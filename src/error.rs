use std::path::PathBuf;

use thiserror::Error;

pub use crate::jobs::JobError;

/// Errors raised while collecting or rendering generation changes.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// Filesystem failure on a specific path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// git could not be launched for a reason other than being absent
    #[error("failed to run git: {0}")]
    GitSpawn(std::io::Error),
    /// git ran but reported a failure we do not interpret as "unusable"
    #[error("git {command} failed ({status}): {stderr}")]
    GitFailed {
        command: String,
        status: String,
        stderr: String,
    },
    /// A target key that is not part of the generation target table
    #[error("unknown generation target: {0}")]
    UnknownTarget(String),
    /// Directory traversal failure
    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

impl ChangeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for callers that drive both engines.
#[derive(Debug, Error)]
pub enum CreatorError {
    #[error(transparent)]
    Change(#[from] ChangeError),
    #[error(transparent)]
    Job(#[from] JobError),
}

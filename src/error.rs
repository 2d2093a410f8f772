//! Failure taxonomy for a build-and-deploy run.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop (or, for notifications, merely blemish) a run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The build command could not be spawned (not installed, not on PATH).
    #[error("could not run `{command}`: {reason}")]
    ToolchainUnavailable { command: String, reason: String },

    /// The directory the build has to run in does not exist.
    #[error("native source directory {} does not exist", .path.display())]
    SourceDirectoryMissing { path: PathBuf },

    /// The build ran and exited unsuccessfully.
    #[error("`{command}` failed ({status})")]
    BuildFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The build output directory has never been created.
    ///
    /// Recoverable: one more build is attempted before giving up.
    #[error("build output directory {} does not exist", .path.display())]
    ArtifactDirectoryMissing { path: PathBuf },

    /// The build output directory exists but could not be listed.
    #[error("cannot read build output directory {}: {reason}", .path.display())]
    ArtifactDirectoryUnreadable { path: PathBuf, reason: String },

    /// The build finished but left no matching library. `pattern` is the
    /// extension, or the exact file name when a library is configured.
    #[error("no `{pattern}` library found in {}", .dir.display())]
    ArtifactNotFound { dir: PathBuf, pattern: String },

    #[error("deploy directory {} does not exist", .path.display())]
    DeployTargetMissing { path: PathBuf },

    #[error("failed to copy {} to {}: {reason}", .source_path.display(), .destination.display())]
    DeployFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// Never fatal; reported and then dropped by the runner.
    #[error("desktop notification failed: {0}")]
    NotificationFailed(String),
}

impl DeployError {
    /// The stage of the run the failure belongs to, for user-facing output.
    pub fn stage(&self) -> &'static str {
        match self {
            DeployError::ToolchainUnavailable { .. }
            | DeployError::SourceDirectoryMissing { .. }
            | DeployError::BuildFailed { .. } => "build",
            DeployError::ArtifactDirectoryMissing { .. }
            | DeployError::ArtifactDirectoryUnreadable { .. }
            | DeployError::ArtifactNotFound { .. } => "discover",
            DeployError::DeployTargetMissing { .. } | DeployError::DeployFailed { .. } => "deploy",
            DeployError::NotificationFailed(_) => "notify",
        }
    }

    /// Error text captured from the failing tool, if any.
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            DeployError::BuildFailed { stderr, .. } if !stderr.trim().is_empty() => {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }
}

//! Running the external build toolchain.
//!
//! The build runs with the process working directory switched to the native
//! source project. The switch is held by a [`WorkdirGuard`], so the previous
//! directory comes back on every exit path, including unwinding panics.
//! Both output pipes are drained in full and success is read from the exit
//! status only; cargo prints progress on stderr even for clean builds.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::config::BuildConfig;
use crate::error::DeployError;
use crate::output;

/// Switches the process working directory and restores it on drop.
#[derive(Debug)]
pub struct WorkdirGuard {
    previous: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }

    /// The directory that will be restored.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            output::note(&format!(
                "could not restore working directory {}: {e}",
                self.previous.display()
            ));
        }
    }
}

/// Result of one finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_succeeded: bool,
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    /// Human-readable exit status, e.g. `exit status: 101`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for ProcessOutcome {
    fn from(output: Output) -> Self {
        Self {
            exit_succeeded: output.status.success(),
            exit_code: output.status.code(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Run the build command in the source directory and wait for it to exit.
///
/// A build that runs but fails is still `Ok`; inspect
/// [`ProcessOutcome::exit_succeeded`]. Only a build that cannot be started is
/// an error.
pub fn capture_build(config: &BuildConfig) -> Result<ProcessOutcome, DeployError> {
    let command_line = config.build_command_line();
    let Some((program, args)) = config.build_command.split_first() else {
        return Err(DeployError::ToolchainUnavailable {
            command: command_line,
            reason: "build command is empty".to_string(),
        });
    };

    if !config.source_dir.is_dir() {
        return Err(DeployError::SourceDirectoryMissing {
            path: config.source_dir.clone(),
        });
    }

    let guard =
        WorkdirGuard::enter(&config.source_dir).map_err(|e| DeployError::ToolchainUnavailable {
            command: command_line.clone(),
            reason: format!("cannot enter {}: {e}", config.source_dir.display()),
        })?;
    output::verbose_detail(&format!(
        "in {} (returning to {})",
        config.source_dir.display(),
        guard.previous().display()
    ));

    let result = Command::new(program).args(args).output();
    drop(guard);

    let output = result.map_err(|e| DeployError::ToolchainUnavailable {
        command: command_line,
        reason: e.to_string(),
    })?;
    Ok(ProcessOutcome::from(output))
}

impl ProcessOutcome {
    /// Turn a non-zero exit of `command` into [`DeployError::BuildFailed`].
    pub fn require_success(self, command: String) -> Result<Self, DeployError> {
        if self.exit_succeeded {
            Ok(self)
        } else {
            Err(DeployError::BuildFailed {
                command,
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Run the build and turn a non-zero exit into [`DeployError::BuildFailed`].
pub fn trigger_build(config: &BuildConfig) -> Result<ProcessOutcome, DeployError> {
    capture_build(config)?.require_success(config.build_command_line())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

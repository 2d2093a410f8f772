//! Build-and-deploy orchestration.
//!
//! build → discover → deploy → notify. The only automatic recovery is a
//! single rebuild when the build output directory does not exist yet.

use std::path::PathBuf;

use crate::artifact::discover_artifact;
use crate::config::BuildConfig;
use crate::deploy::deploy_artifact;
use crate::error::DeployError;
use crate::notify::Notifier;
use crate::output;
use crate::toolchain::{ProcessOutcome, capture_build};

pub const SUCCESS_TITLE: &str = "Build completed!";
pub const FAILURE_TITLE: &str = "Build failed!";

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// File name of the deployed library.
    pub artifact: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Number of builds performed (2 when the output directory was missing).
    pub builds: u32,
}

/// Build, locate, deploy, then notify (best effort) about the outcome.
///
/// A notification failure is reported on stderr and never changes the
/// returned result.
pub fn run(config: &BuildConfig, notifier: Option<&dyn Notifier>) -> Result<RunReport, DeployError> {
    let result = build_and_deploy(config);

    if let Some(notifier) = notifier {
        let (success, title, message) = completion_message(&result);
        if let Err(e) = notifier.notify(success, title, &message) {
            output::note(&e.to_string());
        }
    }

    result
}

fn build_and_deploy(config: &BuildConfig) -> Result<RunReport, DeployError> {
    let mut builds = 0;
    build(config, &mut builds)?;

    let artifact = match discover_artifact(config) {
        Err(DeployError::ArtifactDirectoryMissing { path }) => {
            output::note(&format!(
                "{} does not exist yet, building once more",
                path.display()
            ));
            build(config, &mut builds)?;
            discover_artifact(config)?
        }
        other => other?,
    };
    output::action("Found", &artifact);

    let source = config.build_output_dir.join(&artifact);
    let destination = deploy_artifact(config, &artifact)?;

    Ok(RunReport {
        artifact,
        source,
        destination,
        builds,
    })
}

fn build(config: &BuildConfig, builds: &mut u32) -> Result<ProcessOutcome, DeployError> {
    *builds += 1;
    output::action("Building", &config.build_command_line());
    let outcome = capture_build(config)?;
    if output::is_verbose() {
        output::stdout_block("stdout:", &outcome.stdout);
        output::stdout_block("stderr:", &outcome.stderr);
    }
    outcome.require_success(config.build_command_line())
}

/// Notification `(success, title, message)` for a run result.
pub fn completion_message(result: &Result<RunReport, DeployError>) -> (bool, &'static str, String) {
    match result {
        Ok(report) => (
            true,
            SUCCESS_TITLE,
            format!(
                "{} deployed to {}.\nGo ahead and play with your new toy.",
                report.artifact,
                report
                    .destination
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
        ),
        Err(e) => (
            false,
            FAILURE_TITLE,
            format!("{} stage failed: {e}.\nCheck stderr for more info.", e.stage()),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

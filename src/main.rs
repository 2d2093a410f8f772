use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;

use godot_autodeploy::config::{self, BuildConfig, BuildProfile, Settings};
use godot_autodeploy::error::DeployError;
use godot_autodeploy::notify::{DesktopNotifier, Notifier};
use godot_autodeploy::output;
use godot_autodeploy::runner::{self, RunReport};

/// Build the native Rust library and drop it into the Godot project.
///
/// Run from the project root: `rust/` is built with cargo and the resulting
/// dynamic library is copied into `godot/`, replacing the previous one.
#[derive(Parser, Debug)]
#[command(
    name = "autodeploy",
    version,
    about,
    after_help = "Examples:\n  autodeploy\n  autodeploy --release\n  autodeploy --project-dir ../pokemon --no-notify\n  autodeploy --config ci/autodeploy.toml -v"
)]
struct Cli {
    /// Build with `--release` and deploy from target/release.
    #[arg(long)]
    release: bool,

    /// Project root holding the native source and Godot directories
    /// (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Settings file to use instead of <project-dir>/autodeploy.toml.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the desktop notification.
    #[arg(long)]
    no_notify: bool,

    /// Show the resolved configuration and the toolchain's output.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Settings layer contributed by command-line flags.
    fn overrides(&self) -> Settings {
        Settings {
            profile: self.release.then_some(BuildProfile::Release),
            notify: self.no_notify.then_some(false),
            ..Settings::default()
        }
    }
}

fn describe(config: &BuildConfig) {
    output::verbose_detail(&format!("os: {}", config.os));
    output::verbose_detail(&format!("source: {}", config.source_dir.display()));
    output::verbose_detail(&format!("output: {}", config.build_output_dir.display()));
    output::verbose_detail(&format!("deploy: {}", config.deploy_dir.display()));
    output::verbose_detail(&format!(
        "artifact: *{}{}",
        config.artifact_extension,
        config
            .library
            .as_deref()
            .map(|l| format!(" ({})", config.platform().library_file_name(l)))
            .unwrap_or_default()
    ));
    output::verbose_detail(&format!(
        "copy: {:?} ({} {})",
        config.copy_strategy, config.copy_command, config.overwrite_flag
    ));
}

fn run(cli: &Cli) -> Result<RunReport> {
    let config = config::resolve_config(
        cli.project_dir.as_deref(),
        cli.config.as_deref(),
        cli.overrides(),
    )
    .context("could not resolve configuration")?;
    describe(&config);

    let desktop = DesktopNotifier::new(config.os);
    let notifier: Option<&dyn Notifier> = if config.notify { Some(&desktop) } else { None };

    Ok(runner::run(&config, notifier)?)
}

fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<DeployError>() {
        Some(e) => {
            output::fail("Failed", &format!("[{}] {e}", e.stage()));
            if let Some(stderr) = e.captured_stderr() {
                output::stderr_block("toolchain stderr:", stderr);
            }
        }
        None => output::fail("Failed", &format!("{err:#}")),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            output::success("Deployed", &report.artifact);
            output::detail(&format!("from: {}", report.source.display()));
            output::detail(&format!("  to: {}", report.destination.display()));
        }
        Err(e) => {
            report_failure(&e);
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

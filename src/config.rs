//! Build configuration resolution.
//!
//! A [`BuildConfig`] is resolved exactly once, before anything is spawned,
//! from the host OS family, the project directory and a layered set of
//! optional [`Settings`]:
//!
//! 1. CLI flags (highest)
//! 2. `AUTODEPLOY_*` environment variables
//! 3. `autodeploy.toml` in the project directory (or `--config <file>`)
//! 4. Built-in defaults: `<project>/rust` is built, `<project>/godot` receives
//!    the library.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::platform::{OsFamily, PlatformProfile};

/// Settings file looked up in the project directory.
pub const SETTINGS_FILE_NAME: &str = "autodeploy.toml";

const PROFILE_ENV_VAR: &str = "AUTODEPLOY_PROFILE";
const DEPLOY_DIR_ENV_VAR: &str = "AUTODEPLOY_DEPLOY_DIR";
const NOTIFY_ENV_VAR: &str = "AUTODEPLOY_NOTIFY";

const DEFAULT_SOURCE_DIR: &str = "rust";
const DEFAULT_DEPLOY_DIR: &str = "godot";
const DEFAULT_BUILD_COMMAND: [&str; 2] = ["cargo", "build"];

/// Cargo build profile; selects `target/debug` or `target/release`.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[default]
    Debug,
    Release,
}

impl BuildProfile {
    pub fn dir_name(self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "debug" | "dev" => Ok(BuildProfile::Debug),
            "release" => Ok(BuildProfile::Release),
            other => bail!("unknown build profile '{other}', expected 'debug' or 'release'"),
        }
    }
}

/// How the artifact is placed into the deploy directory.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CopyStrategy {
    /// Write a temp file next to the destination, then rename over it.
    #[default]
    Atomic,
    /// Run the platform copy command with its overwrite switch.
    Shell,
}

/// Optional overrides for [`BuildConfig`] resolution.
///
/// Every layer (file, environment, CLI) produces one of these; later layers
/// win field by field via [`Settings::merge`].
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Native source project, relative to the project directory or absolute.
    pub source_dir: Option<String>,
    /// Godot project directory that receives the library.
    pub deploy_dir: Option<String>,
    pub profile: Option<BuildProfile>,
    /// Crate name of the `cdylib`; restricts discovery to that one library.
    pub library: Option<String>,
    /// Full build command line as argv, replacing `cargo build`.
    pub build_command: Option<Vec<String>>,
    pub copy_strategy: Option<CopyStrategy>,
    pub notify: Option<bool>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    ///
    /// Read errors other than not-found and parse errors are hard failures.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse settings file at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to read settings file at {}", path.display())),
        }
    }

    /// Load an explicitly requested settings file, which must exist.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("settings file {} does not exist", path.display());
        }
        Self::load_from(path)
    }

    /// Read the `AUTODEPLOY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Internal reader that takes the variable lookup as a parameter for testability.
    fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let profile = non_empty_trimmed(lookup(PROFILE_ENV_VAR))
            .map(|v| BuildProfile::parse(&v))
            .transpose()
            .with_context(|| format!("invalid {PROFILE_ENV_VAR}"))?;
        let notify = non_empty_trimmed(lookup(NOTIFY_ENV_VAR))
            .map(|v| parse_bool(&v))
            .transpose()
            .with_context(|| format!("invalid {NOTIFY_ENV_VAR}"))?;

        Ok(Self {
            deploy_dir: non_empty_trimmed(lookup(DEPLOY_DIR_ENV_VAR)),
            profile,
            notify,
            ..Self::default()
        })
    }

    /// Overlay `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            source_dir: overrides.source_dir.or(self.source_dir),
            deploy_dir: overrides.deploy_dir.or(self.deploy_dir),
            profile: overrides.profile.or(self.profile),
            library: overrides.library.or(self.library),
            build_command: overrides.build_command.or(self.build_command),
            copy_strategy: overrides.copy_strategy.or(self.copy_strategy),
            notify: overrides.notify.or(self.notify),
        }
    }
}

/// Fully resolved, immutable description of one build-and-deploy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub os: OsFamily,
    /// Directory the run was started from; relative settings resolve against it.
    pub project_dir: PathBuf,
    /// Native source project the build runs in.
    pub source_dir: PathBuf,
    /// Where cargo leaves the built library.
    pub build_output_dir: PathBuf,
    /// Engine project directory the library is copied into.
    pub deploy_dir: PathBuf,
    pub artifact_extension: String,
    pub copy_command: String,
    pub overwrite_flag: String,
    pub profile: BuildProfile,
    /// Build argv; the first element is the program.
    pub build_command: Vec<String>,
    pub library: Option<String>,
    pub copy_strategy: CopyStrategy,
    pub notify: bool,
}

impl BuildConfig {
    pub fn platform(&self) -> &'static PlatformProfile {
        self.os.profile()
    }

    /// The build command as a single display string.
    pub fn build_command_line(&self) -> String {
        self.build_command.join(" ")
    }
}

/// Resolve the configuration for this host.
///
/// `project_dir` defaults to the current working directory; a relative value
/// is taken relative to it. `config_file`, when given, must exist; otherwise
/// `autodeploy.toml` in the project directory is read if present.
pub fn resolve_config(
    project_dir: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Settings,
) -> Result<BuildConfig> {
    let cwd = std::env::current_dir().context("failed to read the current working directory")?;
    let project_dir = match project_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let file_settings = match config_file {
        Some(path) => Settings::load_required(path)?,
        None => Settings::load_from(&project_dir.join(SETTINGS_FILE_NAME))?,
    };
    let settings = file_settings.merge(Settings::from_env()?).merge(overrides);

    Ok(resolve_for(OsFamily::host(), &project_dir, &settings))
}

/// Pure resolution for a given OS family and project directory.
pub fn resolve_for(os: OsFamily, project_dir: &Path, settings: &Settings) -> BuildConfig {
    let platform = os.profile();
    let source_dir = resolve_dir(
        os,
        project_dir,
        settings.source_dir.as_deref().unwrap_or(DEFAULT_SOURCE_DIR),
    );
    let deploy_dir = resolve_dir(
        os,
        project_dir,
        settings.deploy_dir.as_deref().unwrap_or(DEFAULT_DEPLOY_DIR),
    );
    let profile = settings.profile.unwrap_or_default();
    let build_output_dir = platform.join(&source_dir, &["target", profile.dir_name()]);

    let build_command = match &settings.build_command {
        Some(custom) if !custom.is_empty() => custom.clone(),
        _ => default_build_command(profile),
    };

    BuildConfig {
        os,
        project_dir: project_dir.to_path_buf(),
        source_dir,
        build_output_dir,
        deploy_dir,
        artifact_extension: platform.artifact_extension.to_string(),
        copy_command: platform.copy_command.to_string(),
        overwrite_flag: platform.overwrite_flag.to_string(),
        profile,
        build_command,
        library: non_empty_trimmed(settings.library.clone()),
        copy_strategy: settings.copy_strategy.unwrap_or_default(),
        notify: settings.notify.unwrap_or(true),
    }
}

fn default_build_command(profile: BuildProfile) -> Vec<String> {
    let mut command: Vec<String> = DEFAULT_BUILD_COMMAND.iter().map(|s| s.to_string()).collect();
    if profile == BuildProfile::Release {
        command.push("--release".to_string());
    }
    command
}

/// Join `value` onto `project_dir` unless it is already absolute for `os`.
fn resolve_dir(os: OsFamily, project_dir: &Path, value: &str) -> PathBuf {
    let platform = os.profile();
    if is_absolute_for(os, value) {
        platform.join(Path::new(value), &[])
    } else {
        platform.join(project_dir, &[value])
    }
}

fn is_absolute_for(os: OsFamily, value: &str) -> bool {
    match os {
        OsFamily::Windows => {
            let bytes = value.as_bytes();
            value.starts_with('\\')
                || value.starts_with('/')
                || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
        }
        OsFamily::MacOs | OsFamily::Linux => value.starts_with('/'),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

/// Return the trimmed value if non-empty after trimming, otherwise `None`.
fn non_empty_trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Host config rooted at `project_dir` with a custom build command, for tests.
#[cfg(test)]
pub(crate) fn sandbox_config(project_dir: &Path, build_command: &[&str]) -> BuildConfig {
    let settings = Settings {
        build_command: Some(build_command.iter().map(|s| s.to_string()).collect()),
        notify: Some(false),
        ..Settings::default()
    };
    resolve_for(OsFamily::host(), project_dir, &settings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

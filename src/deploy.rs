//! Copying the built library into the engine project.
//!
//! The default strategy never exposes a half-written library to the engine:
//! bytes go to a temporary file inside the deploy directory, which is then
//! renamed over the destination in one step.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{BuildConfig, CopyStrategy};
use crate::error::DeployError;

/// Copy `artifact_name` from the build output directory into the deploy
/// directory, replacing any existing file. Returns the destination path.
pub fn deploy_artifact(config: &BuildConfig, artifact_name: &str) -> Result<PathBuf, DeployError> {
    if !config.deploy_dir.is_dir() {
        return Err(DeployError::DeployTargetMissing {
            path: config.deploy_dir.clone(),
        });
    }

    let source = config.build_output_dir.join(artifact_name);
    let destination = config.deploy_dir.join(artifact_name);

    let result = match config.copy_strategy {
        CopyStrategy::Atomic => atomic_copy(&source, &destination, &config.deploy_dir)
            .map_err(|e| e.to_string()),
        CopyStrategy::Shell => shell_copy(config, &source, &destination),
    };

    result.map_err(|reason| DeployError::DeployFailed {
        source_path: source.clone(),
        destination: destination.clone(),
        reason,
    })?;
    Ok(destination)
}

/// Stream `source` into a temp file in `dir`, then rename it to `destination`.
fn atomic_copy(source: &Path, destination: &Path, dir: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let permissions = input.metadata()?.permissions();

    let mut staged = tempfile::Builder::new()
        .prefix(".autodeploy-")
        .suffix(".part")
        .tempfile_in(dir)?;
    io::copy(&mut input, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    fs::set_permissions(staged.path(), permissions)?;

    // On error the NamedTempFile inside PersistError is dropped, which
    // deletes the staged file.
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

/// Run the platform copy command with its silent-overwrite switch.
fn shell_copy(config: &BuildConfig, source: &Path, destination: &Path) -> Result<(), String> {
    let argv = config.platform().copy_argv(source, destination);
    let Some((program, args)) = argv.split_first() else {
        return Err("copy command is empty".to_string());
    };

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("could not run {}: {e}", argv.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // `copy` reports on stdout, `cp` on stderr.
        let text = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(format!("{} failed ({}): {text}", argv.join(" "), output.status));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sandbox_config;
    use tempfile::TempDir;

    const LIB: &str = "libgallaecia.so";

    /// Project with a built library and an existing deploy directory.
    fn staged_project(content: &[u8]) -> (TempDir, BuildConfig) {
        let dir = TempDir::new().unwrap();
        let cfg = sandbox_config(dir.path(), &["true"]);
        fs::create_dir_all(&cfg.build_output_dir).unwrap();
        fs::create_dir_all(&cfg.deploy_dir).unwrap();
        fs::write(cfg.build_output_dir.join(LIB), content).unwrap();
        (dir, cfg)
    }

    fn deploy_dir_entries(cfg: &BuildConfig) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&cfg.deploy_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn copies_into_deploy_dir() {
        let (_dir, cfg) = staged_project(b"\x7fELF fresh build");

        let dest = deploy_artifact(&cfg, LIB).unwrap();
        assert_eq!(dest, cfg.deploy_dir.join(LIB));
        assert_eq!(fs::read(&dest).unwrap(), b"\x7fELF fresh build");
        assert_eq!(deploy_dir_entries(&cfg), vec![LIB.to_string()]);
    }

    #[test]
    fn overwrites_existing_destination() {
        let (_dir, cfg) = staged_project(b"new");
        fs::write(cfg.deploy_dir.join(LIB), b"old library, much longer than new").unwrap();

        let dest = deploy_artifact(&cfg, LIB).unwrap();
        assert_eq!(fs::read(dest).unwrap(), b"new");
        assert_eq!(deploy_dir_entries(&cfg), vec![LIB.to_string()]);
    }

    #[test]
    fn missing_deploy_dir() {
        let (_dir, cfg) = staged_project(b"x");
        fs::remove_dir(&cfg.deploy_dir).unwrap();

        match deploy_artifact(&cfg, LIB) {
            Err(DeployError::DeployTargetMissing { path }) => assert_eq!(path, cfg.deploy_dir),
            other => panic!("expected DeployTargetMissing, got {other:?}"),
        }
    }

    #[test]
    fn missing_source_fails_without_touching_destination() {
        let (_dir, cfg) = staged_project(b"x");
        fs::write(cfg.deploy_dir.join("other.so"), b"keep me").unwrap();
        fs::write(cfg.deploy_dir.join("gone.so"), b"previous").unwrap();

        match deploy_artifact(&cfg, "gone.so") {
            Err(DeployError::DeployFailed { reason, .. }) => assert!(!reason.is_empty()),
            other => panic!("expected DeployFailed, got {other:?}"),
        }
        assert_eq!(fs::read(cfg.deploy_dir.join("gone.so")).unwrap(), b"previous");
        assert_eq!(
            deploy_dir_entries(&cfg),
            vec!["gone.so".to_string(), "other.so".to_string()]
        );
    }

    #[cfg(unix)]
    #[test]
    fn preserves_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, cfg) = staged_project(b"x");
        let source = cfg.build_output_dir.join(LIB);
        fs::set_permissions(&source, fs::Permissions::from_mode(0o755)).unwrap();

        let dest = deploy_artifact(&cfg, LIB).unwrap();
        let mode = fs::metadata(dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn shell_strategy_overwrites() {
        let (_dir, mut cfg) = staged_project(b"from cp");
        cfg.copy_strategy = CopyStrategy::Shell;
        fs::write(cfg.deploy_dir.join(LIB), b"stale").unwrap();

        let dest = deploy_artifact(&cfg, LIB).unwrap();
        assert_eq!(fs::read(dest).unwrap(), b"from cp");
    }

    #[cfg(unix)]
    #[test]
    fn shell_strategy_reports_copy_error() {
        let (_dir, mut cfg) = staged_project(b"x");
        cfg.copy_strategy = CopyStrategy::Shell;

        match deploy_artifact(&cfg, "missing.so") {
            Err(DeployError::DeployFailed { reason, .. }) => {
                assert!(reason.starts_with("cp -f"), "{reason}");
            }
            other => panic!("expected DeployFailed, got {other:?}"),
        }
    }
}

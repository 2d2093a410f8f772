//! Locating the freshly built library in the build output directory.
//!
//! Directory listing order is file-system dependent, so the newest matching
//! file wins, with equal modification times broken by file name.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::config::BuildConfig;
use crate::error::DeployError;

/// A library file that matched the extension filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub file_name: String,
    pub modified: SystemTime,
}

/// List the regular files in `dir` whose names end in `extension`.
///
/// When `exact_name` is set only that file name qualifies. Entries whose
/// metadata cannot be read are skipped.
pub fn list_candidates(
    dir: &Path,
    extension: &str,
    exact_name: Option<&str>,
) -> io::Result<Vec<ArtifactCandidate>> {
    let mut candidates = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if !file_name.ends_with(extension) || file_name.len() == extension.len() {
            continue;
        }
        if exact_name.is_some_and(|wanted| wanted != file_name) {
            continue;
        }

        // fs::metadata follows symlinks, so a link to a library still counts.
        let metadata = match fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(_) => continue,
        };

        candidates.push(ArtifactCandidate {
            file_name,
            modified,
        });
    }

    Ok(candidates)
}

/// Pick the most recently modified candidate.
pub fn select_newest(candidates: Vec<ArtifactCandidate>) -> Option<ArtifactCandidate> {
    candidates
        .into_iter()
        .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.file_name.cmp(&b.file_name)))
}

/// Find the library the last build produced and return its file name.
pub fn discover_artifact(config: &BuildConfig) -> Result<String, DeployError> {
    let dir = &config.build_output_dir;
    let exact_name = config
        .library
        .as_deref()
        .map(|stem| config.platform().library_file_name(stem));

    // Only an absent directory earns the rebuild; anything else keeps the OS error.
    let candidates = list_candidates(dir, &config.artifact_extension, exact_name.as_deref())
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DeployError::ArtifactDirectoryMissing { path: dir.clone() },
            _ => DeployError::ArtifactDirectoryUnreadable {
                path: dir.clone(),
                reason: e.to_string(),
            },
        })?;

    select_newest(candidates)
        .map(|c| c.file_name)
        .ok_or_else(|| DeployError::ArtifactNotFound {
            dir: dir.clone(),
            pattern: exact_name.unwrap_or_else(|| config.artifact_extension.clone()),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sandbox_config;
    use tempfile::TempDir;

    /// Set a file's modification time to a specific Unix epoch timestamp.
    fn set_mtime(path: &Path, epoch_secs: i64) {
        let ft = filetime::FileTime::from_unix_time(epoch_secs, 0);
        filetime::set_file_mtime(path, ft).expect("failed to set file mtime");
    }

    /// Project whose build output directory exists; returns it with the config.
    fn built_project() -> (TempDir, BuildConfig) {
        let dir = TempDir::new().unwrap();
        let cfg = sandbox_config(dir.path(), &["true"]);
        fs::create_dir_all(&cfg.build_output_dir).unwrap();
        (dir, cfg)
    }

    fn touch(cfg: &BuildConfig, name: &str, epoch_secs: i64) {
        let path = cfg.build_output_dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        set_mtime(&path, epoch_secs);
    }

    fn lib(cfg: &BuildConfig, stem: &str) -> String {
        format!("{stem}{}", cfg.artifact_extension)
    }

    #[test]
    fn newest_matching_file_wins() {
        let (_dir, cfg) = built_project();
        let older = lib(&cfg, "a");
        let newer = lib(&cfg, "b");
        touch(&cfg, &older, 1_700_000_000);
        touch(&cfg, &newer, 1_700_000_100);
        touch(&cfg, "c.txt", 1_700_000_200);

        assert_eq!(discover_artifact(&cfg).unwrap(), newer);
    }

    #[test]
    fn listing_order_does_not_matter() {
        let (_dir, cfg) = built_project();
        let newer = lib(&cfg, "a");
        touch(&cfg, &lib(&cfg, "z"), 1_600_000_000);
        touch(&cfg, &newer, 1_700_000_000);
        touch(&cfg, &lib(&cfg, "m"), 1_650_000_000);

        assert_eq!(discover_artifact(&cfg).unwrap(), newer);
    }

    #[test]
    fn equal_mtimes_break_ties_by_name() {
        let (_dir, cfg) = built_project();
        touch(&cfg, &lib(&cfg, "alpha"), 1_700_000_000);
        touch(&cfg, &lib(&cfg, "beta"), 1_700_000_000);

        assert_eq!(discover_artifact(&cfg).unwrap(), lib(&cfg, "beta"));
    }

    #[test]
    fn directories_and_bare_extension_are_ignored() {
        let (_dir, cfg) = built_project();
        fs::create_dir(cfg.build_output_dir.join(lib(&cfg, "folder"))).unwrap();
        touch(&cfg, &cfg.artifact_extension.clone(), 1_800_000_000);
        touch(&cfg, &lib(&cfg, "real"), 1_700_000_000);

        assert_eq!(discover_artifact(&cfg).unwrap(), lib(&cfg, "real"));
    }

    #[test]
    fn extension_must_be_a_suffix() {
        let (_dir, cfg) = built_project();
        touch(&cfg, &format!("game{}.d", cfg.artifact_extension), 1_700_000_000);

        assert!(matches!(
            discover_artifact(&cfg),
            Err(DeployError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn missing_directory_is_recoverable_error() {
        let dir = TempDir::new().unwrap();
        let cfg = sandbox_config(dir.path(), &["true"]);

        match discover_artifact(&cfg) {
            Err(DeployError::ArtifactDirectoryMissing { path }) => {
                assert_eq!(path, cfg.build_output_dir);
            }
            other => panic!("expected ArtifactDirectoryMissing, got {other:?}"),
        }
    }

    #[test]
    fn file_in_place_of_output_dir_is_unreadable_not_missing() {
        let dir = TempDir::new().unwrap();
        let cfg = sandbox_config(dir.path(), &["true"]);
        fs::create_dir_all(cfg.build_output_dir.parent().unwrap()).unwrap();
        fs::write(&cfg.build_output_dir, b"not a directory").unwrap();

        let expected = fs::read_dir(&cfg.build_output_dir).unwrap_err().to_string();
        match discover_artifact(&cfg) {
            Err(DeployError::ArtifactDirectoryUnreadable { path, reason }) => {
                assert_eq!(path, cfg.build_output_dir);
                assert_eq!(reason, expected);
            }
            other => panic!("expected ArtifactDirectoryUnreadable, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_is_not_found() {
        let (_dir, cfg) = built_project();
        touch(&cfg, "build.log", 1_700_000_000);

        match discover_artifact(&cfg) {
            Err(DeployError::ArtifactNotFound { pattern, .. }) => {
                assert_eq!(pattern, cfg.artifact_extension);
            }
            other => panic!("expected ArtifactNotFound, got {other:?}"),
        }
    }

    #[test]
    fn library_setting_restricts_to_one_file() {
        let (_dir, mut cfg) = built_project();
        cfg.library = Some("pokemon_gallaecia".to_string());
        let wanted = cfg.platform().library_file_name("pokemon_gallaecia");
        touch(&cfg, &wanted, 1_700_000_000);
        touch(&cfg, &cfg.platform().library_file_name("helper"), 1_800_000_000);

        assert_eq!(discover_artifact(&cfg).unwrap(), wanted);
    }

    #[test]
    fn library_setting_without_match_names_the_file() {
        let (_dir, mut cfg) = built_project();
        cfg.library = Some("pokemon_gallaecia".to_string());
        touch(&cfg, &cfg.platform().library_file_name("helper"), 1_800_000_000);

        match discover_artifact(&cfg) {
            Err(DeployError::ArtifactNotFound { pattern, .. }) => {
                assert_eq!(pattern, cfg.platform().library_file_name("pokemon_gallaecia"));
            }
            other => panic!("expected ArtifactNotFound, got {other:?}"),
        }
    }

    #[test]
    fn select_newest_of_nothing_is_none() {
        assert_eq!(select_newest(Vec::new()), None);
    }
}

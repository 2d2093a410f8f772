//! Operating-system capability table.
//!
//! Every OS-dependent decision the runner makes (path separator, dynamic
//! library naming, copy command and its silent-overwrite switch) is looked up
//! from a single [`PlatformProfile`] keyed by [`OsFamily`].

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// The compile-time target triple emitted by build.rs.
const TARGET: &str = env!("TARGET");

/// Operating-system families the runner knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    MacOs,
    /// Linux and every other Unix-like host.
    Linux,
}

/// Static capabilities of one [`OsFamily`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub family: OsFamily,
    /// Directory separator used when building paths.
    pub separator: char,
    /// File name prefix cargo puts on `cdylib` outputs.
    pub library_prefix: &'static str,
    /// Suffix of a dynamically linked library, including the dot.
    pub artifact_extension: &'static str,
    /// Shell command that copies a file.
    pub copy_command: &'static str,
    /// Switch that makes `copy_command` overwrite without prompting.
    pub overwrite_flag: &'static str,
    /// Program and arguments needed to reach `copy_command` when it is a
    /// shell builtin rather than an executable.
    pub shell_prefix: &'static [&'static str],
}

const WINDOWS: PlatformProfile = PlatformProfile {
    family: OsFamily::Windows,
    separator: '\\',
    library_prefix: "",
    artifact_extension: ".dll",
    copy_command: "copy",
    overwrite_flag: "/Y",
    shell_prefix: &["cmd", "/C"],
};

const MACOS: PlatformProfile = PlatformProfile {
    family: OsFamily::MacOs,
    separator: '/',
    library_prefix: "lib",
    artifact_extension: ".dylib",
    copy_command: "cp",
    overwrite_flag: "-f",
    shell_prefix: &[],
};

const LINUX: PlatformProfile = PlatformProfile {
    family: OsFamily::Linux,
    separator: '/',
    library_prefix: "lib",
    artifact_extension: ".so",
    copy_command: "cp",
    overwrite_flag: "-f",
    shell_prefix: &[],
};

impl OsFamily {
    pub const ALL: [OsFamily; 3] = [OsFamily::Windows, OsFamily::MacOs, OsFamily::Linux];

    /// The family of the host this binary was compiled for.
    pub fn host() -> Self {
        Self::from_target_triple(TARGET)
    }

    /// Map a target triple (e.g. `x86_64-pc-windows-msvc`) to its family.
    ///
    /// Anything that is neither Windows nor an Apple desktop target follows
    /// Linux conventions.
    pub fn from_target_triple(triple: &str) -> Self {
        let mut segments = triple.split('-');
        if segments.clone().any(|s| s == "windows") {
            OsFamily::Windows
        } else if segments.any(|s| s == "darwin" || s == "macos") {
            OsFamily::MacOs
        } else {
            OsFamily::Linux
        }
    }

    pub fn profile(self) -> &'static PlatformProfile {
        match self {
            OsFamily::Windows => &WINDOWS,
            OsFamily::MacOs => &MACOS,
            OsFamily::Linux => &LINUX,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsFamily::Windows => "windows",
            OsFamily::MacOs => "macos",
            OsFamily::Linux => "linux",
        };
        f.write_str(name)
    }
}

impl PlatformProfile {
    /// Join `segments` onto `base` using this platform's separator.
    ///
    /// `base` is kept byte for byte, so non-UTF-8 directory names and drive
    /// roots such as `D:\` survive. Segments may themselves contain `/` or
    /// `\`; they are split and re-joined with this platform's separator.
    pub fn join(&self, base: &Path, segments: &[&str]) -> PathBuf {
        let mut buf = [0; 4];
        let separator: &str = self.separator.encode_utf8(&mut buf);

        let mut joined = base.as_os_str().to_os_string();
        for part in segments
            .iter()
            .flat_map(|s| s.split(['/', '\\']))
            .filter(|p| !p.is_empty())
        {
            if !ends_with_separator(&joined) {
                joined.push(separator);
            }
            joined.push(part);
        }
        if joined.is_empty() {
            joined.push(separator);
        }
        PathBuf::from(joined)
    }

    /// Argv that copies `source` over `destination` with forced overwrite.
    pub fn copy_argv(&self, source: &Path, destination: &Path) -> Vec<String> {
        let mut argv: Vec<String> = self.shell_prefix.iter().map(|s| s.to_string()).collect();
        argv.push(self.copy_command.to_string());
        argv.push(self.overwrite_flag.to_string());
        argv.push(source.to_string_lossy().into_owned());
        argv.push(destination.to_string_lossy().into_owned());
        argv
    }

    /// The file name cargo produces for a `cdylib` crate called `stem`.
    pub fn library_file_name(&self, stem: &str) -> String {
        format!("{}{stem}{}", self.library_prefix, self.artifact_extension)
    }
}

fn ends_with_separator(path: &OsStr) -> bool {
    matches!(path.as_encoded_bytes().last(), Some(b'/' | b'\\'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Helpers shared by every external tool invocation: exit status reporting,
//! command-line rendering for the logs and scratch file cleanup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::{debug, warn};

/// How an external process ended when it did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStatus {
    Code(i32),
    Signal(i32),
}

impl ToolStatus {
    /// `None` for a successful exit
    pub fn from_exit(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        if let Some(code) = status.code() {
            return Some(ToolStatus::Code(code));
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Some(ToolStatus::Signal(signal));
            }
        }
        Some(ToolStatus::Code(-1))
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolStatus::Code(code) => write!(f, "exit code {}", code),
            ToolStatus::Signal(signal) => write!(f, "killed by signal {}", signal),
        }
    }
}

/// Fully expanded command line, as logged before launch
pub fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    std::iter::once(std_cmd.get_program())
        .chain(std_cmd.get_args())
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append a suffix to a path without touching its extension
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Remove a single-use file. Files that were never produced are ignored.
pub fn remove_scratch(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed scratch file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove scratch file {}: {}", path.display(), e),
    }
}

/// [`remove_scratch`] for async callers; the blocking variant stays for `Drop`
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed scratch file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove scratch file {}: {}", path.display(), e),
    }
}

/// Remove every file whose path starts with `prefix` (a directory plus a file name prefix).
/// Returns the number of files removed.
pub fn remove_with_prefix(prefix: &Path) -> usize {
    let name_prefix = match prefix.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return 0,
    };
    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {} for scratch cleanup: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = entry
            .file_name()
            .to_string_lossy()
            .starts_with(name_prefix.as_str());
        if matches && path.is_file() {
            remove_scratch(&path);
            removed += 1;
        }
    }
    removed
}

/// Removes its registered paths and path prefixes when dropped, so scratch
/// data does not outlive the stage that consumes it, whatever way the stage ends.
#[derive(Debug, Default)]
pub struct ScratchGuard {
    paths: Vec<PathBuf>,
    prefixes: Vec<PathBuf>,
}

impl ScratchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let mut guard = Self::new();
        guard.push(path);
        guard
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Every file starting with `prefix` is removed, see [`remove_with_prefix`]
    pub fn push_prefix(&mut self, prefix: impl Into<PathBuf>) {
        self.prefixes.push(prefix.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_scratch(&path);
        }
        for prefix in self.prefixes.drain(..) {
            let removed = remove_with_prefix(&prefix);
            if removed > 0 {
                debug!("Removed {} scratch files under {}", removed, prefix.display());
            }
        }
    }
}

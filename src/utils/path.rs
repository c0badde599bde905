//! Path and MIME helpers for file-backed messages
//!
//! Message paths are stored relative to the working directory so transcripts
//! stay portable when a project directory moves.

use std::env;
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;
use pathdiff::diff_paths;

/// Normalize a user-supplied path into a path relative to the current
/// working directory.
///
/// `~` is expanded, symlinks are resolved when the target exists, and `.` /
/// `..` segments are collapsed. If the working directory cannot be read the
/// input is returned unchanged.
pub fn normalize_path(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let Ok(cwd) = env::current_dir() else {
        return path.to_string_lossy().into_owned();
    };
    let cwd = cwd.canonicalize().unwrap_or(cwd);

    let expanded = expand_home(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };
    let resolved = absolute
        .canonicalize()
        .unwrap_or_else(|_| lexically_normalize(&absolute));

    match diff_paths(&resolved, &cwd) {
        Some(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Some(relative) => relative.to_string_lossy().into_owned(),
        None => resolved.to_string_lossy().into_owned(),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

/// Collapse `.` and `..` components of an absolute path without touching
/// the filesystem.
pub fn lexically_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized = PathBuf::from(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Guess a MIME type from a file extension.
pub fn mime_type(path: impl AsRef<Path>) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}

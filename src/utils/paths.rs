//! Path utilities for the architect CLI

use std::path::{Path, PathBuf};

use crate::config::CONFIG_FILE_NAMES;
use crate::error::ArchitectError;

/// Find the first of `names` in `start` or any of its ancestors
///
/// Within one directory, names are tried in the order given.
pub fn find_up(names: &[&str], start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => return None,
        }
    }
}

/// Find the workspace file governing `start`
pub fn find_workspace_file(start: &Path) -> Result<PathBuf, ArchitectError> {
    find_up(&CONFIG_FILE_NAMES, start).ok_or_else(|| ArchitectError::WorkspaceNotFound {
        searched: start.to_path_buf(),
        names: CONFIG_FILE_NAMES.join(", "),
    })
}

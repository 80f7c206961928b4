//! Directory discovery for `setman.toml` and for relative settings files.
//!
//! Each [`SearchPath`] is expanded into one or more concrete directories, in
//! ascending priority. `Ancestors` walks from the current directory toward
//! the root and is emitted shallowest first, so the directory closest to the
//! working directory has the highest priority.
//!
//! Lookups always go from the highest-priority end. Missing files are
//! skipped; any other I/O error is returned.

use std::path::{Path, PathBuf};

use crate::error::SetmanError;
use crate::types::{Boundary, SearchPath};

/// Expand one search path. `app_name` names the platform config directory.
pub fn expand_search_path(sp: &SearchPath, app_name: &str) -> Vec<PathBuf> {
    match sp {
        SearchPath::Platform => directories::ProjectDirs::from("", "", app_name)
            .map(|proj| proj.config_dir().to_path_buf())
            .into_iter()
            .collect(),
        SearchPath::Home(subdir) => directories::UserDirs::new()
            .map(|user| user.home_dir().join(subdir))
            .into_iter()
            .collect(),
        SearchPath::Cwd => std::env::current_dir().ok().into_iter().collect(),
        SearchPath::Ancestors(boundary) => match std::env::current_dir() {
            Ok(cwd) => expand_ancestors_from(cwd, boundary),
            Err(_) => Vec::new(),
        },
        SearchPath::Path(p) => vec![p.clone()],
    }
}

/// Walk from `start` toward the root, stopping at `boundary`. Shallowest
/// directory first.
pub fn expand_ancestors_from(start: PathBuf, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start.as_path();

    loop {
        dirs.push(current.to_path_buf());

        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    dirs.reverse();
    dirs
}

/// Expand all search paths into a flat list of directories (priority-ascending).
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .flat_map(|sp| expand_search_path(sp, app_name))
        .collect()
}

/// The highest-priority `{dir}/{file_name}` that exists, with its content.
pub fn load_first_match(
    dirs: &[PathBuf],
    file_name: &str,
) -> Result<Option<(PathBuf, String)>, SetmanError> {
    for dir in dirs.iter().rev() {
        let file_path = dir.join(file_name);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => return Ok(Some((file_path, content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(SetmanError::io(file_path, e)),
        }
    }
    Ok(None)
}

/// Make a settings file path absolute. Relative paths resolve against the
/// highest-priority directory that holds them, falling back to the
/// highest-priority directory, then to the working directory.
pub fn resolve_relative(path: &Path, dirs: &[PathBuf]) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    if let Some(found) = dirs
        .iter()
        .rev()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
    {
        return found;
    }
    match dirs.last() {
        Some(dir) => dir.join(path),
        None => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

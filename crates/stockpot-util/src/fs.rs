//! Filesystem and path utilities for stockpot.

use std::path::{Component, Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest`, preferring a hard link.
///
/// Falls back to a regular copy if hard linking fails (e.g. cross-device).
///
/// # Errors
/// Returns an error if both hard linking and copying fail.
pub fn materialize(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    // hard_link refuses to overwrite.
    if dest.exists() {
        std::fs::remove_file(dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    if std::fs::hard_link(src, dest).is_err() {
        std::fs::copy(src, dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    Ok(())
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where one exists.
///
/// The filesystem is not consulted, so symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last().copied() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Express `path` relative to `base`, lexically.
///
/// Both paths are normalized first. If one is absolute and the other is not
/// there is no meaningful relation and the normalized `path` is returned.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    if path.has_root() != base.has_root() {
        return path;
    }

    let path_parts: Vec<Component<'_>> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let base_parts: Vec<Component<'_>> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in path_parts.iter().skip(common) {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    }
}

/// Collect every file under `start` whose file name matches the glob
/// `pattern` (e.g. `"*.cpp"`), recursively, sorted by path.
///
/// Directories listed in `exclude_dirs` are not descended into. A missing
/// `start` directory yields an empty list.
///
/// # Errors
/// Returns an error if the pattern is invalid or a directory cannot be read.
pub fn recursive_glob(
    pattern: &str,
    start: &Path,
    exclude_dirs: &[PathBuf],
) -> Result<Vec<PathBuf>, UtilError> {
    let matcher = glob::Pattern::new(pattern).map_err(|e| UtilError::GlobPattern {
        pattern: pattern.to_owned(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    if start.is_dir() {
        let excluded: Vec<PathBuf> = exclude_dirs.iter().map(|d| normalize(d)).collect();
        glob_recursive(start, &matcher, &excluded, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn glob_recursive(
    dir: &Path,
    matcher: &glob::Pattern,
    excluded: &[PathBuf],
    out: &mut Vec<PathBuf>,
) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            if !excluded.contains(&normalize(&path)) {
                glob_recursive(&path, matcher, excluded, out)?;
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| matcher.matches(n))
        {
            out.push(path);
        }
    }

    Ok(())
}

//! Resolved dependency locations and the resolver seam.
//!
//! Fetching from version control or archives lives behind
//! [`LocationResolver`]. [`DirectoryResolver`] handles plain local
//! directories, including the branch-root layout where each branch of a
//! dependency is checked out into its own sub-directory.

use std::fmt;
use std::path::{Path, PathBuf};

use stockpot_util::fs::normalize;

/// The `(location, branch)` pair a dependency resolves from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationId {
    /// Location string with `~` already expanded.
    pub location: String,
    pub branch: Option<String>,
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}@{branch}", self.location),
            None => f.write_str(&self.location),
        }
    }
}

/// A dependency's source tree, resolved to a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    local: PathBuf,
    local_folder: String,
    version: String,
    repository: Option<String>,
    branch: Option<String>,
    revisions: Vec<String>,
}

impl Location {
    pub fn new(local: PathBuf, local_folder: &str, version: &str) -> Self {
        Self {
            local,
            local_folder: local_folder.to_owned(),
            version: version.to_owned(),
            repository: None,
            branch: None,
            revisions: Vec::new(),
        }
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_owned());
        self
    }

    pub fn with_branch(mut self, branch: Option<&str>) -> Self {
        self.branch = branch.map(str::to_owned);
        self
    }

    /// Root of the dependency's source tree on disk.
    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Folder name used to partition this dependency's build outputs.
    pub fn local_folder(&self) -> &str {
        &self.local_folder
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn revisions(&self) -> &[String] {
        &self.revisions
    }
}

/// Turns a [`LocationId`] into a [`Location`] on the local filesystem.
pub trait LocationResolver {
    /// Resolve `id`, descending into `extra_sub_path` when given.
    ///
    /// # Errors
    /// Returns an error if the location cannot be made available locally.
    fn resolve(
        &self,
        id: &LocationId,
        extra_sub_path: Option<&str>,
    ) -> Result<Location, LocationError>;
}

/// Resolves locations that are directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    base_dir: PathBuf,
}

impl DirectoryResolver {
    /// Relative locations are resolved against `base_dir`.
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }
}

impl LocationResolver for DirectoryResolver {
    fn resolve(
        &self,
        id: &LocationId,
        extra_sub_path: Option<&str>,
    ) -> Result<Location, LocationError> {
        if is_remote(&id.location) {
            return Err(LocationError::Unsupported {
                location: id.location.clone(),
                reason: "only local directories can be resolved".to_owned(),
            });
        }

        let root = normalize(&self.base_dir.join(&id.location));
        let mut folder = root
            .file_name()
            .map_or_else(|| "location".to_owned(), |n| n.to_string_lossy().into_owned());

        let mut local = root.clone();
        if let Some(branch) = &id.branch {
            let branch_dir = root.join(branch);
            if branch_dir.is_dir() {
                local = branch_dir;
                folder = format!("{folder}_{}", branch.replace(['/', '\\'], "_"));
            }
        }
        if let Some(sub_path) = extra_sub_path {
            local = local.join(sub_path);
        }
        let local = normalize(&local);

        if !local.exists() {
            return Err(LocationError::NotFound {
                path: local.display().to_string(),
            });
        }
        if !local.is_dir() {
            return Err(LocationError::NotADirectory {
                path: local.display().to_string(),
            });
        }

        let version = id.branch.clone().unwrap_or_else(|| folder.clone());
        Ok(Location::new(local, &folder, &version)
            .with_repository(&root.display().to_string())
            .with_branch(id.branch.as_deref()))
    }
}

fn is_remote(location: &str) -> bool {
    location.contains("://") || location.starts_with("git@")
}

/// Errors produced while resolving a location.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("location {path} does not exist")]
    NotFound { path: String },

    #[error("location {path} is not a directory")]
    NotADirectory { path: String },

    #[error("cannot resolve location {location}: {reason}")]
    Unsupported { location: String, reason: String },
}

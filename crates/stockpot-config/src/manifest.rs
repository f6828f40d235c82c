use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::linktype::LinkType;

/// The `stockpot.toml` project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub project: Project,
    /// Location dependencies keyed by name. The name is also the prefix of
    /// the dependency's command-line flags.
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub name: String,
    #[serde(default = "default_build_root")]
    pub build_root: PathBuf,
    /// Directory holding one sub-directory per branch of a dependency.
    #[serde(default)]
    pub branch_root: Option<PathBuf>,
    /// Fallback root for branch-qualified dependencies when `branch_root` is unset.
    #[serde(default)]
    pub thirdparty: Option<PathBuf>,
}

fn default_build_root() -> PathBuf {
    PathBuf::from(".build")
}

/// Defaults baked into a location dependency when it is declared.
///
/// `location`, `include`, `sys_include` and `extra_sub_path` yield to the
/// matching `--<name>-*` flag. A declared `source_path` or `linktype` takes
/// precedence over the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDefaults {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub sys_include: Option<String>,
    #[serde(default)]
    pub extra_sub_path: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub linktype: Option<LinkType>,
}

impl Manifest {
    /// Read and parse a `stockpot.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// declares a dependency whose name cannot be used as a flag prefix.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest content. `path` is only used for error messages.
    ///
    /// # Errors
    /// Returns an error if the content is invalid TOML or a dependency name is invalid.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        for name in manifest.dependencies.keys() {
            validate_dependency_name(name)?;
        }
        Ok(manifest)
    }

    /// Serialize the manifest to a TOML string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|e| ManifestError::Serialize { source: e })
    }
}

/// Check that `name` only contains characters that are valid in a long flag.
///
/// # Errors
/// Returns an error if the name is empty, starts with `-`, or contains
/// anything other than ASCII alphanumerics, `-` and `_`.
pub fn validate_dependency_name(name: &str) -> Result<(), ManifestError> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidDependencyName {
            name: name.to_owned(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid stockpot.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("cannot serialize stockpot.toml: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("invalid dependency name \"{name}\" — use letters, digits, '-' and '_' only")]
    InvalidDependencyName { name: String },
}

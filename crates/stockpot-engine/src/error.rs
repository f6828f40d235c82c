//! Error types for stockpot-engine.

use crate::location::LocationError;

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] stockpot_util::error::UtilError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] stockpot_config::manifest::ManifestError),

    /// The build variant could not be determined.
    #[error("{0}")]
    Variant(#[from] stockpot_variant::VariantError),

    /// A dependency location could not be resolved.
    #[error("{0}")]
    Location(#[from] LocationError),

    /// A project already exists at the target path.
    #[error("stockpot.toml already exists at {path} — cannot initialize over an existing project")]
    ProjectExists { path: String },

    /// A node refers to another node the graph does not contain.
    #[error("build node {node} refers to unknown node {missing}")]
    DanglingNode { node: String, missing: String },

    /// A build command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The build graph could not be serialized.
    #[error("cannot serialize build graph: {source}")]
    Serialize { source: serde_json::Error },
}

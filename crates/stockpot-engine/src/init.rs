//! Project scaffolding for `stockpot init`.

use std::collections::BTreeMap;
use std::path::Path;

use stockpot_config::manifest::{Manifest, Project};

use crate::error::EngineError;

/// Scaffold a new project with an empty dependency table.
///
/// Creates `dir` if needed, a `stockpot.toml` and a `.gitignore` that
/// excludes the build root.
///
/// # Errors
/// Returns an error if:
/// - A `stockpot.toml` already exists in `dir`
/// - The directory or files cannot be created
/// - The manifest cannot be serialized
pub fn init_project(name: &str, dir: &Path) -> Result<(), EngineError> {
    let manifest_path = dir.join("stockpot.toml");

    if manifest_path.exists() {
        return Err(EngineError::ProjectExists {
            path: manifest_path.display().to_string(),
        });
    }

    stockpot_util::fs::ensure_dir(dir)?;

    let manifest = Manifest {
        project: Project {
            name: name.to_owned(),
            build_root: ".build".into(),
            branch_root: None,
            thirdparty: None,
        },
        dependencies: BTreeMap::new(),
    };
    let toml_content = manifest.to_toml()?;
    write(&manifest_path, &toml_content)?;

    let gitignore = format!("{}/\n", manifest.project.build_root.display());
    write(&dir.join(".gitignore"), &gitignore)?;

    Ok(())
}

fn write(path: &Path, content: &str) -> Result<(), EngineError> {
    std::fs::write(path, content).map_err(|source| EngineError::Io {
        path: path.display().to_string(),
        source,
    })
}

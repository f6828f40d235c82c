//! Project-level orchestration: turn a manifest and command-line options
//! into a build graph, and optionally execute it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use stockpot_config::{LinkType, Manifest};
use stockpot_util::fs::{expand_home, remove_dir_all_if_exists};
use stockpot_variant::{Profile, Variant};

use crate::dependency::{declare_dependencies, Dependency};
use crate::env::{BuildEnv, EnvSettings, Environment};
use crate::error::EngineError;
use crate::execute::{execute, ExecutionResult, Toolchain};
use crate::graph::{BuildGraph, NodeId};
use crate::library_method::LibraryMethod;
use crate::location::DirectoryResolver;
use crate::session::BuildSession;

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "stockpot.toml";

/// Read the manifest at the root of `project_root`.
///
/// # Errors
/// Returns an error if the manifest is missing or invalid.
pub fn load_manifest(project_root: &Path) -> Result<Manifest, EngineError> {
    Ok(Manifest::from_path(&project_root.join(MANIFEST_FILE))?)
}

/// Options controlling a plan or build invocation.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Toolchain name used in the variant directory.
    pub toolchain: String,
    /// Whether to build in release mode.
    pub release: bool,
    /// Per-dependency option values keyed by flag name, e.g. `boost-location`.
    pub options: BTreeMap<String, String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            toolchain: "cxx".to_owned(),
            release: false,
            options: BTreeMap::new(),
        }
    }
}

impl PlanOptions {
    fn profile(&self) -> Profile {
        if self.release {
            Profile::Release
        } else {
            Profile::Debug
        }
    }
}

/// What a declared dependency turned into for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub name: String,
    /// `None` when no location is configured or it could not be resolved.
    pub location: Option<PathBuf>,
    pub version: Option<String>,
    pub includes: Vec<PathBuf>,
    pub sys_includes: Vec<PathBuf>,
    pub linktype: Option<LinkType>,
    /// The library node, for dependencies built from source.
    pub library: Option<NodeId>,
}

impl DependencyReport {
    fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            location: None,
            version: None,
            includes: Vec::new(),
            sys_includes: Vec::new(),
            linktype: None,
            library: None,
        }
    }

    fn available(dependency: &Dependency) -> Self {
        Self {
            name: dependency.name().to_owned(),
            location: Some(dependency.location().local().to_path_buf()),
            version: Some(dependency.version().to_owned()),
            includes: dependency.includes().to_vec(),
            sys_includes: dependency.sys_includes().to_vec(),
            linktype: dependency.source_path().map(|_| dependency.linktype()),
            library: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.location.is_some()
    }
}

/// Result of planning a project.
#[derive(Debug)]
pub struct Plan {
    pub variant: Variant,
    pub dependencies: Vec<DependencyReport>,
    /// Include paths the project itself would compile with.
    pub includes: Vec<PathBuf>,
    pub sys_includes: Vec<PathBuf>,
    pub graph: BuildGraph,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildResult {
    pub plan: Plan,
    pub execution: ExecutionResult,
    /// How long planning and execution took together.
    pub duration: std::time::Duration,
}

/// A manifest directory with `~` expanded, relative to `project_root`.
fn under_root(project_root: &Path, path: &Path) -> PathBuf {
    project_root.join(expand_home(&path.display().to_string()))
}

/// The manifest's build root as seen from `project_root`.
pub fn build_root(project_root: &Path, manifest: &Manifest) -> PathBuf {
    under_root(project_root, &manifest.project.build_root)
}

/// Environment settings for `variant`, with the manifest's directories
/// taken relative to `project_root`.
pub fn project_settings(project_root: &Path, manifest: &Manifest, variant: &Variant) -> EnvSettings {
    let dir = |path: &PathBuf| under_root(project_root, path);
    EnvSettings::for_variant(variant, &build_root(project_root, manifest))
        .with_branch_root(manifest.project.branch_root.as_ref().map(dir))
        .with_thirdparty(manifest.project.thirdparty.as_ref().map(dir))
}

/// Resolve every declared dependency without building anything.
///
/// # Errors
/// Returns an error if the host platform is unsupported.
pub fn resolve_dependencies(
    project_root: &Path,
    manifest: &Manifest,
    options: &PlanOptions,
) -> Result<Vec<DependencyReport>, EngineError> {
    let variant = Variant::host(&options.toolchain, options.profile())?;
    let settings = project_settings(project_root, manifest, &variant);
    let env = Environment::new(&variant, settings, options.options.clone());
    let mut session = BuildSession::new(Box::new(DirectoryResolver::new(project_root)));

    Ok(declare_dependencies(manifest)
        .iter()
        .map(|handler| match handler.create(&mut session, &env) {
            Some(dependency) => DependencyReport::available(&dependency),
            None => DependencyReport::unavailable(handler.name()),
        })
        .collect())
}

/// Plan the build of every declared dependency.
///
/// Each available dependency contributes its include paths; dependencies
/// with a source path also get compile and link nodes. Unavailable
/// dependencies are reported but do not fail the plan.
///
/// # Errors
/// Returns an error if the host platform is unsupported, source discovery
/// fails, or a build node cannot be recorded.
pub fn plan(
    project_root: &Path,
    manifest: &Manifest,
    options: &PlanOptions,
) -> Result<Plan, EngineError> {
    let variant = Variant::host(&options.toolchain, options.profile())?;
    let settings = project_settings(project_root, manifest, &variant);
    let mut env = Environment::new(&variant, settings, options.options.clone());
    let mut session = BuildSession::new(Box::new(DirectoryResolver::new(project_root)));

    let mut dependencies = Vec::with_capacity(manifest.dependencies.len());
    for handler in declare_dependencies(manifest) {
        let Some(dependency) = handler.create(&mut session, &env) else {
            dependencies.push(DependencyReport::unavailable(handler.name()));
            continue;
        };

        let mut report = DependencyReport::available(&dependency);
        if dependency.source_path().is_some() {
            let includes = dependency.clone();
            let method = LibraryMethod::new(dependency, move |target: &mut dyn BuildEnv| {
                includes.apply(target);
            });
            report.library = method.call(&mut session, &mut env)?;
        } else {
            dependency.apply(&mut env);
        }
        debug!(dependency = %report.name, library = ?report.library, "planned");
        dependencies.push(report);
    }

    let counts = env.graph().counts();
    info!(
        variant = %variant,
        compile = counts.compile,
        link = counts.link,
        install = counts.install,
        "plan complete"
    );

    Ok(Plan {
        variant,
        dependencies,
        includes: env.includes().to_vec(),
        sys_includes: env.sys_includes().to_vec(),
        graph: env.into_graph(),
    })
}

/// Plan the project, then execute the graph with `toolchain`.
///
/// # Errors
/// Returns an error if planning fails or a build command fails.
pub fn build(
    project_root: &Path,
    manifest: &Manifest,
    options: &PlanOptions,
    toolchain: &Toolchain,
) -> Result<BuildResult, EngineError> {
    let start = Instant::now();
    let plan = plan(project_root, manifest, options)?;
    let execution = execute(&plan.graph, toolchain)?;
    Ok(BuildResult {
        plan,
        execution,
        duration: start.elapsed(),
    })
}

/// Remove the build root. Returns the removed path.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn clean(project_root: &Path, manifest: &Manifest) -> Result<PathBuf, EngineError> {
    let build_root = build_root(project_root, manifest);
    remove_dir_all_if_exists(&build_root)?;
    Ok(build_root)
}

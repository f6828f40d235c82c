//! The build-environment seam and its in-memory implementation.
//!
//! [`BuildEnv`] is everything a location dependency needs from the host
//! build tool: option lookup, named directory settings, include-path
//! injection and the object/library/install builders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stockpot_config::LinkType;
use stockpot_util::error::UtilError;
use stockpot_variant::{Platform, Profile, Variant};

use crate::error::EngineError;
use crate::graph::{Action, BuildGraph, NodeId};

/// Named directory and suffix settings of a build environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    pub build_root: PathBuf,
    /// Directory source discovery never descends into.
    pub build_dir: PathBuf,
    /// Final output directory, relative to a dependency's working directory.
    pub final_dir: PathBuf,
    pub abs_final_dir: PathBuf,
    /// Cache-partitioning key of the active variant.
    pub tool_variant_dir: String,
    pub tool_variant_working_dir: PathBuf,
    pub obj_suffix: String,
    pub shobj_suffix: String,
    pub branch_root: Option<PathBuf>,
    pub thirdparty: Option<PathBuf>,
}

impl EnvSettings {
    pub fn for_variant(variant: &Variant, build_root: &Path) -> Self {
        Self {
            build_root: build_root.to_path_buf(),
            build_dir: build_root.to_path_buf(),
            final_dir: variant.final_dir(),
            abs_final_dir: variant.abs_final_dir(build_root),
            tool_variant_dir: variant.tool_variant_dir(),
            tool_variant_working_dir: variant.tool_variant_working_dir(),
            obj_suffix: variant.platform.obj_suffix().to_owned(),
            shobj_suffix: variant.platform.shobj_suffix().to_owned(),
            branch_root: None,
            thirdparty: None,
        }
    }

    pub fn with_branch_root(mut self, branch_root: Option<PathBuf>) -> Self {
        self.branch_root = branch_root;
        self
    }

    pub fn with_thirdparty(mut self, thirdparty: Option<PathBuf>) -> Self {
        self.thirdparty = thirdparty;
        self
    }

    /// Object suffix used for `linktype`.
    pub fn object_suffix(&self, linktype: LinkType) -> &str {
        match linktype {
            LinkType::Static => &self.obj_suffix,
            LinkType::Shared => &self.shobj_suffix,
        }
    }
}

/// Which include path list an entry goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    /// `-I`
    User,
    /// `-isystem`
    System,
}

/// The host build tool, as seen by a location dependency.
pub trait BuildEnv {
    /// Value of the command-line option `name`, if it was given.
    fn option(&self, name: &str) -> Option<String>;

    fn settings(&self) -> &EnvSettings;

    /// Append `paths` to the include list of `kind`, skipping ones already present.
    fn append_includes(&mut self, kind: IncludeKind, paths: &[PathBuf]);

    /// Add a node compiling `source` into the object `target`.
    ///
    /// # Errors
    /// Returns an error if the host rejects the node.
    fn object(
        &mut self,
        linktype: LinkType,
        target: &Path,
        source: &Path,
    ) -> Result<NodeId, EngineError>;

    /// Add a node building the library `name` from `objects` into `final_dir`.
    ///
    /// # Errors
    /// Returns an error if the host rejects the node.
    fn library(
        &mut self,
        linktype: LinkType,
        name: &str,
        objects: &[NodeId],
        final_dir: &Path,
    ) -> Result<NodeId, EngineError>;

    /// Add a node copying the output of `node` into `dest_dir`.
    ///
    /// # Errors
    /// Returns an error if the host rejects the node.
    fn install(&mut self, dest_dir: &Path, node: NodeId) -> Result<NodeId, EngineError>;

    /// Files under `start` matching `pattern`, skipping `exclude_dirs`.
    ///
    /// # Errors
    /// Returns an error if the pattern is invalid or a directory cannot be read.
    fn recursive_glob(
        &self,
        pattern: &str,
        start: &Path,
        exclude_dirs: &[PathBuf],
    ) -> Result<Vec<PathBuf>, UtilError> {
        stockpot_util::fs::recursive_glob(pattern, start, exclude_dirs)
    }
}

/// A build environment that records nodes into a [`BuildGraph`].
#[derive(Debug)]
pub struct Environment {
    options: BTreeMap<String, String>,
    settings: EnvSettings,
    platform: Platform,
    profile: Profile,
    includes: Vec<PathBuf>,
    sys_includes: Vec<PathBuf>,
    graph: BuildGraph,
}

impl Environment {
    pub fn new(variant: &Variant, settings: EnvSettings, options: BTreeMap<String, String>) -> Self {
        Self {
            options,
            settings,
            platform: variant.platform,
            profile: variant.profile,
            includes: Vec::new(),
            sys_includes: Vec::new(),
            graph: BuildGraph::new(),
        }
    }

    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    pub fn sys_includes(&self) -> &[PathBuf] {
        &self.sys_includes
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn into_graph(self) -> BuildGraph {
        self.graph
    }
}

impl BuildEnv for Environment {
    fn option(&self, name: &str) -> Option<String> {
        self.options.get(name).cloned()
    }

    fn settings(&self) -> &EnvSettings {
        &self.settings
    }

    fn append_includes(&mut self, kind: IncludeKind, paths: &[PathBuf]) {
        let list = match kind {
            IncludeKind::User => &mut self.includes,
            IncludeKind::System => &mut self.sys_includes,
        };
        for path in paths {
            if !list.contains(path) {
                list.push(path.clone());
            }
        }
    }

    fn object(
        &mut self,
        linktype: LinkType,
        target: &Path,
        source: &Path,
    ) -> Result<NodeId, EngineError> {
        self.graph.add(Action::Compile {
            linktype,
            profile: self.profile,
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            includes: self.includes.clone(),
            sys_includes: self.sys_includes.clone(),
        })
    }

    fn library(
        &mut self,
        linktype: LinkType,
        name: &str,
        objects: &[NodeId],
        final_dir: &Path,
    ) -> Result<NodeId, EngineError> {
        let file_name = match linktype {
            LinkType::Static => self.platform.static_lib_name(name),
            LinkType::Shared => self.platform.shared_lib_name(name),
        };
        self.graph.add(Action::Link {
            linktype,
            name: name.to_owned(),
            objects: objects.to_vec(),
            target: final_dir.join(file_name),
        })
    }

    fn install(&mut self, dest_dir: &Path, node: NodeId) -> Result<NodeId, EngineError> {
        let file_name = self
            .graph
            .output(node)
            .and_then(Path::file_name)
            .map(ToOwned::to_owned)
            .ok_or_else(|| EngineError::DanglingNode {
                node: "install".to_owned(),
                missing: node.to_string(),
            })?;
        self.graph.add(Action::Install {
            source: node,
            target: dest_dir.join(file_name),
        })
    }
}

//! In-memory build graph recorded by [`crate::env::Environment`].
//!
//! Nodes are appended in creation order. A node can only refer to nodes that
//! already exist, so iterating in order always visits inputs before outputs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use stockpot_config::LinkType;
use stockpot_variant::Profile;

use crate::error::EngineError;

/// Opaque handle to a schedulable unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a build node does when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Compile one source file into an object.
    Compile {
        linktype: LinkType,
        profile: Profile,
        source: PathBuf,
        target: PathBuf,
        /// Include paths in effect when the node was created.
        includes: Vec<PathBuf>,
        sys_includes: Vec<PathBuf>,
    },
    /// Archive or link objects into a library.
    Link {
        linktype: LinkType,
        name: String,
        objects: Vec<NodeId>,
        target: PathBuf,
    },
    /// Copy another node's output into a directory.
    Install { source: NodeId, target: PathBuf },
}

impl Action {
    /// The file this action produces.
    pub fn target(&self) -> &Path {
        match self {
            Self::Compile { target, .. } | Self::Link { target, .. } | Self::Install { target, .. } => {
                target
            }
        }
    }

    fn inputs(&self) -> Vec<NodeId> {
        match self {
            Self::Compile { .. } => Vec::new(),
            Self::Link { objects, .. } => objects.clone(),
            Self::Install { source, .. } => vec![*source],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub action: Action,
}

/// Counts of each node kind, for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub compile: usize,
    pub link: usize,
    pub install: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct BuildGraph {
    nodes: Vec<BuildNode>,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its handle.
    ///
    /// # Errors
    /// Returns an error if the action refers to a node that does not exist yet.
    pub fn add(&mut self, action: Action) -> Result<NodeId, EngineError> {
        let id = NodeId(self.nodes.len());
        if let Some(missing) = action.inputs().into_iter().find(|n| n.0 >= id.0) {
            return Err(EngineError::DanglingNode {
                node: id.to_string(),
                missing: missing.to_string(),
            });
        }
        self.nodes.push(BuildNode { id, action });
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&BuildNode> {
        self.nodes.get(id.0)
    }

    /// Output file of node `id`.
    pub fn output(&self, id: NodeId) -> Option<&Path> {
        self.get(id).map(|node| node.action.target())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[BuildNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn counts(&self) -> NodeCounts {
        let mut counts = NodeCounts::default();
        for node in &self.nodes {
            match node.action {
                Action::Compile { .. } => counts.compile += 1,
                Action::Link { .. } => counts.link += 1,
                Action::Install { .. } => counts.install += 1,
            }
        }
        counts
    }

    /// Serialize the graph as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|source| EngineError::Serialize { source })
    }
}

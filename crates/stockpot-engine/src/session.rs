//! State shared by every location dependency for one build invocation.

use std::collections::HashMap;
use std::path::PathBuf;

use stockpot_config::LinkType;

use crate::graph::NodeId;
use crate::location::{Location, LocationError, LocationId, LocationResolver};

/// `(dependency name, tool variant dir)`.
type PartitionKey = (String, String);

/// Build nodes already issued, per dependency and variant.
///
/// At most one object node exists per (dependency, variant, object path)
/// and one library node per (dependency, variant, link type).
#[derive(Debug, Default)]
pub struct ArtifactCache {
    objects: HashMap<PartitionKey, HashMap<PathBuf, NodeId>>,
    libraries: HashMap<PartitionKey, HashMap<LinkType, NodeId>>,
}

impl ArtifactCache {
    /// Object nodes of `dependency` under `variant`, keyed by relative object path.
    pub fn objects_mut(&mut self, dependency: &str, variant: &str) -> &mut HashMap<PathBuf, NodeId> {
        self.objects
            .entry((dependency.to_owned(), variant.to_owned()))
            .or_default()
    }

    /// Library nodes of `dependency` under `variant`, keyed by link type.
    pub fn libraries_mut(
        &mut self,
        dependency: &str,
        variant: &str,
    ) -> &mut HashMap<LinkType, NodeId> {
        self.libraries
            .entry((dependency.to_owned(), variant.to_owned()))
            .or_default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.values().map(HashMap::len).sum()
    }

    pub fn library_count(&self) -> usize {
        self.libraries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.object_count() == 0 && self.library_count() == 0
    }
}

/// Owns the resolver, the resolved-location cache and the artifact cache.
pub struct BuildSession {
    resolver: Box<dyn LocationResolver>,
    locations: HashMap<(LocationId, Option<String>), Location>,
    artifacts: ArtifactCache,
}

impl BuildSession {
    pub fn new(resolver: Box<dyn LocationResolver>) -> Self {
        Self {
            resolver,
            locations: HashMap::new(),
            artifacts: ArtifactCache::default(),
        }
    }

    /// Return the cached location for `id`, resolving it on first use.
    ///
    /// Failures are not cached; a later call retries the resolver.
    ///
    /// # Errors
    /// Returns the resolver's error if the location cannot be resolved.
    pub fn location(
        &mut self,
        id: &LocationId,
        extra_sub_path: Option<&str>,
    ) -> Result<Location, LocationError> {
        let key = (id.clone(), extra_sub_path.map(str::to_owned));
        if let Some(location) = self.locations.get(&key) {
            return Ok(location.clone());
        }
        let location = self.resolver.resolve(id, extra_sub_path)?;
        self.locations.insert(key, location.clone());
        Ok(location)
    }

    pub fn cached_location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn artifacts_mut(&mut self) -> &mut ArtifactCache {
        &mut self.artifacts
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("locations", &self.locations.len())
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

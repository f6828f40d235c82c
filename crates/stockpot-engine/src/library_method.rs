//! Deferred library builds bound to one dependency.

use std::path::PathBuf;

use stockpot_config::LinkType;

use crate::dependency::Dependency;
use crate::env::BuildEnv;
use crate::error::EngineError;
use crate::graph::NodeId;
use crate::session::BuildSession;

/// Builds a dependency's library on demand.
///
/// The host keeps one of these per dependency and invokes it with whichever
/// environment needs the library. `update_env` runs first, so it can add
/// include paths or other settings the sources need to compile.
pub struct LibraryMethod<F> {
    dependency: Dependency,
    update_env: F,
    sources: Option<Vec<PathBuf>>,
    library_name: Option<String>,
    linktype: Option<LinkType>,
}

impl<F> LibraryMethod<F>
where
    F: Fn(&mut dyn BuildEnv),
{
    pub fn new(dependency: Dependency, update_env: F) -> Self {
        Self {
            dependency,
            update_env,
            sources: None,
            library_name: None,
            linktype: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_library_name(mut self, library_name: &str) -> Self {
        self.library_name = Some(library_name.to_owned());
        self
    }

    pub fn with_linktype(mut self, linktype: LinkType) -> Self {
        self.linktype = Some(linktype);
        self
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// Apply `update_env` to `env`, then build the library.
    ///
    /// # Errors
    /// Returns an error if the library build fails.
    pub fn call(
        &self,
        session: &mut BuildSession,
        env: &mut dyn BuildEnv,
    ) -> Result<Option<NodeId>, EngineError> {
        (self.update_env)(env);
        self.dependency.build_library_from_source(
            session,
            env,
            self.sources.as_deref(),
            self.library_name.as_deref(),
            self.linktype,
        )
    }
}

impl<F> std::fmt::Debug for LibraryMethod<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryMethod")
            .field("dependency", &self.dependency.name())
            .field("sources", &self.sources)
            .field("library_name", &self.library_name)
            .field("linktype", &self.linktype)
            .finish_non_exhaustive()
    }
}

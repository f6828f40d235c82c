//! Location dependencies, build sessions and the recorded build graph.

pub mod dependency;
pub mod env;
pub mod error;
pub mod execute;
pub mod graph;
pub mod init;
pub mod library_method;
pub mod location;
pub mod options;
pub mod plan;
pub mod session;

pub use dependency::{declare_dependencies, location_dependency, Dependency, LocationDependency};
pub use env::{BuildEnv, EnvSettings, Environment, IncludeKind};
pub use error::EngineError;
pub use execute::{execute, ExecutionResult, Toolchain};
pub use graph::{Action, BuildGraph, NodeId};
pub use init::init_project;
pub use library_method::LibraryMethod;
pub use location::{DirectoryResolver, Location, LocationError, LocationId, LocationResolver};
pub use options::OptionSpec;
pub use plan::{
    build, clean, load_manifest, plan, resolve_dependencies, BuildResult, DependencyReport, Plan,
    PlanOptions,
};
pub use session::BuildSession;

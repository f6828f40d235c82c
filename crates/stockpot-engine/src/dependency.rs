//! Location dependencies: declaration, location resolution, include
//! injection and building a library from the dependency's sources.
//!
//! A [`LocationDependency`] is declared once per third-party library. For
//! each build environment it produces a [`Dependency`] bound to a resolved
//! [`Location`]. All caching goes through the [`BuildSession`].

use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, error, trace, warn};

use stockpot_config::{DependencyDefaults, LinkType, Manifest};
use stockpot_util::fs::{expand_home, normalize, relative_path};

use crate::env::{BuildEnv, IncludeKind};
use crate::error::EngineError;
use crate::graph::NodeId;
use crate::location::{Location, LocationError, LocationId};
use crate::options::{option_name, option_specs, OptionSpec};
use crate::session::BuildSession;

/// Configuration assembled from command-line options and declared defaults.
///
/// Assembled on the first successful `create` and fixed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyConfig {
    pub includes: Vec<String>,
    pub sys_includes: Vec<String>,
    pub source_path: Option<String>,
    pub linktype: Option<LinkType>,
}

/// A declared third-party dependency.
#[derive(Debug)]
pub struct LocationDependency {
    name: String,
    defaults: DependencyDefaults,
    config: OnceCell<DependencyConfig>,
}

/// Declare a location dependency called `name` with the given defaults.
pub fn location_dependency(name: &str, defaults: DependencyDefaults) -> LocationDependency {
    LocationDependency {
        name: name.to_owned(),
        defaults,
        config: OnceCell::new(),
    }
}

/// Declare every dependency listed in `manifest`, in name order.
pub fn declare_dependencies(manifest: &Manifest) -> Vec<LocationDependency> {
    manifest
        .dependencies
        .iter()
        .map(|(name, defaults)| location_dependency(name, defaults.clone()))
        .collect()
}

impl LocationDependency {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &DependencyDefaults {
        &self.defaults
    }

    /// The assembled configuration, once `create` has succeeded.
    pub fn config(&self) -> Option<&DependencyConfig> {
        self.config.get()
    }

    /// Register this dependency's command-line options with the host.
    pub fn add_options(&self, add_option: &mut dyn FnMut(OptionSpec)) {
        for spec in option_specs(&self.name) {
            add_option(spec);
        }
    }

    fn option(&self, env: &dyn BuildEnv, suffix: &str) -> Option<String> {
        env.option(&option_name(&self.name, suffix))
            .filter(|value| !value.is_empty())
    }

    fn extra_sub_path(&self) -> Option<&str> {
        self.defaults
            .extra_sub_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }

    /// Work out where this dependency should come from.
    ///
    /// An explicit `--<name>-location` wins over the declared default. With
    /// neither, a given branch falls back to the environment's branch root,
    /// or to its third-party root when no branch root is set. Returns `None`
    /// when no location applies.
    pub fn location_id(&self, env: &dyn BuildEnv) -> Option<LocationId> {
        let branch = self.option(env, "branch");

        let location = self
            .option(env, "location")
            .or_else(|| self.defaults.location.clone().filter(|l| !l.is_empty()))
            .or_else(|| {
                branch.as_ref()?;
                let settings = env.settings();
                settings
                    .branch_root
                    .as_ref()
                    .or(settings.thirdparty.as_ref())
                    .map(|root| root.display().to_string())
            });

        let Some(location) = location else {
            debug!(
                dependency = %self.name,
                "no location specified, dependency not available"
            );
            return None;
        };

        Some(LocationId {
            location: expand_home(&location),
            branch,
        })
    }

    /// Look up or resolve this dependency's location.
    ///
    /// `Ok(None)` means no location is configured; `Err` means one is
    /// configured but could not be resolved.
    ///
    /// # Errors
    /// Returns the resolver's error if resolution fails.
    pub fn try_location(
        &self,
        session: &mut BuildSession,
        env: &dyn BuildEnv,
    ) -> Result<Option<Location>, LocationError> {
        let Some(id) = self.location_id(env) else {
            return Ok(None);
        };
        session
            .location(&id, self.extra_sub_path())
            .map(Some)
    }

    /// Like [`Self::try_location`], but resolution failures are logged and
    /// reported as `None`.
    pub fn location(&self, session: &mut BuildSession, env: &dyn BuildEnv) -> Option<Location> {
        match self.try_location(session, env) {
            Ok(location) => location,
            Err(err) => {
                let id = self.location_id(env);
                let location = id.as_ref().map_or("", |id| id.location.as_str());
                let branch = id.as_ref().and_then(|id| id.branch.as_deref());
                let extra_sub_path = self.extra_sub_path();
                error!(
                    dependency = %self.name,
                    location,
                    branch = branch.unwrap_or("None"),
                    extra_sub_path = extra_sub_path.unwrap_or("None"),
                    error = %err,
                    "could not get location"
                );
                None
            }
        }
    }

    /// Resolve the location and instantiate the dependency for `env`.
    ///
    /// Returns `None` when the dependency is unavailable or its location
    /// could not be resolved.
    pub fn create(&self, session: &mut BuildSession, env: &dyn BuildEnv) -> Option<Dependency> {
        let location = self.location(session, env)?;
        let config = self.config.get_or_init(|| self.assemble_config(env));
        Some(Dependency::new(&self.name, location, config))
    }

    fn assemble_config(&self, env: &dyn BuildEnv) -> DependencyConfig {
        let declared = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        let mut includes: Vec<String> = self.option(env, "include").into_iter().collect();
        includes.extend(declared(&self.defaults.include));

        let mut sys_includes: Vec<String> = self.option(env, "sys-include").into_iter().collect();
        sys_includes.extend(declared(&self.defaults.sys_include));

        let source_path =
            declared(&self.defaults.source_path).or_else(|| self.option(env, "source-path"));

        let linktype = self.defaults.linktype.or_else(|| {
            let value = self.option(env, "linktype")?;
            match LinkType::from_str(&value) {
                Ok(linktype) => Some(linktype),
                Err(err) => {
                    warn!(dependency = %self.name, error = %err, "ignoring linktype option");
                    None
                }
            }
        });

        DependencyConfig {
            includes,
            sys_includes,
            source_path,
            linktype,
        }
    }
}

/// A location dependency bound to a resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    name: String,
    location: Location,
    includes: Vec<PathBuf>,
    sys_includes: Vec<PathBuf>,
    source_path: Option<PathBuf>,
    linktype: LinkType,
}

impl Dependency {
    /// Relative paths in `config` are taken relative to the location root;
    /// empty entries are skipped. With no includes of either kind the
    /// location root itself is the include path.
    pub fn new(name: &str, location: Location, config: &DependencyConfig) -> Self {
        let root = location.local().to_path_buf();
        let under_root = |paths: &[String]| -> Vec<PathBuf> {
            paths
                .iter()
                .filter(|path| !path.is_empty())
                .map(|path| root.join(path))
                .collect()
        };

        let mut includes = under_root(&config.includes);
        let sys_includes = under_root(&config.sys_includes);
        if includes.is_empty() && sys_includes.is_empty() {
            includes.push(root.clone());
        }

        Self {
            name: name.to_owned(),
            includes,
            sys_includes,
            source_path: config
                .source_path
                .as_ref()
                .filter(|path| !path.is_empty())
                .map(|path| root.join(path)),
            linktype: config.linktype.unwrap_or_default(),
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    pub fn sys_includes(&self) -> &[PathBuf] {
        &self.sys_includes
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn linktype(&self) -> LinkType {
        self.linktype
    }

    /// Join `parts` onto the location root.
    pub fn local_sub_path<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        parts
            .into_iter()
            .fold(self.location.local().to_path_buf(), |acc, p| acc.join(p))
    }

    pub fn version(&self) -> &str {
        self.location.version()
    }

    pub fn repository(&self) -> Option<&str> {
        self.location.repository()
    }

    pub fn branch(&self) -> Option<&str> {
        self.location.branch()
    }

    pub fn revisions(&self) -> &[String] {
        self.location.revisions()
    }

    /// Add this dependency's include paths to `env`.
    pub fn apply(&self, env: &mut dyn BuildEnv) {
        env.append_includes(IncludeKind::User, &self.includes);
        env.append_includes(IncludeKind::System, &self.sys_includes);
    }

    /// Compile the dependency's sources and build them into a library.
    ///
    /// Without explicit `sources`, every `*.cpp` under the source path is
    /// used. Returns `Ok(None)` when there is neither. Object and library
    /// nodes are issued at most once per variant; later calls get the
    /// cached nodes back. A shared library also gets an install node into
    /// the environment's `abs_final_dir`, which is what is returned.
    ///
    /// # Errors
    /// Returns an error if source discovery fails or the host rejects a node.
    pub fn build_library_from_source(
        &self,
        session: &mut BuildSession,
        env: &mut dyn BuildEnv,
        sources: Option<&[PathBuf]>,
        library_name: Option<&str>,
        linktype: Option<LinkType>,
    ) -> Result<Option<NodeId>, EngineError> {
        let settings = env.settings().clone();

        let sources = match (sources, &self.source_path) {
            (Some(sources), _) if !sources.is_empty() => sources.to_vec(),
            (_, Some(source_path)) => env.recursive_glob(
                "*.cpp",
                source_path,
                std::slice::from_ref(&settings.build_dir),
            )?,
            (_, None) => {
                warn!(
                    dependency = %self.name,
                    "attempting to build library when source path is None"
                );
                return Ok(None);
            }
        };

        let library_name = library_name.unwrap_or(&self.name);
        let linktype = linktype.unwrap_or(self.linktype);
        let variant_key = settings.tool_variant_dir.as_str();

        let local_dir = self.location.local();
        let build_dir = settings
            .build_root
            .join(self.location.local_folder())
            .join(&settings.tool_variant_working_dir);
        let final_dir = normalize(&build_dir.join(&settings.final_dir));

        debug!(dependency = %self.name, build_dir = %build_dir.display(), "build_dir");
        debug!(dependency = %self.name, final_dir = %final_dir.display(), "final_dir");

        let obj_suffix = settings.object_suffix(linktype);

        let mut objects = Vec::with_capacity(sources.len());
        let prebuilt_objects = session.artifacts_mut().objects_mut(&self.name, variant_key);
        for source in &sources {
            let rel_path = relative_path(source, local_dir);
            let mut rel_obj_path = rel_path.with_extension("").into_os_string();
            rel_obj_path.push(obj_suffix);
            let rel_obj_path = PathBuf::from(rel_obj_path);

            let node = match prebuilt_objects.get(&rel_obj_path) {
                Some(node) => *node,
                None => {
                    let obj_path = build_dir.join(&rel_obj_path);
                    let node = env.object(linktype, &obj_path, source)?;
                    prebuilt_objects.insert(rel_obj_path, node);
                    node
                }
            };
            objects.push(node);
        }

        let prebuilt_libraries = session
            .artifacts_mut()
            .libraries_mut(&self.name, variant_key);
        if let Some(existing) = prebuilt_libraries.get(&linktype) {
            trace!(dependency = %self.name, node = %existing, "using existing library");
            return Ok(Some(*existing));
        }

        let mut library = env.library(linktype, library_name, &objects, &final_dir)?;
        if linktype == LinkType::Shared {
            library = env.install(&settings.abs_final_dir, library)?;
        }
        prebuilt_libraries.insert(linktype, library);
        Ok(Some(library))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use proptest::prelude::*;
    use stockpot_variant::{Platform, Profile, Variant};

    use super::*;
    use crate::env::{EnvSettings, Environment};
    use crate::graph::{Action, NodeCounts};
    use crate::location::DirectoryResolver;

    fn variant(profile: Profile) -> Variant {
        Variant {
            toolchain: "gcc".to_owned(),
            profile,
            arch: "x86_64".to_owned(),
            platform: Platform::Linux,
        }
    }

    fn env_for(root: &Path, profile: Profile, options: &[(&str, &str)]) -> Environment {
        let variant = variant(profile);
        let settings = EnvSettings::for_variant(&variant, &root.join(".build"))
            .with_branch_root(Some(root.join("branches")))
            .with_thirdparty(Some(root.join("thirdparty")));
        let options: BTreeMap<String, String> = options
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Environment::new(&variant, settings, options)
    }

    fn session_for(root: &Path) -> BuildSession {
        BuildSession::new(Box::new(DirectoryResolver::new(root)))
    }

    /// Lay out `<root>/boost` with three sources under `libs/system/src`.
    fn boost_tree(root: &Path) -> PathBuf {
        let boost = root.join("boost");
        let src = boost.join("libs").join("system").join("src");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(boost.join("include")).unwrap();
        for name in ["error_code.cpp", "system.cpp", "posix.cpp"] {
            fs::write(src.join(name), b"int x;").unwrap();
        }
        boost
    }

    fn boost_dependency() -> LocationDependency {
        location_dependency(
            "boost",
            DependencyDefaults {
                location: Some("boost".to_owned()),
                include: Some("include".to_owned()),
                source_path: Some("libs/system/src".to_owned()),
                ..DependencyDefaults::default()
            },
        )
    }

    #[test]
    fn add_options_registers_all_flags() {
        let dep = location_dependency("boost", DependencyDefaults::default());
        let mut names = Vec::new();
        dep.add_options(&mut |spec| names.push(spec.name));
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"boost-location".to_owned()));
        assert!(names.contains(&"boost-linktype".to_owned()));
    }

    #[test]
    fn location_id_prefers_cli_over_default() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-location", "/cli/boost")]);
        let id = boost_dependency().location_id(&env).unwrap();
        assert_eq!(id.location, "/cli/boost");
        assert!(id.branch.is_none());
    }

    #[test]
    fn location_id_default_beats_branch_root() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-branch", "develop")]);
        let id = boost_dependency().location_id(&env).unwrap();
        assert_eq!(id.location, "boost");
        assert_eq!(id.branch.as_deref(), Some("develop"));
    }

    #[test]
    fn location_id_branch_falls_back_to_branch_root() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[("fmt-branch", "v10")]);
        let dep = location_dependency("fmt", DependencyDefaults::default());
        let id = dep.location_id(&env).unwrap();
        assert_eq!(id.location, tmp.path().join("branches").display().to_string());
    }

    #[test]
    fn location_id_branch_falls_back_to_thirdparty_without_branch_root() {
        let tmp = tempfile::tempdir().unwrap();
        let variant = variant(Profile::Debug);
        let settings = EnvSettings::for_variant(&variant, &tmp.path().join(".build"))
            .with_thirdparty(Some(tmp.path().join("thirdparty")));
        let options = BTreeMap::from([("fmt-branch".to_owned(), "v10".to_owned())]);
        let env = Environment::new(&variant, settings, options);

        let dep = location_dependency("fmt", DependencyDefaults::default());
        let id = dep.location_id(&env).unwrap();
        assert_eq!(id.location, tmp.path().join("thirdparty").display().to_string());
    }

    #[test]
    fn location_id_none_without_anything() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[]);
        let dep = location_dependency("fmt", DependencyDefaults::default());
        assert!(dep.location_id(&env).is_none());
    }

    #[test]
    fn empty_location_option_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-location", "")]);
        let id = boost_dependency().location_id(&env).unwrap();
        assert_eq!(id.location, "boost");
    }

    #[test]
    fn unresolvable_location_is_none_but_distinguishable() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency();

        assert!(dep.create(&mut session, &env).is_none());
        assert!(dep.try_location(&mut session, &env).is_err());
        assert!(dep.config().is_none());

        let unconfigured = location_dependency("fmt", DependencyDefaults::default());
        assert!(matches!(
            unconfigured.try_location(&mut session, &env),
            Ok(None)
        ));
    }

    #[test]
    fn create_resolves_includes_against_location() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let env = env_for(
            tmp.path(),
            Profile::Debug,
            &[("boost-sys-include", "/usr/include/extra")],
        );
        let mut session = session_for(tmp.path());

        let dep = boost_dependency().create(&mut session, &env).unwrap();
        assert_eq!(dep.includes(), &[boost.join("include")]);
        assert_eq!(dep.sys_includes(), &[PathBuf::from("/usr/include/extra")]);
        assert_eq!(dep.source_path(), Some(boost.join("libs/system/src").as_path()));
        assert_eq!(dep.linktype(), LinkType::Static);
        assert_eq!(dep.version(), "boost");
        assert_eq!(
            dep.local_sub_path(["libs", "system"]),
            boost.join("libs").join("system")
        );
    }

    #[test]
    fn location_root_is_default_include() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());

        let dep = location_dependency(
            "boost",
            DependencyDefaults {
                location: Some("boost".to_owned()),
                ..DependencyDefaults::default()
            },
        )
        .create(&mut session, &env)
        .unwrap();
        assert_eq!(dep.includes(), &[boost]);
        assert!(dep.sys_includes().is_empty());
        assert!(dep.source_path().is_none());
    }

    #[test]
    fn empty_declared_source_path_defers_to_option() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let handler = || {
            location_dependency(
                "boost",
                DependencyDefaults {
                    location: Some("boost".to_owned()),
                    source_path: Some(String::new()),
                    ..DependencyDefaults::default()
                },
            )
        };

        let env = env_for(
            tmp.path(),
            Profile::Debug,
            &[("boost-source-path", "libs/system/src")],
        );
        let mut session = session_for(tmp.path());
        let dep = handler().create(&mut session, &env).unwrap();
        assert_eq!(dep.source_path(), Some(boost.join("libs/system/src").as_path()));

        let mut env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = handler().create(&mut session, &env).unwrap();
        assert!(dep.source_path().is_none());
        let result = dep
            .build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();
        assert!(result.is_none());
        assert!(env.graph().is_empty());
    }

    #[test]
    fn empty_declared_includes_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());

        let dep = location_dependency(
            "boost",
            DependencyDefaults {
                location: Some("boost".to_owned()),
                include: Some(String::new()),
                sys_include: Some(String::new()),
                ..DependencyDefaults::default()
            },
        )
        .create(&mut session, &env)
        .unwrap();
        assert_eq!(dep.includes(), &[boost]);
        assert!(dep.sys_includes().is_empty());
    }

    #[test]
    fn empty_config_entries_do_not_become_paths() {
        let location = Location::new(PathBuf::from("/deps/boost"), "boost", "1.84");
        let config = DependencyConfig {
            includes: vec![String::new()],
            sys_includes: vec![String::new(), "sys".to_owned()],
            source_path: Some(String::new()),
            linktype: None,
        };
        let dep = Dependency::new("boost", location, &config);
        assert!(dep.includes().is_empty());
        assert_eq!(dep.sys_includes(), &[PathBuf::from("/deps/boost/sys")]);
        assert!(dep.source_path().is_none());

        let location = Location::new(PathBuf::from("/deps/boost"), "boost", "1.84");
        let config = DependencyConfig {
            includes: vec![String::new()],
            ..DependencyConfig::default()
        };
        let dep = Dependency::new("boost", location, &config);
        assert_eq!(dep.includes(), &[PathBuf::from("/deps/boost")]);
    }

    #[test]
    fn cli_include_precedes_default_include() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-include", "extra")]);
        let mut session = session_for(tmp.path());

        let dep = boost_dependency().create(&mut session, &env).unwrap();
        assert_eq!(dep.includes(), &[boost.join("extra"), boost.join("include")]);
    }

    #[test]
    fn repeated_create_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let env = env_for(
            tmp.path(),
            Profile::Debug,
            &[("boost-include", "extra"), ("boost-linktype", "shared")],
        );
        let mut session = session_for(tmp.path());
        let handler = boost_dependency();

        let first = handler.create(&mut session, &env).unwrap();
        let second = handler.create(&mut session, &env).unwrap();
        let third = handler.create(&mut session, &env).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.includes().len(), 2);
        assert_eq!(first.linktype(), LinkType::Shared);
        assert_eq!(session.cached_location_count(), 1);
    }

    #[test]
    fn declared_linktype_wins_over_option() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-linktype", "shared")]);
        let mut session = session_for(tmp.path());
        let handler = location_dependency(
            "boost",
            DependencyDefaults {
                location: Some("boost".to_owned()),
                linktype: Some(LinkType::Static),
                ..DependencyDefaults::default()
            },
        );
        let dep = handler.create(&mut session, &env).unwrap();
        assert_eq!(dep.linktype(), LinkType::Static);
    }

    #[test]
    fn invalid_linktype_option_falls_back_to_static() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let env = env_for(tmp.path(), Profile::Debug, &[("boost-linktype", "dynamic")]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency().create(&mut session, &env).unwrap();
        assert_eq!(dep.linktype(), LinkType::Static);
    }

    #[test]
    fn apply_injects_include_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[("boost-sys-include", "sys")]);
        let mut session = session_for(tmp.path());

        let dep = boost_dependency().create(&mut session, &env).unwrap();
        dep.apply(&mut env);
        dep.apply(&mut env);
        assert_eq!(env.includes(), &[boost.join("include")]);
        assert_eq!(env.sys_includes(), &[boost.join("sys")]);
    }

    #[test]
    fn no_sources_and_no_source_path_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = location_dependency(
            "boost",
            DependencyDefaults {
                location: Some("boost".to_owned()),
                ..DependencyDefaults::default()
            },
        )
        .create(&mut session, &env)
        .unwrap();

        let result = dep
            .build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();
        assert!(result.is_none());
        assert!(session.artifacts().is_empty());
        assert!(env.graph().is_empty());

        let result = dep
            .build_library_from_source(&mut session, &mut env, Some(&[]), None, None)
            .unwrap();
        assert!(result.is_none());
        assert!(session.artifacts().is_empty());
    }

    #[test]
    fn shared_boost_builds_three_objects_one_library_one_install() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[("boost-linktype", "shared")]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency().create(&mut session, &env).unwrap();

        let node = dep
            .build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap()
            .unwrap();

        let graph = env.graph();
        assert_eq!(
            graph.counts(),
            NodeCounts {
                compile: 3,
                link: 1,
                install: 1
            }
        );

        let working = tmp
            .path()
            .join(".build")
            .join("boost")
            .join("gcc/debug/x86_64/working");
        for built in graph.nodes() {
            if let Action::Compile { target, linktype, .. } = &built.action {
                assert_eq!(target.extension().unwrap(), "os");
                assert!(target.starts_with(working.join("libs/system/src")));
                assert_eq!(*linktype, LinkType::Shared);
            }
        }

        let Some(Action::Install { source, target }) = graph.get(node).map(|n| &n.action) else {
            unreachable!("a shared library build returns its install node");
        };
        assert_eq!(
            target,
            &tmp.path().join(".build/gcc/debug/x86_64/final/libboost.so")
        );
        assert_eq!(
            graph.output(*source).unwrap(),
            tmp.path()
                .join(".build/boost/gcc/debug/x86_64/final/libboost.so")
        );
        assert!(boost.join("libs/system/src/system.cpp").is_file());
    }

    #[test]
    fn second_build_reuses_cached_nodes() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency().create(&mut session, &env).unwrap();

        let first = dep
            .build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();
        let nodes_after_first = env.graph().len();
        let second = dep
            .build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(env.graph().len(), nodes_after_first);
        assert_eq!(session.artifacts().object_count(), 3);
        assert_eq!(session.artifacts().library_count(), 1);
    }

    #[test]
    fn explicit_sources_share_object_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let boost = boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency().create(&mut session, &env).unwrap();

        let one = vec![boost.join("libs/system/src/system.cpp")];
        dep.build_library_from_source(&mut session, &mut env, Some(&one), Some("sys"), None)
            .unwrap();
        let compile_nodes = env.graph().counts().compile;
        assert_eq!(compile_nodes, 1);

        // The static library already exists, but the other sources still get objects.
        dep.build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();
        assert_eq!(env.graph().counts().compile, 3);
        assert_eq!(env.graph().counts().link, 1);
    }

    #[test]
    fn static_and_shared_libraries_coexist() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let mut env = env_for(tmp.path(), Profile::Debug, &[]);
        let mut session = session_for(tmp.path());
        let dep = boost_dependency().create(&mut session, &env).unwrap();

        let static_lib = dep
            .build_library_from_source(&mut session, &mut env, None, None, Some(LinkType::Static))
            .unwrap();
        let shared_lib = dep
            .build_library_from_source(&mut session, &mut env, None, None, Some(LinkType::Shared))
            .unwrap();

        assert_ne!(static_lib, shared_lib);
        assert_eq!(
            env.graph().counts(),
            NodeCounts {
                compile: 6,
                link: 2,
                install: 1
            }
        );
    }

    #[test]
    fn variants_are_cached_separately() {
        let tmp = tempfile::tempdir().unwrap();
        boost_tree(tmp.path());
        let mut session = session_for(tmp.path());
        let handler = boost_dependency();

        let mut debug_env = env_for(tmp.path(), Profile::Debug, &[]);
        let dep = handler.create(&mut session, &debug_env).unwrap();
        dep.build_library_from_source(&mut session, &mut debug_env, None, None, None)
            .unwrap();

        let mut release_env = env_for(tmp.path(), Profile::Release, &[]);
        let dep = handler.create(&mut session, &release_env).unwrap();
        dep.build_library_from_source(&mut session, &mut release_env, None, None, None)
            .unwrap();

        assert_eq!(release_env.graph().counts().compile, 3);
        assert_eq!(release_env.graph().counts().link, 1);
        assert_eq!(session.artifacts().object_count(), 6);
        assert_eq!(session.artifacts().library_count(), 2);
    }

    #[test]
    fn build_dir_is_excluded_from_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("proj");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(project.join("src").join("a.cpp"), b"").unwrap();
        fs::create_dir_all(project.join(".build")).unwrap();
        fs::write(project.join(".build").join("stale.cpp"), b"").unwrap();

        let mut env = env_for(&project, Profile::Debug, &[]);
        let mut session = session_for(&project);
        let dep = location_dependency(
            "proj",
            DependencyDefaults {
                location: Some(".".to_owned()),
                source_path: Some(".".to_owned()),
                ..DependencyDefaults::default()
            },
        )
        .create(&mut session, &env)
        .unwrap();

        dep.build_library_from_source(&mut session, &mut env, None, None, None)
            .unwrap();
        assert_eq!(env.graph().counts().compile, 1);
    }

    #[test]
    fn declare_dependencies_follows_manifest() {
        let manifest = Manifest::parse(
            "[project]\nname = \"app\"\n[dependencies.zlib]\n[dependencies.boost]\nlinktype = \"shared\"\n",
            Path::new("stockpot.toml"),
        )
        .unwrap();
        let declared = declare_dependencies(&manifest);
        let names: Vec<&str> = declared.iter().map(LocationDependency::name).collect();
        assert_eq!(names, vec!["boost", "zlib"]);
        assert_eq!(declared.first().unwrap().defaults().linktype, Some(LinkType::Shared));
    }

    proptest! {
        #[test]
        fn object_nodes_are_issued_once_per_source(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
            repeats in 1usize..4,
        ) {
            let tmp = tempfile::tempdir().unwrap();
            let src = tmp.path().join("dep").join("src");
            fs::create_dir_all(&src).unwrap();
            for name in &names {
                fs::write(src.join(format!("{name}.cpp")), b"").unwrap();
            }

            let mut env = env_for(tmp.path(), Profile::Debug, &[]);
            let mut session = session_for(tmp.path());
            let dep = location_dependency(
                "dep",
                DependencyDefaults {
                    location: Some("dep".to_owned()),
                    source_path: Some("src".to_owned()),
                    ..DependencyDefaults::default()
                },
            )
            .create(&mut session, &env)
            .unwrap();

            let mut results = Vec::new();
            for _ in 0..repeats {
                results.push(
                    dep.build_library_from_source(&mut session, &mut env, None, None, None)
                        .unwrap(),
                );
            }

            prop_assert!(results.windows(2).all(|w| w.first() == w.get(1)));
            prop_assert_eq!(env.graph().counts().compile, names.len());
            prop_assert_eq!(env.graph().counts().link, 1);
        }
    }
}

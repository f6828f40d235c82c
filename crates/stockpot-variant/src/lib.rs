//! Build variants and host platform naming conventions for stockpot.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Optimisation profile of a build variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Debug,
    Release,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating-system family, which decides object and library file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Suffix for objects that go into a static library.
    pub fn obj_suffix(self) -> &'static str {
        match self {
            Self::Linux | Self::MacOs => ".o",
            Self::Windows => ".obj",
        }
    }

    /// Suffix for position-independent objects that go into a shared library.
    pub fn shobj_suffix(self) -> &'static str {
        match self {
            Self::Linux | Self::MacOs => ".os",
            Self::Windows => ".obj",
        }
    }

    /// File name of a static library called `name`.
    pub fn static_lib_name(self, name: &str) -> String {
        match self {
            Self::Linux | Self::MacOs => format!("lib{name}.a"),
            Self::Windows => format!("{name}.lib"),
        }
    }

    /// File name of a shared library called `name`.
    pub fn shared_lib_name(self, name: &str) -> String {
        match self {
            Self::Linux => format!("lib{name}.so"),
            Self::MacOs => format!("lib{name}.dylib"),
            Self::Windows => format!("{name}.dll"),
        }
    }
}

/// Detect the platform stockpot is running on.
///
/// # Errors
/// Returns an error if the current OS has no known naming conventions.
pub fn host_platform() -> Result<Platform, VariantError> {
    match std::env::consts::OS {
        "linux" => Ok(Platform::Linux),
        "macos" => Ok(Platform::MacOs),
        "windows" => Ok(Platform::Windows),
        os => Err(VariantError::UnsupportedHost { os: os.to_owned() }),
    }
}

/// A named build configuration. Every artifact a dependency produces is
/// partitioned by [`Variant::tool_variant_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub toolchain: String,
    pub profile: Profile,
    pub arch: String,
    pub platform: Platform,
}

impl Variant {
    /// Variant for the host architecture and platform.
    ///
    /// # Errors
    /// Returns an error if the host platform is unsupported.
    pub fn host(toolchain: &str, profile: Profile) -> Result<Self, VariantError> {
        Ok(Self {
            toolchain: toolchain.to_owned(),
            profile,
            arch: std::env::consts::ARCH.to_owned(),
            platform: host_platform()?,
        })
    }

    /// `<toolchain>/<profile>/<arch>`, the cache-partitioning key.
    pub fn tool_variant_dir(&self) -> String {
        format!("{}/{}/{}", self.toolchain, self.profile, self.arch)
    }

    /// Directory intermediate objects are written to, relative to a build root.
    pub fn tool_variant_working_dir(&self) -> PathBuf {
        Path::new(&self.tool_variant_dir()).join("working")
    }

    /// Final output directory, relative to the working directory.
    pub fn final_dir(&self) -> PathBuf {
        Path::new("..").join("final")
    }

    /// Absolute directory shared libraries are installed to.
    pub fn abs_final_dir(&self, build_root: &Path) -> PathBuf {
        build_root.join(self.tool_variant_dir()).join("final")
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tool_variant_dir())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error("unsupported host: {os} — no object or library naming conventions are known for it")]
    UnsupportedHost { os: String },
}

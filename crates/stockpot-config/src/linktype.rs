use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a dependency built from source is linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Static,
    Shared,
}

impl LinkType {
    /// Accepted spellings, in the order they are offered on the command line.
    pub const VALUES: &'static [&'static str] = &["static", "shared"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = LinkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "shared" => Ok(Self::Shared),
            other => Err(LinkTypeError::Unknown {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkTypeError {
    #[error("unknown linktype \"{value}\" — expected static or shared")]
    Unknown { value: String },
}

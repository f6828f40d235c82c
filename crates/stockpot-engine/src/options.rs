//! Per-dependency command-line options.

use stockpot_config::LinkType;

/// The option suffixes every location dependency registers, in registration order.
pub const OPTION_SUFFIXES: [&str; 7] = [
    "location",
    "branch",
    "include",
    "sys-include",
    "extra-sub-path",
    "source-path",
    "linktype",
];

/// A single option a dependency asks the host to register.
///
/// Every option takes exactly one string value and is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Long flag name without the leading `--`, e.g. `boost-location`.
    pub name: String,
    pub help: String,
    /// Restricts the accepted values when set.
    pub possible_values: Option<&'static [&'static str]>,
}

/// `<dependency>-<suffix>`, the name a dependency's option is registered under.
pub fn option_name(dependency: &str, suffix: &str) -> String {
    format!("{dependency}-{suffix}")
}

/// Build the seven option specs for `dependency`.
pub fn option_specs(dependency: &str) -> Vec<OptionSpec> {
    OPTION_SUFFIXES
        .iter()
        .map(|suffix| OptionSpec {
            name: option_name(dependency, suffix),
            help: help_text(dependency, suffix),
            possible_values: (*suffix == "linktype").then_some(LinkType::VALUES),
        })
        .collect()
}

fn help_text(dependency: &str, suffix: &str) -> String {
    match suffix {
        "location" => format!("{dependency} location to build against"),
        "branch" => format!("{dependency} branch to build against. Optional"),
        "include" => {
            format!("{dependency} include sub-directory to be added to the include path. Optional")
        }
        "sys-include" => format!(
            "{dependency} include sub-directory to be added to the system include path. Optional"
        ),
        "extra-sub-path" => {
            format!("{dependency} extra (relative) sub path to locate the dependency. Optional")
        }
        "source-path" => format!("{dependency} path to source files. Optional"),
        "linktype" => format!("{dependency} linktype: static (default) or shared. Optional"),
        other => format!("{dependency} {other}"),
    }
}

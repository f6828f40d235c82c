//! Run a recorded build graph with the system C++ toolchain.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};

use stockpot_config::LinkType;
use stockpot_util::fs::{ensure_dir, materialize};
use stockpot_util::process::{display_command, run_command};
use stockpot_variant::Profile;

use crate::error::EngineError;
use crate::graph::{Action, BuildGraph, BuildNode, NodeCounts, NodeId};

/// Compiler and archiver used to execute a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cxx: String,
    pub ar: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            cxx: "c++".to_owned(),
            ar: "ar".to_owned(),
        }
    }
}

impl Toolchain {
    /// Defaults, overridden by the `CXX` and `AR` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cxx: std::env::var("CXX").unwrap_or(defaults.cxx),
            ar: std::env::var("AR").unwrap_or(defaults.ar),
        }
    }
}

/// Summary of an executed graph.
#[derive(Debug)]
pub struct ExecutionResult {
    pub executed: NodeCounts,
    pub duration: std::time::Duration,
}

/// The command that produces `node`, or `None` for nodes executed in-process.
///
/// # Errors
/// Returns an error if the node refers to a node missing from `graph`.
pub fn command_for(
    graph: &BuildGraph,
    node: &BuildNode,
    toolchain: &Toolchain,
) -> Result<Option<Command>, EngineError> {
    match &node.action {
        Action::Compile {
            linktype,
            profile,
            source,
            target,
            includes,
            sys_includes,
        } => {
            let mut cmd = Command::new(&toolchain.cxx);
            cmd.args(profile_flags(*profile));
            if *linktype == LinkType::Shared {
                cmd.arg("-fPIC");
            }
            for include in includes {
                cmd.arg(format!("-I{}", include.display()));
            }
            for include in sys_includes {
                cmd.arg("-isystem").arg(include);
            }
            cmd.arg("-c").arg(source).arg("-o").arg(target);
            Ok(Some(cmd))
        }
        Action::Link {
            linktype,
            objects,
            target,
            ..
        } => {
            let inputs = objects
                .iter()
                .map(|id| input_path(graph, node.id, *id))
                .collect::<Result<Vec<_>, _>>()?;
            let cmd = match linktype {
                LinkType::Static => {
                    let mut cmd = Command::new(&toolchain.ar);
                    cmd.arg("rcs").arg(target).args(&inputs);
                    cmd
                }
                LinkType::Shared => {
                    let mut cmd = Command::new(&toolchain.cxx);
                    cmd.arg("-shared").arg("-o").arg(target).args(&inputs);
                    cmd
                }
            };
            Ok(Some(cmd))
        }
        Action::Install { .. } => Ok(None),
    }
}

fn profile_flags(profile: Profile) -> &'static [&'static str] {
    match profile {
        Profile::Debug => &["-g", "-O0"],
        Profile::Release => &["-O2", "-DNDEBUG"],
    }
}

fn input_path(graph: &BuildGraph, node: NodeId, input: NodeId) -> Result<PathBuf, EngineError> {
    graph
        .output(input)
        .map(Path::to_path_buf)
        .ok_or_else(|| EngineError::DanglingNode {
            node: node.to_string(),
            missing: input.to_string(),
        })
}

/// Execute every node of `graph` in order.
///
/// Stops at the first failing node.
///
/// # Errors
/// Returns an error if a command cannot be spawned or exits unsuccessfully,
/// or if an output directory or installed file cannot be written.
pub fn execute(graph: &BuildGraph, toolchain: &Toolchain) -> Result<ExecutionResult, EngineError> {
    let start = Instant::now();
    let mut executed = NodeCounts::default();

    for node in graph.nodes() {
        if let Some(parent) = node.action.target().parent() {
            ensure_dir(parent)?;
        }

        match &node.action {
            Action::Install { source, target } => {
                let from = input_path(graph, node.id, *source)?;
                debug!(node = %node.id, from = %from.display(), to = %target.display(), "install");
                materialize(&from, target)?;
                executed.install += 1;
            }
            action => {
                let Some(mut cmd) = command_for(graph, node, toolchain)? else {
                    continue;
                };
                let line = display_command(&cmd);
                debug!(node = %node.id, command = %line, "run");
                let output = run_command(&mut cmd)?;
                if !output.success {
                    return Err(EngineError::CommandFailed {
                        command: line,
                        status: output.status(),
                        stderr: output.stderr.trim().to_owned(),
                    });
                }
                match action {
                    Action::Link { .. } => executed.link += 1,
                    _ => executed.compile += 1,
                }
            }
        }
    }

    let duration = start.elapsed();
    info!(
        compiled = executed.compile,
        linked = executed.link,
        installed = executed.install,
        elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        "build graph executed"
    );
    Ok(ExecutionResult { executed, duration })
}

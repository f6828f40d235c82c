//! Running compiler and archiver commands.

use std::process::Command;

use crate::error::UtilError;

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Short description of how the command ended, e.g. `exit code 1`.
    pub fn status(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "killed by signal".to_owned(),
        }
    }
}

/// Run `cmd` to completion, capturing both output streams.
///
/// An unsuccessful exit is reported through [`CommandOutput::success`],
/// not as an error.
///
/// # Errors
/// Returns an error if the program cannot be spawned.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let output = cmd.output().map_err(|source| UtilError::CommandExec {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Render a command as a single shell-like line for logs and error messages.
pub fn display_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

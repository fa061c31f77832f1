//! Running the external formatter and parser as child processes.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ToolCommand;
use crate::error::{Error, Tool};

/// What a finished tool run left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// `stdout` of a successful, non-empty run.
    ///
    /// # Errors
    ///
    /// [`Error::ToolFailed`] for a non-zero exit and [`Error::EmptyOutput`]
    /// when the tool printed nothing.
    pub fn into_stdout(self, tool: Tool) -> Result<String, Error> {
        if !self.success {
            return Err(Error::ToolFailed {
                tool,
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            });
        }
        if self.stdout.trim().is_empty() {
            return Err(Error::EmptyOutput(tool));
        }
        Ok(self.stdout)
    }
}

/// Spawn `command`, feed `input` on stdin and collect both output streams.
///
/// # Errors
///
/// Fails when the process cannot be started, when its pipes break for a
/// reason other than the child exiting early, or when its output is not
/// UTF-8.
#[tracing::instrument(skip(input), fields(command = %command.display(), input_len = input.len()))]
pub async fn run_tool(tool: Tool, command: &ToolCommand, input: &str) -> Result<ToolOutput, Error> {
    let mut child = Command::new(&command.command)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::Spawn {
            tool,
            command: command.display(),
            source,
        })?;

    let stdin = child.stdin.take();
    let feed = async move {
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        match stdin.write_all(input.as_bytes()).await {
            // the tool may stop reading before the input ends
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            result => result,
        }
        // stdin is dropped here, closing the pipe
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|e| Error::Io(tool, e))?;
    fed.map_err(|e| Error::Io(tool, e))?;

    let stdout = String::from_utf8(output.stdout).map_err(|e| Error::InvalidOutput(tool, e))?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::debug!(status = %output.status, stdout_len = stdout.len(), "tool finished");

    Ok(ToolOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn failed_runs_carry_their_stderr() {
        let output = ToolOutput {
            success: false,
            status: "exit status: 1".to_string(),
            stdout: String::new(),
            stderr: "error: boom\n".to_string(),
        };
        let stderr = match output.into_stdout(Tool::Formatter) {
            Err(Error::ToolFailed { stderr, .. }) => Some(stderr),
            Ok(_) | Err(_) => None,
        };
        assert_eq!(stderr.as_deref(), Some("error: boom"));
    }

    #[test]
    fn blank_stdout_is_an_error() {
        let output = ToolOutput {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: " \n".to_string(),
            stderr: String::new(),
        };
        assert!(matches!(
            output.into_stdout(Tool::Formatter),
            Err(Error::EmptyOutput(Tool::Formatter))
        ));
    }

    #[tokio::test]
    async fn missing_programs_fail_to_spawn() {
        let command = ToolCommand::new("znix-definitely-not-installed", &[]);
        let result = run_tool(Tool::Parser, &command, "{ }").await;
        assert!(matches!(result, Err(Error::Spawn { tool: Tool::Parser, .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_is_piped_through() -> Result<(), Error> {
        let output = run_tool(Tool::Formatter, &ToolCommand::new("cat", &[]), "a = 1;\n").await?;
        assert!(output.success);
        assert_eq!(output.stdout, "a = 1;\n");
        Ok(())
    }
}

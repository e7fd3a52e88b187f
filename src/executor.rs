//! Runs a generated command line through the host shell.
//!
//! The command is handed to `sh -c` exactly as the model produced it, with
//! the caller's full privileges. Nothing is sandboxed, retried or timed out.

use anyhow::{anyhow, Result};
use std::io::Write;
use std::process::{Command, Output};
use tracing::{error, info, warn};

/// Captured result of a shell invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<Output> for ExecutionOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running command lines through a shell.
///
/// This abstraction enables testing without spawning real processes.
pub trait ShellRunner: Send + Sync {
    /// Runs `command_line` and captures its output.
    fn run(&self, command_line: &str) -> Result<ExecutionOutput>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Default runner using `sh -c`.
pub struct SystemShellRunner;

impl ShellRunner for SystemShellRunner {
    fn run(&self, command_line: &str) -> Result<ExecutionOutput> {
        let output = Command::new("sh").arg("-c").arg(command_line).output()?;
        Ok(output.into())
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

// =============================================================================
// Executor Implementation
// =============================================================================

/// Executes candidate commands and reports their output.
///
/// # Example
///
/// ```ignore
/// let executor = Executor::new();
/// executor.execute(
///     "jq '.' data.json",
///     &SystemShellRunner,
///     &mut std::io::stdout(),
///     &mut std::io::stderr(),
/// )?;
/// ```
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Runs `command_line` and writes the outcome to the given streams.
    ///
    /// On success stdout and stderr are printed together on `stdout`, followed
    /// by a confirmation line when stderr was empty.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The command line is blank
    /// - The shell cannot be spawned
    /// - The command exits with a non-zero status
    pub fn execute<R, W1, W2>(
        &self,
        command_line: &str,
        runner: &R,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> Result<ExecutionOutput>
    where
        R: ShellRunner,
        W1: Write,
        W2: Write,
    {
        if command_line.trim().is_empty() {
            return Err(anyhow!("No command provided"));
        }

        if let Some(program) = command_line.split_whitespace().next() {
            if !runner.program_exists(program) {
                warn!("'{}' was not found in PATH; the shell may fail to run it", program);
            }
        }

        info!("Executing shell command: {}", command_line);
        let output = runner.run(command_line)?;

        Self::handle_output(&output, stdout, stderr)?;

        Ok(output)
    }

    /// Handles command output, writing to stdout/stderr and checking status.
    fn handle_output<W1: Write, W2: Write>(
        output: &ExecutionOutput,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> Result<()> {
        if output.success() {
            writeln!(stdout, "{}{}", output.stdout, output.stderr)?;
            if output.stderr.is_empty() {
                writeln!(stdout, "\n✅ Command executed successfully")?;
            }
            Ok(())
        } else {
            error!("Command failed with exit code: {:?}", output.exit_code);
            writeln!(stderr, "\n❌ Error executing command: {}", output.stderr)?;
            Err(match output.exit_code {
                Some(code) => anyhow!("Command exited with status {}", code),
                None => anyhow!("Command was terminated by a signal"),
            })
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

use std::io::{self, Write};
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

use crate::builtin::Builtin;
use crate::error::TaskError;
use crate::{ExecutionResult, TaskInvocation};

// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(i32),
    Signaled(Option<i32>),
}

impl From<ExitStatus> for ProcessOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ProcessOutcome::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            ProcessOutcome::Signaled(status.signal())
        }
        #[cfg(not(unix))]
        {
            ProcessOutcome::Signaled(None)
        }
    }
}

/// Spawns external programs on behalf of [`execute_task`].
pub trait CommandRunner {
    /// Run `program` with `arguments` and block until it ends.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the program could not be started.
    fn run(&self, program: &str, arguments: &[String]) -> io::Result<ProcessOutcome>;
}

// Runs real child processes with the caller's stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, arguments: &[String]) -> io::Result<ProcessOutcome> {
        let status = Command::new(program).args(arguments).status()?;
        Ok(status.into())
    }
}

/// Execute one task and report how it ran.
///
/// Built-in tasks run in-process; any other name is spawned through
/// `runner`. A nonzero exit code is returned as data, not as an error.
/// Built-in output goes to standard output.
pub fn execute_task<R: CommandRunner + ?Sized>(
    runner: &R,
    invocation: &TaskInvocation,
) -> ExecutionResult {
    execute_task_with_output(runner, invocation, &mut io::stdout())
}

/// Like [`execute_task`], with built-in output written to `out`.
///
/// Spawned programs still inherit the process streams.
pub fn execute_task_with_output<R: CommandRunner + ?Sized>(
    runner: &R,
    invocation: &TaskInvocation,
    out: &mut dyn Write,
) -> ExecutionResult {
    let name = invocation.name();
    let arguments = invocation.arguments();

    if let Some(builtin) = Builtin::from_name(name) {
        debug!(task = name, "resolved to built-in task");
        return match builtin.run(arguments, out) {
            Ok(code) => ExecutionResult::exited(code),
            Err(e) => ExecutionResult::failed(e),
        };
    }

    debug!(program = name, ?arguments, "spawning external program");
    match runner.run(name, arguments) {
        Ok(ProcessOutcome::Exited(code)) => {
            info!(program = name, code, "program exited");
            ExecutionResult::exited(code)
        }
        Ok(ProcessOutcome::Signaled(signal)) => {
            warn!(program = name, ?signal, "program terminated by signal");
            ExecutionResult::failed(TaskError::Terminated {
                program: name.to_string(),
                signal,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(program = name, "program not found");
            ExecutionResult::failed(TaskError::NotFound {
                program: name.to_string(),
            })
        }
        Err(e) => {
            warn!(program = name, error = %e, "failed to start program");
            ExecutionResult::failed(TaskError::Spawn {
                program: name.to_string(),
                source: e,
            })
        }
    }
}

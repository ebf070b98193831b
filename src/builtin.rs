use std::io::Write;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::TaskError;

// Tasks that run in-process instead of spawning a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    NoOp,
    Sleep,
    Log,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::NoOp, Builtin::Sleep, Builtin::Log];

    /// Look up a built-in by exact, case-sensitive name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Builtin::NoOp => "NoOp",
            Builtin::Sleep => "Sleep",
            Builtin::Log => "Log",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Builtin::NoOp => "do nothing and succeed",
            Builtin::Sleep => "block for the number of seconds given as the first argument",
            Builtin::Log => "print each argument to standard output",
        }
    }

    /// Run the built-in with the given arguments and return its exit code.
    ///
    /// Anything the task prints goes to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not fit the task or `out` fails.
    pub fn run(self, arguments: &[String], out: &mut dyn Write) -> Result<i32, TaskError> {
        match self {
            Builtin::NoOp => {
                debug!(ignored = arguments.len(), "no-op task");
                Ok(0)
            }
            Builtin::Sleep => {
                let seconds = parse_seconds(arguments.first())?;
                info!(seconds, "sleeping");
                thread::sleep(Duration::from_secs(seconds));
                Ok(0)
            }
            Builtin::Log => {
                if arguments.is_empty() {
                    return Err(TaskError::Builtin {
                        task: self.name(),
                        message: "nothing to log".to_string(),
                    });
                }
                for argument in arguments {
                    writeln!(out, "log: {argument}").map_err(|e| TaskError::Builtin {
                        task: self.name(),
                        message: format!("failed to write output: {e}"),
                    })?;
                }
                Ok(0)
            }
        }
    }
}

fn parse_seconds(argument: Option<&String>) -> Result<u64, TaskError> {
    let Some(raw) = argument else {
        return Err(TaskError::ArgumentDecode {
            argument: String::new(),
            message: "expected a number of seconds".to_string(),
        });
    };

    raw.trim()
        .parse::<u64>()
        .map_err(|e| TaskError::ArgumentDecode {
            argument: raw.clone(),
            message: format!("expected a non-negative integer number of seconds: {e}"),
        })
}

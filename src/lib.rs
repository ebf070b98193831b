use serde_json::Value;
use std::io::{self, Write};

mod builtin;
mod error;
mod executor;

pub use builtin::Builtin;
pub use error::TaskError;
pub use executor::{
    execute_task, execute_task_with_output, CommandRunner, ProcessOutcome, SystemRunner,
};

// Argument as received at the boundary, before flattening
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArgument {
    /// Already a flat list of arguments
    List(Vec<String>),
    /// A single token that may carry a JSON-encoded array of strings
    Token(String),
}

impl RawArgument {
    /// Flatten this argument into the strings it stands for.
    ///
    /// A token holding a JSON array of strings expands into those strings in
    /// order. Any other token is kept as a literal.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ArgumentDecode`] if the token is a JSON array that
    /// contains non-string elements.
    pub fn expand(self) -> Result<Vec<String>, TaskError> {
        match self {
            RawArgument::List(items) => Ok(items),
            RawArgument::Token(token) => expand_token(token),
        }
    }

    // The argument's text as given, without decoding
    fn literals(&self) -> Vec<&str> {
        match self {
            RawArgument::List(items) => items.iter().map(String::as_str).collect(),
            RawArgument::Token(token) => vec![token.as_str()],
        }
    }
}

fn expand_token(token: String) -> Result<Vec<String>, TaskError> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&token) else {
        return Ok(vec![token]);
    };

    let mut expanded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::String(s) => expanded.push(s),
            other => {
                return Err(TaskError::ArgumentDecode {
                    argument: token,
                    message: format!("element {index} is not a string: {other}"),
                })
            }
        }
    }
    Ok(expanded)
}

/// Flatten raw arguments into one ordered list.
///
/// # Errors
///
/// Returns the first decoding error encountered.
pub fn expand_arguments<I>(raw: I) -> Result<Vec<String>, TaskError>
where
    I: IntoIterator<Item = RawArgument>,
{
    let mut arguments = Vec::new();
    for argument in raw {
        arguments.extend(argument.expand()?);
    }
    Ok(arguments)
}

// One task to run, resolved at the boundary and never re-interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInvocation {
    name: String,
    arguments: Vec<String>,
}

impl TaskInvocation {
    /// Build an invocation from a task name and raw command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyTaskName`] if the trimmed name is empty, or
    /// [`TaskError::ArgumentDecode`] if an argument cannot be flattened.
    pub fn new<I>(name: &str, raw: I) -> Result<Self, TaskError>
    where
        I: IntoIterator<Item = RawArgument>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(TaskError::EmptyTaskName);
        }

        Ok(Self {
            name: name.to_string(),
            arguments: expand_arguments(raw)?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Write the diagnostic echo of the resolved argument list.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_arguments<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Arguments: {:?}", self.arguments)
    }
}

// Outcome of one execution, reported in two independent stages
#[derive(Debug)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub error: Option<TaskError>,
}

impl ExecutionResult {
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: TaskError) -> Self {
        Self {
            exit_code: None,
            error: Some(error),
        }
    }

    // Exit code is only authoritative when no error was recorded
    #[must_use]
    pub fn authoritative_exit_code(&self) -> Option<i32> {
        if self.error.is_some() {
            None
        } else {
            self.exit_code
        }
    }

    /// Render the report: the error (if any), then the exit code line.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(error) = &self.error {
            writeln!(out, "{error}")?;
        }
        if let Some(code) = self.authoritative_exit_code() {
            writeln!(out, "Exit code: {code}")?;
        }
        Ok(())
    }
}

/// Echo the arguments, execute the task and render the result to `out`.
///
/// # Errors
///
/// Returns an error only if writing the report fails; task failures are
/// carried in the returned [`ExecutionResult`].
pub fn run_and_report<R, W>(
    runner: &R,
    invocation: &TaskInvocation,
    out: &mut W,
) -> io::Result<ExecutionResult>
where
    R: CommandRunner + ?Sized,
    W: Write,
{
    invocation.write_arguments(out)?;
    // Child output shares the stream, so the echo must land first
    out.flush()?;

    let result = execute_task_with_output(runner, invocation, out);
    result.render(out)?;
    out.flush()?;
    Ok(result)
}

/// Decode raw arguments, then run and report like [`run_and_report`].
///
/// A decoding failure is reported as the task's error: the raw tokens are
/// echoed, followed by the error, and nothing is started.
///
/// # Errors
///
/// Returns an error only if writing the report fails.
pub fn run_raw_and_report<R, W>(
    runner: &R,
    name: &str,
    raw: &[RawArgument],
    out: &mut W,
) -> io::Result<ExecutionResult>
where
    R: CommandRunner + ?Sized,
    W: Write,
{
    match TaskInvocation::new(name, raw.iter().cloned()) {
        Ok(invocation) => run_and_report(runner, &invocation, out),
        Err(error) => {
            let tokens: Vec<&str> = raw.iter().flat_map(RawArgument::literals).collect();
            writeln!(out, "Arguments: {tokens:?}")?;

            let result = ExecutionResult::failed(error);
            result.render(out)?;
            out.flush()?;
            Ok(result)
        }
    }
}

use std::io;
use thiserror::Error;

/// Errors reported by the task execution primitive.
///
/// A nonzero exit code is not an error; it is reported as data on
/// [`crate::ExecutionResult`].
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task name was empty or only whitespace.
    #[error("task name is required and cannot be empty")]
    EmptyTaskName,

    /// An argument could not be decoded into the shape the task expects.
    #[error("failed to decode argument '{argument}': {message}")]
    ArgumentDecode { argument: String, message: String },

    /// The executable could not be located.
    #[error("executable not found: {program}")]
    NotFound { program: String },

    /// The executable exists but could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ended without producing an exit code.
    #[error("{program} terminated abnormally{}", describe_signal(.signal))]
    Terminated { program: String, signal: Option<i32> },

    /// A built-in task failed.
    #[error("built-in task {task} failed: {message}")]
    Builtin { task: &'static str, message: String },
}

fn describe_signal(signal: &Option<i32>) -> String {
    match *signal {
        Some(sig) => match signal_name(sig) {
            Some(name) => format!(" (signal {sig}: {name})"),
            None => format!(" (signal {sig})"),
        },
        None => String::new(),
    }
}

#[cfg(unix)]
fn signal_name(sig: i32) -> Option<String> {
    // strsignal returns a pointer into static storage, or null on some libcs
    let ptr = unsafe { libc::strsignal(sig) };
    if ptr.is_null() {
        return None;
    }
    let name = unsafe { std::ffi::CStr::from_ptr(ptr) };
    Some(name.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn signal_name(_sig: i32) -> Option<String> {
    None
}

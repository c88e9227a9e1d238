/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use super::limits::{EXIT_CANNOT_EXECUTE, EXIT_INPUT, EXIT_USAGE};
use super::types::{ExecFailure, Pid};
use miette::Diagnostic;
use thiserror::Error;

/// Process table, launch and wait errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProcessError {
    #[error("No such child process: {0}")]
    #[diagnostic(
        code(process::no_such_child),
        help("The identifier was never issued or has already been reaped.")
    )]
    NoSuchChild(Pid),

    #[error("No child processes")]
    #[diagnostic(
        code(process::no_children),
        help("Waiting for any child requires at least one live process.")
    )]
    NoChildren,

    #[error("Process table exhausted: all {0} identifiers are live")]
    #[diagnostic(
        code(process::exhausted),
        help("Reap terminated processes to make identifiers reusable.")
    )]
    Exhausted(usize),

    #[error("Process table capacity {capacity} is below the minimum of {minimum}")]
    #[diagnostic(
        code(process::invalid_capacity),
        help("Slot 0 is reserved, so a table needs at least one more slot to issue identifiers.")
    )]
    InvalidCapacity { capacity: usize, minimum: usize },

    #[error("Failed to start process {pid}: {reason}")]
    #[diagnostic(
        code(process::launch_failed),
        help("The host refused to create a thread. Check thread and memory limits.")
    )]
    LaunchFailed { pid: Pid, reason: String },
}

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors that end a runner invocation
#[derive(Error, Debug, Diagnostic)]
pub enum RunnerError {
    #[error("{0}")]
    #[diagnostic(code(runner::usage))]
    Usage(String),

    #[error("{0}")]
    #[diagnostic(
        code(runner::input),
        help("Check quoting in the input stream, or raise the -s size budget.")
    )]
    Input(String),

    #[error("{utility}: {failure}")]
    #[diagnostic(code(runner::exec))]
    Exec {
        utility: String,
        failure: ExecFailure,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to read input: {0}")]
    #[diagnostic(code(runner::io))]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    pub fn usage(msg: impl Into<String>) -> Self {
        RunnerError::Usage(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        RunnerError::Input(msg.into())
    }

    /// Process-wide exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Usage(_) => EXIT_USAGE,
            RunnerError::Input(_) | RunnerError::Io(_) => EXIT_INPUT,
            RunnerError::Exec { failure, .. } => failure.exit_code(),
            RunnerError::Process(_) => EXIT_CANNOT_EXECUTE,
        }
    }
}

/// Runner operation result
pub type RunnerResult<T> = Result<T, RunnerError>;

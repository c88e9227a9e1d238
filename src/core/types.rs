/*!
 * Core Types
 * Identifiers and termination statuses shared by the process table and the runner
 */

use super::limits::{
    EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, EXIT_UNCATEGORIZED, SIGNAL_EXIT_OFFSET,
};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Logical process identifier
pub type Pid = u32;

/// Identifier of the controlling thread, never issued by the table
pub const CONTROLLING_PID: Pid = 0;

/// Why an external program image could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecFailure {
    /// No such file on PATH or at the given path
    NotFound,
    /// File exists but may not be executed
    PermissionDenied,
    /// Any other exec error (bad format, resource exhaustion)
    Other,
}

impl ExecFailure {
    /// Classify an error returned while spawning a program
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ExecFailure::NotFound,
            io::ErrorKind::PermissionDenied => ExecFailure::PermissionDenied,
            _ => ExecFailure::Other,
        }
    }

    /// Conventional shell exit code: 127 for not found, 126 otherwise
    #[inline]
    pub fn exit_code(self) -> i32 {
        match self {
            ExecFailure::NotFound => EXIT_NOT_FOUND,
            ExecFailure::PermissionDenied | ExecFailure::Other => EXIT_CANNOT_EXECUTE,
        }
    }
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecFailure::NotFound => f.write_str("No such file or directory"),
            ExecFailure::PermissionDenied => f.write_str("Permission denied"),
            ExecFailure::Other => f.write_str("cannot execute"),
        }
    }
}

/// Termination status recorded for a logical process
///
/// `raw()` gives the POSIX `wait` encoding: `code << 8` for a normal exit,
/// the signal number for an abnormal one. Exec failures encode as the exit
/// code a shell would report, but stay distinguishable through the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Ran to completion with an exit code in 0..=255
    Exited(i32),
    /// Terminated abnormally by the given signal number
    Signaled(i32),
    /// The program image could not be started
    ExecFailed(ExecFailure),
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus::Exited(0);

    /// Status for a routine returning `code`, truncated like a real exit
    #[inline]
    pub fn from_code(code: i32) -> Self {
        ExitStatus::Exited(code & 0xff)
    }

    /// Convert the status of a finished OS child
    pub fn from_std(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::from_code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signaled(signal);
            }
        }
        ExitStatus::Exited(EXIT_UNCATEGORIZED)
    }

    /// POSIX wait-status encoding
    pub fn raw(self) -> i32 {
        match self {
            ExitStatus::Exited(code) => (code & 0xff) << 8,
            ExitStatus::Signaled(signal) => signal & 0x7f,
            ExitStatus::ExecFailed(cause) => (cause.exit_code() & 0xff) << 8,
        }
    }

    #[inline]
    pub fn success(self) -> bool {
        self == ExitStatus::SUCCESS
    }

    /// Exit code if the process ran to completion
    #[inline]
    pub fn code(self) -> Option<i32> {
        match self {
            ExitStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Signal number if the process terminated abnormally
    #[inline]
    pub fn signal(self) -> Option<i32> {
        match self {
            ExitStatus::Signaled(signal) => Some(signal),
            _ => None,
        }
    }

    /// Signal or the reserved 255 exit value
    #[inline]
    pub fn is_abnormal(self) -> bool {
        matches!(
            self,
            ExitStatus::Signaled(_) | ExitStatus::Exited(EXIT_UNCATEGORIZED)
        )
    }

    /// Shell-style exit code for this status
    pub fn exit_code(self) -> i32 {
        match self {
            ExitStatus::Exited(code) => code,
            ExitStatus::Signaled(signal) => SIGNAL_EXIT_OFFSET + signal,
            ExitStatus::ExecFailed(cause) => cause.exit_code(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ExitStatus::Exited(code) => write!(f, "exited with code {}", code),
            ExitStatus::Signaled(signal) => match Signal::try_from(signal) {
                Ok(name) => write!(f, "terminated by {}", name),
                Err(_) => write!(f, "terminated by signal {}", signal),
            },
            ExitStatus::ExecFailed(cause) => write!(f, "exec failed: {}", cause),
        }
    }
}

/*!
 * threadproc Library
 * POSIX-style process semantics on top of threads, and the xargs runner built on them
 */

pub mod builtins;
pub mod core;
pub mod monitoring;
pub mod process;
pub mod runner;

// Re-exports
pub use builtins::Builtins;
pub use crate::core::errors::{ProcessError, ProcessResult, RunnerError, RunnerResult};
pub use crate::core::types::{ExecFailure, ExitStatus, Pid};
pub use monitoring::init_tracing;
pub use process::{
    Command, EnvOverlay, OutputSink, ProcessContext, ProcessManager, ProcessManagerBuilder,
    WaitMode, WaitTarget,
};
pub use runner::{Outcome, RunReport, Runner, RunnerConfig};

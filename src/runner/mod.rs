/*!
 * Runner Module
 * Bounded-concurrency command runner driven by an argument stream
 */

pub mod batch;
pub mod command_line;
pub mod config;
pub mod prompt;
#[allow(clippy::module_inception)]
mod runner;

pub use batch::{Batch, BatchAssembler, BatchLimits};
pub use command_line::{substitute, CommandTemplate};
pub use config::{ReplaceMode, RunnerConfig, RunnerConfigBuilder};
pub use prompt::{Confirm, TerminalConfirm};
pub use runner::{Outcome, RunReport, Runner};

/*!
 * Process Module
 * Thread-backed logical processes: identifiers, environment scopes, launch and reap
 */

pub mod env;
mod executor;
pub mod io;
pub mod launcher;
pub mod manager;
pub mod manager_builder;
pub mod table;
pub mod types;
mod wait;

// Re-export for convenience
pub use env::EnvOverlay;
pub use io::{CaptureBuffer, OutputSink};
pub use launcher::{Command, EntryPoint, ProcessContext, Routine, StdinPolicy};
pub use manager::ProcessManager;
pub use manager_builder::ProcessManagerBuilder;
pub use table::ProcessTable;
pub use types::{Lease, ProcessInfo, ProcessState, SlotState, WaitMode, WaitTarget};

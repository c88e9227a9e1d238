/*!
 * Process Management
 * Launch, wait and environment lookup for logical processes
 */

use super::io::OutputSink;
use super::launcher::{self, Command};
use super::manager_builder::ProcessManagerBuilder;
use super::table::ProcessTable;
use super::types::{ProcessInfo, WaitMode, WaitTarget};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::PROCESS_STACK_SIZE;
use crate::core::types::{ExitStatus, Pid};
use std::sync::Arc;

/// Front door to the process table
///
/// Cloning is cheap and every clone drives the same table, so a routine can
/// be handed a manager to start processes of its own.
#[derive(Debug, Clone)]
pub struct ProcessManager {
    pub(super) table: Arc<ProcessTable>,
    pub(super) stack_size: usize,
    pub(super) stdout: OutputSink,
    pub(super) stderr: OutputSink,
}

impl ProcessManager {
    /// Manager with a 128-slot table writing to the host's stdio
    pub fn new() -> Self {
        Self {
            table: Arc::new(ProcessTable::new()),
            stack_size: PROCESS_STACK_SIZE,
            stdout: OutputSink::Stdout,
            stderr: OutputSink::Stderr,
        }
    }

    /// Create a builder for constructing a ProcessManager
    pub fn builder() -> ProcessManagerBuilder {
        ProcessManagerBuilder::new()
    }

    /// Start `command` as a logical process
    ///
    /// Blocks while every identifier is live. Sinks not set on the command
    /// fall back to the manager's defaults.
    pub fn spawn(&self, command: Command) -> ProcessResult<Pid> {
        launcher::launch(
            &self.table,
            command,
            self.stack_size,
            &self.stdout,
            &self.stderr,
        )
    }

    /// Block until `pid` terminates, then reap it
    pub fn wait(&self, pid: Pid) -> ProcessResult<ExitStatus> {
        self.table
            .wait(WaitTarget::Pid(pid), WaitMode::Blocking)?
            .map(|(_, status)| status)
            .ok_or(ProcessError::NoSuchChild(pid))
    }

    /// Block until any live process terminates, then reap it
    pub fn wait_any(&self) -> ProcessResult<(Pid, ExitStatus)> {
        self.table
            .wait(WaitTarget::Any, WaitMode::Blocking)?
            .ok_or(ProcessError::NoChildren)
    }

    /// Reap a terminated process if one is ready
    pub fn try_wait_any(&self) -> ProcessResult<Option<(Pid, ExitStatus)>> {
        self.table.wait(WaitTarget::Any, WaitMode::NonBlocking)
    }

    /// General form of the wait calls
    pub fn wait_for(
        &self,
        target: WaitTarget,
        mode: WaitMode,
    ) -> ProcessResult<Option<(Pid, ExitStatus)>> {
        self.table.wait(target, mode)
    }

    /// Variable lookup as seen by `pid`
    ///
    /// Identifiers without an overlay, the controlling identifier included,
    /// see the process-wide environment.
    pub fn getenv(&self, pid: Pid, name: &str) -> Option<String> {
        self.table.getenv(pid, name)
    }

    /// Allocated and not yet reaped
    pub fn live(&self) -> usize {
        self.table.live()
    }

    pub fn list_processes(&self) -> Vec<ProcessInfo> {
        self.table.list()
    }

    /// Default standard error of launched processes
    pub fn stderr_sink(&self) -> &OutputSink {
        &self.stderr
    }

    pub fn table(&self) -> &Arc<ProcessTable> {
        &self.table
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

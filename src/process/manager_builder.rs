/*!
 * Process Manager Builder
 * Builder pattern for ProcessManager construction
 */

use super::io::OutputSink;
use super::manager::ProcessManager;
use super::table::ProcessTable;
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::{MIN_TABLE_CAPACITY, PROCESS_STACK_SIZE, PROCESS_TABLE_CAPACITY};
use std::sync::Arc;
use tracing::info;

/// Builder for ProcessManager
#[derive(Debug, Clone)]
pub struct ProcessManagerBuilder {
    capacity: usize,
    stack_size: usize,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl ProcessManagerBuilder {
    /// Create a new ProcessManager builder
    pub fn new() -> Self {
        Self {
            capacity: PROCESS_TABLE_CAPACITY,
            stack_size: PROCESS_STACK_SIZE,
            stdout: OutputSink::Stdout,
            stderr: OutputSink::Stderr,
        }
    }

    /// Table size, slot 0 included (at least 2)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Stack size of every process thread
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Default standard output for launched processes
    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    /// Default standard error for launched processes
    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Build the ProcessManager
    pub fn build(self) -> ProcessResult<ProcessManager> {
        if self.capacity < MIN_TABLE_CAPACITY {
            return Err(ProcessError::InvalidCapacity {
                capacity: self.capacity,
                minimum: MIN_TABLE_CAPACITY,
            });
        }
        info!(
            capacity = self.capacity,
            stack_size = self.stack_size,
            "process manager initialized"
        );
        Ok(ProcessManager {
            table: Arc::new(ProcessTable::with_capacity(self.capacity)),
            stack_size: self.stack_size,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}

impl Default for ProcessManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

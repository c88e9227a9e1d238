/*!
 * Process Types
 * Slot states, leases and snapshots for the process table
 */

use crate::core::types::{ExitStatus, Pid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread::ThreadId;

/// State of one identifier slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Identifier is unused and may be issued
    Free,
    /// Issued, but no thread has bound to it yet
    NotStarted,
    /// Bound to a live thread
    Running(ThreadId),
    /// Routine returned; status is waiting to be reaped
    Terminated(ExitStatus),
}

impl SlotState {
    /// Issued and not yet reaped
    #[inline]
    pub fn is_live(&self) -> bool {
        !matches!(self, SlotState::Free)
    }
}

/// Proof of a specific allocation of an identifier
///
/// Identifiers are recycled, so the launcher's thread binds and terminates
/// through a lease: once the slot has been released and reissued, the old
/// lease no longer matches and its updates are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lease {
    pub pid: Pid,
    pub(crate) generation: u64,
}

impl fmt::Display for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pid)
    }
}

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    NotStarted,
    Running,
    Terminated,
}

/// Snapshot of one live process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExitStatus>,
}

/// Which process a wait call is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    Pid(Pid),
    Any,
}

/// Whether a wait call may suspend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    Blocking,
    NonBlocking,
}

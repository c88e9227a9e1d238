/*!
 * Wait and Reap
 *
 * Collects the status of terminated processes and returns their slots to
 * the free pool. Blocking waits sleep on the table's `exited` condvar, so a
 * waiter costs nothing while its children run.
 */

use super::table::{ProcessTable, TableInner};
use super::types::{SlotState, WaitMode, WaitTarget};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::{ExitStatus, Pid};
use tracing::{debug, trace};

/// Outcome of one readiness check against the table
enum Poll {
    Reaped(Pid, ExitStatus),
    Pending,
}

impl TableInner {
    fn poll(&mut self, target: WaitTarget) -> ProcessResult<Poll> {
        match target {
            WaitTarget::Pid(pid) => {
                if !self.is_issuable(pid) {
                    return Err(ProcessError::NoSuchChild(pid));
                }
                match self.slots[pid as usize].state {
                    SlotState::Free => Err(ProcessError::NoSuchChild(pid)),
                    SlotState::Terminated(status) => {
                        self.vacate(pid);
                        Ok(Poll::Reaped(pid, status))
                    }
                    SlotState::NotStarted | SlotState::Running(_) => Ok(Poll::Pending),
                }
            }
            WaitTarget::Any => {
                if self.live == 0 {
                    return Err(ProcessError::NoChildren);
                }
                // lowest terminated identifier wins when several are ready
                let ready = self.slots.iter().enumerate().skip(1).find_map(
                    |(pid, slot)| match slot.state {
                        SlotState::Terminated(status) => Some((pid as Pid, status)),
                        _ => None,
                    },
                );
                match ready {
                    Some((pid, status)) => {
                        self.vacate(pid);
                        Ok(Poll::Reaped(pid, status))
                    }
                    None => Ok(Poll::Pending),
                }
            }
        }
    }
}

impl ProcessTable {
    /// Reap a terminated process
    ///
    /// Returns `Ok(None)` only in [`WaitMode::NonBlocking`] when the target
    /// exists but has not terminated yet. A reaped identifier becomes free
    /// and may be reissued by the next allocation.
    pub fn wait(
        &self,
        target: WaitTarget,
        mode: WaitMode,
    ) -> ProcessResult<Option<(Pid, ExitStatus)>> {
        let mut inner = self.inner.lock();
        loop {
            match inner.poll(target)? {
                Poll::Reaped(pid, status) => {
                    debug!(pid, %status, live = inner.live, "process reaped");
                    self.released.notify_all();
                    return Ok(Some((pid, status)));
                }
                Poll::Pending if mode == WaitMode::NonBlocking => return Ok(None),
                Poll::Pending => {
                    trace!(?target, "waiting for termination");
                    self.exited.wait(&mut inner);
                }
            }
        }
    }
}

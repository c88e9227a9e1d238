/*!
 * Process Table
 *
 * Fixed-capacity identifier table mapping each logical pid to the thread
 * standing in for it.
 *
 * # Allocation
 *
 * Until the table has issued every slot once, identifiers are handed out in
 * increasing order and never reused. After that the allocator scans forward
 * cyclically for a slot that has been reaped. A slot that is running, or
 * terminated but unreaped, is never reissued. When a full cycle finds
 * nothing, `allocate` sleeps until something is released: if nothing ever
 * is, the caller deadlocks, exactly as a fork loop would on a full table.
 *
 * # Synchronization
 *
 * One mutex guards every slot because the allocation scan reads them all.
 * Terminations and releases each have their own condvar so waiters and
 * exhausted allocators are woken once per event instead of polling.
 */

use super::env::{self, EnvOverlay};
use super::types::{Lease, ProcessInfo, ProcessState, SlotState};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::{MIN_TABLE_CAPACITY, PROCESS_TABLE_CAPACITY};
use crate::core::types::{ExitStatus, Pid, CONTROLLING_PID};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub(super) struct Slot {
    pub(super) state: SlotState,
    pub(super) generation: u64,
    pub(super) name: String,
    pub(super) overlay: Option<Arc<EnvOverlay>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: SlotState::Free,
            generation: 0,
            name: String::new(),
            overlay: None,
        }
    }
}

#[derive(Debug)]
pub(super) struct TableInner {
    pub(super) slots: Box<[Slot]>,
    /// Last identifier handed out
    cursor: Pid,
    /// Set once every identifier has been issued at least once
    wrapped: bool,
    /// Issued and not yet reaped
    pub(super) live: usize,
}

impl TableInner {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            cursor: CONTROLLING_PID,
            wrapped: false,
            live: 0,
        }
    }

    #[inline]
    fn capacity(&self) -> Pid {
        self.slots.len() as Pid
    }

    #[inline]
    pub(super) fn is_issuable(&self, pid: Pid) -> bool {
        pid != CONTROLLING_PID && pid < self.capacity()
    }

    /// Claim the next identifier, or `None` if every slot is live
    fn claim(&mut self) -> Option<Lease> {
        let capacity = self.capacity();

        if !self.wrapped && self.cursor < capacity - 1 {
            self.cursor += 1;
            debug_assert_eq!(self.slots[self.cursor as usize].state, SlotState::Free);
            return Some(self.occupy(self.cursor));
        }

        if !self.wrapped {
            self.cursor = CONTROLLING_PID;
            self.wrapped = true;
        }

        for _ in 1..capacity {
            self.cursor += 1;
            if self.cursor >= capacity {
                self.cursor = 1;
            }
            if self.slots[self.cursor as usize].state == SlotState::Free {
                return Some(self.occupy(self.cursor));
            }
        }
        None
    }

    fn occupy(&mut self, pid: Pid) -> Lease {
        let slot = &mut self.slots[pid as usize];
        slot.state = SlotState::NotStarted;
        slot.generation += 1;
        self.live += 1;
        Lease {
            pid,
            generation: slot.generation,
        }
    }

    #[inline]
    fn slot_for(&mut self, lease: Lease) -> Option<&mut Slot> {
        self.slots
            .get_mut(lease.pid as usize)
            .filter(|slot| slot.generation == lease.generation && slot.state.is_live())
    }

    /// Return a live slot to the free pool, dropping its overlay
    pub(super) fn vacate(&mut self, pid: Pid) -> Option<SlotState> {
        let slot = &mut self.slots[pid as usize];
        if slot.state == SlotState::Free {
            return None;
        }
        let previous = slot.state;
        slot.state = SlotState::Free;
        slot.overlay = None;
        slot.name.clear();
        self.live -= 1;
        Some(previous)
    }
}

/// Identifier table shared by the launcher, its threads and waiters
#[derive(Debug)]
pub struct ProcessTable {
    pub(super) inner: Mutex<TableInner>,
    /// Signaled whenever a slot becomes `Terminated`
    pub(super) exited: Condvar,
    /// Signaled whenever a slot becomes `Free`
    pub(super) released: Condvar,
}

impl ProcessTable {
    /// Create a table with the default 128 slots
    pub fn new() -> Self {
        Self::with_capacity(PROCESS_TABLE_CAPACITY)
    }

    /// Create a table with `capacity` slots (identifiers `1..capacity`)
    ///
    /// # Panics
    ///
    /// If `capacity` is below 2, since no identifier could be issued.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity >= MIN_TABLE_CAPACITY,
            "process table needs at least {} slots",
            MIN_TABLE_CAPACITY
        );
        Self {
            inner: Mutex::new(TableInner::new(capacity)),
            exited: Condvar::new(),
            released: Condvar::new(),
        }
    }

    /// Number of slots, including the reserved slot 0
    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Issued and not yet reaped
    pub fn live(&self) -> usize {
        self.inner.lock().live
    }

    /// Allocate an identifier, sleeping while every slot is live
    pub fn allocate(&self) -> Lease {
        let mut inner = self.inner.lock();
        loop {
            if let Some(lease) = inner.claim() {
                trace!(pid = lease.pid, live = inner.live, "identifier allocated");
                return lease;
            }
            warn!(
                live = inner.live,
                "process table exhausted, waiting for a process to be reaped"
            );
            self.released.wait(&mut inner);
        }
    }

    /// Allocate an identifier without sleeping
    pub fn try_allocate(&self) -> ProcessResult<Lease> {
        let mut inner = self.inner.lock();
        inner
            .claim()
            .ok_or_else(|| ProcessError::Exhausted(inner.slots.len() - 1))
    }

    /// Free `pid` and drop its overlay; releasing a free slot is a no-op
    pub fn release(&self, pid: Pid) {
        let mut inner = self.inner.lock();
        if !inner.is_issuable(pid) {
            return;
        }
        if let Some(previous) = inner.vacate(pid) {
            debug!(pid, ?previous, "identifier released");
            self.released.notify_all();
        }
    }

    /// Attach a thread to a freshly allocated slot
    ///
    /// Only takes effect while the slot is `NotStarted` under the same
    /// lease; returns whether it did.
    pub fn bind(&self, lease: Lease, thread: ThreadId) -> bool {
        let mut inner = self.inner.lock();
        match inner.slot_for(lease) {
            Some(slot) if slot.state == SlotState::NotStarted => {
                slot.state = SlotState::Running(thread);
                trace!(pid = lease.pid, "thread bound");
                true
            }
            _ => false,
        }
    }

    /// Record the termination status and wake every waiter
    ///
    /// A status is recorded at most once per lease. Stale leases (the slot
    /// was released and reissued meanwhile) are ignored.
    pub fn terminate(&self, lease: Lease, status: ExitStatus) -> bool {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.slot_for(lease) else {
            debug!(pid = lease.pid, %status, "termination for a released slot ignored");
            return false;
        };
        match slot.state {
            SlotState::NotStarted | SlotState::Running(_) => {
                slot.state = SlotState::Terminated(status);
                debug!(pid = lease.pid, %status, "process terminated");
                self.exited.notify_all();
                true
            }
            SlotState::Terminated(previous) => {
                debug_assert!(
                    false,
                    "status recorded twice for pid {}: {} then {}",
                    lease.pid, previous, status
                );
                false
            }
            SlotState::Free => unreachable!("slot_for only yields live slots"),
        }
    }

    /// Current state of `pid`
    pub fn state(&self, pid: Pid) -> SlotState {
        let inner = self.inner.lock();
        inner
            .slots
            .get(pid as usize)
            .map(|slot| slot.state)
            .unwrap_or(SlotState::Free)
    }

    /// Name a live slot for listings and logs
    pub fn set_name(&self, pid: Pid, name: impl Into<String>) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.get_mut(pid as usize) {
            if slot.state.is_live() {
                slot.name = name.into();
            }
        }
    }

    // =========================================================================
    // Environment scopes
    // =========================================================================

    /// Install (or replace) the overlay of a live slot
    pub fn set_overlay(&self, pid: Pid, overlay: Arc<EnvOverlay>) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.get_mut(pid as usize) {
            if slot.state.is_live() {
                slot.overlay = Some(overlay);
            }
        }
    }

    /// Overlay installed for `pid`, if any
    pub fn overlay(&self, pid: Pid) -> Option<Arc<EnvOverlay>> {
        let inner = self.inner.lock();
        inner.slots.get(pid as usize).and_then(|slot| slot.overlay.clone())
    }

    /// Look up `name` as seen by `pid`
    pub fn getenv(&self, pid: Pid, name: &str) -> Option<String> {
        let overlay = self.overlay(pid);
        env::lookup(overlay.as_deref(), name)
    }

    /// Full environment as seen by `pid`
    pub fn vars(&self, pid: Pid) -> Vec<(String, String)> {
        let overlay = self.overlay(pid);
        env::merged(overlay.as_deref())
    }

    /// Snapshot of every live slot in identifier order
    pub fn list(&self) -> Vec<ProcessInfo> {
        let inner = self.inner.lock();
        inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(pid, slot)| {
                let (state, status) = match slot.state {
                    SlotState::Free => return None,
                    SlotState::NotStarted => (ProcessState::NotStarted, None),
                    SlotState::Running(_) => (ProcessState::Running, None),
                    SlotState::Terminated(status) => (ProcessState::Terminated, Some(status)),
                };
                Some(ProcessInfo {
                    pid: pid as Pid,
                    name: slot.name.clone(),
                    state,
                    status,
                })
            })
            .collect()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

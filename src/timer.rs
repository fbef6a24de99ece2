//! Deadline queue driven from the application tick.
//!
//! Replaces chained setTimeout calls with explicit, cancellable entries. A
//! timer never fires before its deadline; firing happens on the host's tick
//! cadence, so delivery is best-effort. Dropping the queue abandons pending
//! timers without running them, matching page-navigation semantics.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    deadline: Instant,
    seq: u64,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<Entry<T>>,
    next: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next);
        let seq = self.next;
        self.next += 1;
        self.entries.push(Entry {
            id,
            deadline: now + delay,
            seq,
            payload,
        });
        id
    }

    /// Cancel a pending timer. Cancelling an already-fired or unknown id is a
    /// no-op.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Drain every entry whose deadline has passed, in deadline order (ties
    /// resolve in schedule order).
    pub fn fire_due(&mut self, now: Instant) -> Vec<T> {
        let mut due: Vec<Entry<T>> = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].deadline <= now {
                due.push(self.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|e| (e.deadline, e.seq));
        due.into_iter().map(|e| e.payload).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

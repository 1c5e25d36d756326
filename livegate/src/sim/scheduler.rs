//! Work queues and the clock.
//!
//! The scheduler only stores work; [`super::Simulation`] owns it and runs
//! the callbacks, since every callback needs the whole simulation.

use std::collections::{BTreeMap, VecDeque};

use super::Callback;

/// Clock plus the three queues.
///
/// * ready: runs in the current drain.
/// * inactive: runs after ready has emptied, still in the current timestep.
/// * postponed: keyed by absolute timestep.
pub struct Scheduler {
    now: i64,
    ready: VecDeque<Callback>,
    inactive: VecDeque<Callback>,
    postponed: BTreeMap<i64, Vec<Callback>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("ready", &self.ready.len())
            .field("inactive", &self.inactive.len())
            .field(
                "postponed",
                &self
                    .postponed
                    .iter()
                    .map(|(t, v)| (*t, v.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Scheduler {
    /// Clock at -1: the first tick is timestep 0.
    pub fn new() -> Self {
        Self {
            now: -1,
            ready: VecDeque::new(),
            inactive: VecDeque::new(),
            postponed: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn started(&self) -> bool {
        self.now >= 0
    }

    pub fn push_ready(&mut self, cb: Callback) {
        self.ready.push_back(cb);
    }

    pub fn push_inactive(&mut self, cb: Callback) {
        self.inactive.push_back(cb);
    }

    /// Caller guarantees `at > now`.
    pub fn postpone(&mut self, at: i64, cb: Callback) {
        debug_assert!(at > self.now);
        self.postponed.entry(at).or_default().push(cb);
    }

    /// Advance the clock and release work due at the new timestep.
    pub fn tick(&mut self) -> i64 {
        self.now += 1;
        if let Some(due) = self.postponed.remove(&self.now) {
            self.ready.extend(due);
        }
        self.now
    }

    pub fn pop_ready(&mut self) -> Option<Callback> {
        self.ready.pop_front()
    }

    /// Move all inactive work to ready. Returns false if there was none.
    pub fn promote_inactive(&mut self) -> bool {
        if self.inactive.is_empty() {
            return false;
        }
        self.ready.append(&mut self.inactive);
        true
    }

    /// Callbacks not yet run, across all queues.
    pub fn pending(&self) -> usize {
        self.ready.len() + self.inactive.len() + self.postponed.values().map(Vec::len).sum::<usize>()
    }

    /// Earliest timestep holding postponed work.
    pub fn next_postponed(&self) -> Option<i64> {
        self.postponed.keys().next().copied()
    }
}

//! Bounded run log: a capped, evict-oldest collection of runs.

use crate::state::ExecutionState;
use std::collections::VecDeque;
use stayline_types::{GuestRecord, RunId};
use tracing::debug;

pub const DEFAULT_RUN_CAPACITY: usize = 64;

/// One tracked run: its state plus the record batch it operates on.
#[derive(Clone, Debug)]
pub struct RunEntry {
    pub state: ExecutionState,
    pub records: Vec<GuestRecord>,
}

/// Capped append log of runs. At capacity the oldest run is evicted,
/// whatever state it is in; retention beyond the cap is the caller's
/// concern (export the state first).
#[derive(Debug)]
pub struct RunHistory {
    capacity: usize,
    runs: VecDeque<RunEntry>,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn push(&mut self, entry: RunEntry) {
        if self.runs.len() == self.capacity {
            if let Some(evicted) = self.runs.pop_front() {
                debug!(run_id = %evicted.state.run_id, "Evicted oldest run from history");
            }
        }
        self.runs.push_back(entry);
    }

    pub fn get(&self, run_id: &RunId) -> Option<&RunEntry> {
        self.runs.iter().find(|entry| &entry.state.run_id == run_id)
    }

    pub fn get_mut(&mut self, run_id: &RunId) -> Option<&mut RunEntry> {
        self.runs
            .iter_mut()
            .find(|entry| &entry.state.run_id == run_id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> RunEntry {
        RunEntry {
            state: ExecutionState::new(Vec::new()),
            records: Vec::new(),
        }
    }

    #[test]
    fn capacity_evicts_the_oldest_run() {
        let mut history = RunHistory::new(2);
        let first = make_entry();
        let evicted_id = first.state.run_id.clone();
        history.push(first);
        history.push(make_entry());
        history.push(make_entry());

        assert_eq!(history.len(), 2);
        assert!(history.get(&evicted_id).is_none());
    }

    #[test]
    fn lookup_finds_runs_by_id() {
        let mut history = RunHistory::default();
        let entry = make_entry();
        let run_id = entry.state.run_id.clone();
        history.push(entry);

        assert!(history.get(&run_id).is_some());
        assert!(history.get_mut(&run_id).is_some());
        assert!(history.get(&RunId::generate()).is_none());
    }
}

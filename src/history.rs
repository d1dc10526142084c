use crate::error::{BoilerError, BoilerResult};
use bytemuck::Pod;
use std::collections::VecDeque;

/// Seven days of one reading per minute.
pub const MAX_ENTRIES: usize = 7 * 24 * 60;

/// An insertion-ordered ring of records that evicts its oldest entry once full.
///
/// Reads hand out copies, so a window taken under a shared lock never aliases
/// the live buffer after the lock is released.
#[derive(Debug, Clone)]
pub struct ReadingHistory<State: Pod + Send> {
    entries: VecDeque<State>,
    capacity: usize,
}

impl<State: Pod + Send> ReadingHistory<State> {
    pub fn new(capacity: usize) -> BoilerResult<Self> {
        if capacity == 0 {
            return Err(BoilerError::InvalidConfig(
                "history capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_ENTRIES)),
            capacity,
        })
    }

    /// Appends at the tail, evicting the head when the ring is full.
    #[inline(always)]
    pub fn append(&mut self, state: State) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(state);
    }

    /// Copies the newest `count` entries, oldest first. `None` returns everything.
    pub fn window(&self, count: Option<usize>) -> Vec<State> {
        let len = self.entries.len();
        let take = count.map_or(len, |c| c.min(len));
        self.entries.range(len - take..).copied().collect()
    }

    /// Up to the last `k` entries, oldest first, without allocating.
    pub fn tail(&self, k: usize) -> impl Iterator<Item = &State> {
        let len = self.entries.len();
        self.entries.range(len - k.min(len)..)
    }

    pub fn last(&self) -> Option<&State> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<State: Pod + Send> Extend<State> for ReadingHistory<State> {
    fn extend<I: IntoIterator<Item = State>>(&mut self, iter: I) {
        for state in iter {
            self.append(state);
        }
    }
}

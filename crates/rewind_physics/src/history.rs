//! # Tick History
//!
//! Fixed-capacity ring of `{timestamp, snapshot}` entries, one captured at
//! the start of every tick. The capacity bounds the rollback horizon.
//!
//! ```text
//!   write_index ─┐
//!                ▼
//!   [t6] [t7] [t3] [t4] [t5]      capacity 5, oldest = t3, newest = t7
//! ```
//!
//! Positions in the public API are chronological: 0 is the oldest retained
//! entry, `len() - 1` the newest. Recorders are reused when a slot is
//! overwritten, so steady-state capture does not allocate.

use crate::clock::Timestamp;
use crate::recorder::StateRecorder;

/// One captured tick.
#[derive(Clone, Debug, Default)]
pub struct HistoryEntry {
    /// Tick start time.
    pub timestamp: Timestamp,
    /// Engine state at tick start.
    pub recorder: StateRecorder,
}

/// Ring buffer of history entries.
#[derive(Debug)]
pub struct HistoryRing {
    entries: Vec<HistoryEntry>,
    capacity: usize,
    write_index: usize,
    count: usize,
}

impl HistoryRing {
    /// Creates an empty ring.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            write_index: 0,
            count: 0,
        }
    }

    /// Maximum retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends an entry for `timestamp`, overwriting the oldest at capacity.
    ///
    /// Returns the entry with an emptied recorder for the caller to fill.
    pub fn emplace(&mut self, timestamp: Timestamp) -> &mut HistoryEntry {
        if let Some(newest) = self.newest() {
            if newest.timestamp >= timestamp {
                tracing::warn!(
                    newest = newest.timestamp.as_nanos(),
                    timestamp = timestamp.as_nanos(),
                    "history timestamps out of order"
                );
            }
        }

        let slot = self.write_index;
        if slot == self.entries.len() {
            self.entries.push(HistoryEntry::default());
        }
        self.write_index = (self.write_index + 1) % self.capacity;
        self.count = (self.count + 1).min(self.capacity);

        let entry = &mut self.entries[slot];
        entry.timestamp = timestamp;
        entry.recorder.clear();
        entry
    }

    /// Entry at chronological position `pos`.
    #[must_use]
    pub fn get(&self, pos: usize) -> Option<&HistoryEntry> {
        self.slot_of(pos).map(|slot| &self.entries[slot])
    }

    /// Mutable entry at chronological position `pos`.
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut HistoryEntry> {
        self.slot_of(pos).map(move |slot| &mut self.entries[slot])
    }

    /// Newest entry.
    #[must_use]
    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.count.checked_sub(1).and_then(|pos| self.get(pos))
    }

    /// Oldest entry.
    #[must_use]
    pub fn oldest(&self) -> Option<&HistoryEntry> {
        self.get(0)
    }

    /// Position of the newest entry with `timestamp <= at`, scanning back
    /// from the newest.
    #[must_use]
    pub fn find_at_or_before(&self, at: Timestamp) -> Option<usize> {
        (0..self.count)
            .rev()
            .find(|&pos| self.get(pos).is_some_and(|entry| entry.timestamp <= at))
    }

    /// Entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        (0..self.count).filter_map(move |pos| self.get(pos))
    }

    /// Drops every entry, keeping allocated recorders.
    pub fn clear(&mut self) {
        self.write_index = 0;
        self.count = 0;
    }

    fn slot_of(&self, pos: usize) -> Option<usize> {
        if pos >= self.count {
            return None;
        }
        // The oldest entry sits at write_index once the ring has wrapped.
        let oldest = if self.count == self.capacity { self.write_index } else { 0 };
        Some((oldest + pos) % self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: u64) -> Timestamp {
        Timestamp::from_nanos(n)
    }

    fn fill(ring: &mut HistoryRing, stamps: impl IntoIterator<Item = u64>) {
        for t in stamps {
            ring.emplace(ts(t)).recorder.write_u64(t);
        }
    }

    #[test]
    fn test_emplace_under_capacity() {
        let mut ring = HistoryRing::new(4);
        fill(&mut ring, [10, 20]);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.oldest().unwrap().timestamp, ts(10));
        assert_eq!(ring.newest().unwrap().timestamp, ts(20));
    }

    #[test]
    fn test_overwrites_oldest() {
        let mut ring = HistoryRing::new(3);
        fill(&mut ring, [1, 2, 3, 4, 5]);
        let stamps: Vec<_> = ring.iter().map(|e| e.timestamp.as_nanos()).collect();
        assert_eq!(stamps, vec![3, 4, 5]);

        // Recorders are reused, not appended to.
        let mut rec = ring.newest().unwrap().recorder.clone();
        rec.rewind();
        assert_eq!(rec.read_u64().unwrap(), 5);
        assert!(rec.is_eof());
    }

    #[test]
    fn test_find_at_or_before() {
        let mut ring = HistoryRing::new(4);
        fill(&mut ring, [10, 20, 30, 40, 50]);

        assert_eq!(ring.find_at_or_before(ts(35)), Some(1));
        assert_eq!(ring.get(1).unwrap().timestamp, ts(30));
        assert_eq!(ring.find_at_or_before(ts(50)), Some(3));
        assert_eq!(ring.find_at_or_before(ts(19)), None);
    }

    #[test]
    fn test_get_mut_by_position() {
        let mut ring = HistoryRing::new(2);
        fill(&mut ring, [1, 2, 3]);
        ring.get_mut(0).unwrap().recorder.write_u8(9);
        assert_eq!(ring.get(0).unwrap().timestamp, ts(2));
        assert!(ring.get(2).is_none());
    }
}

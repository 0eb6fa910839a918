//! # Double-Buffered Activation Queue
//!
//! Batches per-body sleep or wake requests so the command stage can issue
//! one collaborator call per buffer instead of one per body.
//!
//! ## Architecture
//!
//! ```text
//!             ┌──────────────────────────────────────┐
//!             │           ActivationQueue            │
//!             │                                      │
//!             │  ┌────────────┐    ┌────────────┐    │
//!   push ───► │  │ Mutex<Vec> │    │ Mutex<Vec> │    │
//!             │  │  buffer 0  │    │  buffer 1  │    │
//!             │  └────────────┘    └────────────┘    │
//!             │  ┌──────────────────────────────┐    │
//!             │  │  AtomicU8 drain flags (0|1)  │    │
//!             │  └──────────────────────────────┘    │
//!             └──────────────────────────────────────┘
//! ```
//!
//! ## Buffer Selection
//!
//! A producer targets buffer 0 unless buffer 0 is draining, in which case it
//! targets buffer 1. The flag is re-read after the chosen buffer's lock is
//! taken; if the buffer started draining in between, the producer releases
//! the lock and selects again. The drainer raises a buffer's flag before it
//! takes that buffer's lock, so a push either lands before the take (and is
//! part of this drain) or observes the flag and moves to the other buffer.
//!
//! Both flags live in one atomic byte. The drainer raises a flag with a
//! compare-exchange that fails while the other flag is up, so a single load
//! can never observe both set.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

const DRAINING_0: u8 = 0b01;
const DRAINING_1: u8 = 0b10;

/// Snapshot of the two per-buffer drain flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainFlags {
    /// Buffer 0 is being drained.
    pub buffer0: bool,
    /// Buffer 1 is being drained.
    pub buffer1: bool,
}

impl DrainFlags {
    const fn from_bits(bits: u8) -> Self {
        Self {
            buffer0: bits & DRAINING_0 != 0,
            buffer1: bits & DRAINING_1 != 0,
        }
    }

    /// Whether both flags are raised at once. Never true for a correct queue.
    #[must_use]
    pub const fn both(self) -> bool {
        self.buffer0 && self.buffer1
    }
}

/// One logical activation queue backed by two alternating buffers.
pub struct ActivationQueue<T> {
    buffers: [Mutex<Vec<T>>; 2],
    flags: AtomicU8,
}

impl<T> ActivationQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a queue with `capacity` reserved in each buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffers: [
                Mutex::new(Vec::with_capacity(capacity)),
                Mutex::new(Vec::with_capacity(capacity)),
            ],
            flags: AtomicU8::new(0),
        }
    }

    /// Current drain flags.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> DrainFlags {
        DrainFlags::from_bits(self.flags.load(Ordering::Acquire))
    }

    /// Appends an item to whichever buffer is not draining.
    ///
    /// Returns the index of the buffer that received the item.
    pub fn push(&self, item: T) -> usize {
        loop {
            let index = usize::from(self.flags().buffer0);
            let mut buffer = self.buffers[index].lock();
            if self.is_draining(index) {
                tracing::trace!(buffer = index, "activation buffer started draining, retrying push");
                continue;
            }
            buffer.push(item);
            return index;
        }
    }

    /// Removes every entry equal to `item` from both buffers.
    ///
    /// Returns the number of entries removed.
    pub fn strip(&self, item: &T) -> usize
    where
        T: PartialEq,
    {
        self.buffers
            .iter()
            .map(|buffer| {
                let mut buffer = buffer.lock();
                let before = buffer.len();
                buffer.retain(|queued| queued != item);
                before - buffer.len()
            })
            .sum()
    }

    /// Whether `item` is queued in either buffer.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.buffers.iter().any(|buffer| buffer.lock().contains(item))
    }

    /// Total queued entries across both buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.iter().map(|buffer| buffer.lock().len()).sum()
    }

    /// Whether both buffers are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every queued entry without processing it.
    pub fn clear(&self) {
        for buffer in &self.buffers {
            buffer.lock().clear();
        }
    }

    /// Drains buffer 0 then buffer 1, handing each non-empty batch to `sink`.
    ///
    /// Each buffer's flag is raised for the whole take-and-process window.
    /// Only the command stage calls this; concurrent drains of one queue are
    /// serialized by the flag exchange.
    pub fn drain_with<F>(&self, mut sink: F) -> usize
    where
        F: FnMut(&[T]),
    {
        let mut drained = 0;
        for index in 0..2 {
            self.raise(index);
            let batch = std::mem::take(&mut *self.buffers[index].lock());
            if !batch.is_empty() {
                drained += batch.len();
                sink(&batch);
            }
            self.lower(index);
        }
        drained
    }

    #[inline]
    fn is_draining(&self, index: usize) -> bool {
        let flags = self.flags();
        if index == 0 {
            flags.buffer0
        } else {
            flags.buffer1
        }
    }

    fn raise(&self, index: usize) {
        let bit = if index == 0 { DRAINING_0 } else { DRAINING_1 };
        while self
            .flags
            .compare_exchange_weak(0, bit, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    fn lower(&self, index: usize) {
        let bit = if index == 0 { DRAINING_0 } else { DRAINING_1 };
        self.flags.fetch_and(!bit, Ordering::AcqRel);
    }
}

impl<T> Default for ActivationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

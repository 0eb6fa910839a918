//! # Handle Allocator
//!
//! Hands out generational handles from a free list.
//!
//! A released slot is reused by the next `acquire`, but with its generation
//! bumped, so any handle still held by a stale command compares unequal to
//! the live one and `is_live` rejects it.

use std::marker::PhantomData;

use crate::handle::Handle;

/// Free-list allocator of generational handles.
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Scenes wrap it in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut bodies: HandleAllocator<BodyHandle> = HandleAllocator::with_capacity(1024);
///
/// let a = bodies.acquire();
/// bodies.release(a);
/// let b = bodies.acquire(); // same slot, next generation
/// assert!(!bodies.is_live(a));
/// ```
pub struct HandleAllocator<H: Handle> {
    /// Current generation per slot.
    generations: Vec<u32>,
    /// Whether the slot is currently handed out.
    live: Vec<bool>,
    /// Free list - indices of released slots.
    free_list: Vec<u32>,
    /// Number of live handles.
    live_count: usize,
    _marker: PhantomData<H>,
}

impl<H: Handle> HandleAllocator<H> {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an allocator with room for `capacity` slots before growing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live_count: 0,
            _marker: PhantomData,
        }
    }

    /// Number of handles currently handed out.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Number of slots ever created (live or free).
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }

    /// Hands out a fresh handle.
    ///
    /// Reuses the most recently released slot when one exists.
    pub fn acquire(&mut self) -> H {
        let index = if let Some(index) = self.free_list.pop() {
            index
        } else {
            let index = u32::try_from(self.generations.len()).unwrap_or(u32::MAX);
            self.generations.push(0);
            self.live.push(false);
            index
        };

        let slot = index as usize;
        self.live[slot] = true;
        self.live_count += 1;
        H::from_parts(index, self.generations[slot])
    }

    /// Returns a handle to the free list.
    ///
    /// Returns `false` if the handle was not live (double release or stale).
    pub fn release(&mut self, handle: H) -> bool {
        if !self.is_live(handle) {
            return false;
        }

        let slot = handle.index() as usize;
        self.live[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_list.push(handle.index());
        self.live_count -= 1;
        true
    }

    /// Checks whether a handle names a currently live slot.
    #[inline]
    #[must_use]
    pub fn is_live(&self, handle: H) -> bool {
        let slot = handle.index() as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == handle.generation()
    }

    /// Iterates over every live handle in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = H> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(slot, _)| H::from_parts(slot as u32, self.generations[slot]))
    }
}

impl<H: Handle> Default for HandleAllocator<H> {
    fn default() -> Self {
        Self::new()
    }
}

//! # Body Set
//!
//! Bitset membership keyed by handle index. Each member slot also records
//! the generation it holds, so a stale handle that shares an index with a
//! member is never mistaken for it.

use crate::handle::BodyHandle;

/// Set of body handles.
///
/// Membership tests are one bit lookup plus one generation compare;
/// insertion order is preserved for iteration. At most one generation per
/// index is a member: inserting a newer generation replaces the older one.
#[derive(Clone, Debug, Default)]
pub struct BodySet {
    /// Bitset: 1 = member. 64 indices per u64.
    bits: Vec<u64>,
    /// Generation held by each member slot, indexed by handle index.
    generations: Vec<u32>,
    /// Members in insertion order.
    handles: Vec<BodyHandle>,
}

impl BodySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: Vec::new(),
            generations: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Adds a handle. Returns `false` if it was already a member.
    ///
    /// A member with the same index but another generation is evicted first.
    pub fn insert(&mut self, handle: BodyHandle) -> bool {
        if handle.is_null() {
            return false;
        }
        let (word, mask) = Self::locate(handle);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let slot = handle.index() as usize;
        if slot >= self.generations.len() {
            self.generations.resize(slot + 1, 0);
        }
        if self.bits[word] & mask != 0 {
            if self.generations[slot] == handle.generation() {
                return false;
            }
            let index = handle.index();
            self.handles.retain(|h| h.index() != index);
        }
        self.bits[word] |= mask;
        self.generations[slot] = handle.generation();
        self.handles.push(handle);
        true
    }

    /// Removes a handle. Returns `true` if it was a member.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }
        let (word, mask) = Self::locate(handle);
        self.bits[word] &= !mask;
        self.handles.retain(|h| *h != handle);
        true
    }

    /// Checks membership.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        if handle.is_null() {
            return false;
        }
        let (word, mask) = Self::locate(handle);
        self.bits.get(word).is_some_and(|w| w & mask != 0)
            && self.generations[handle.index() as usize] == handle.generation()
    }

    /// Members in insertion order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[BodyHandle] {
        &self.handles
    }

    /// Iterates over members.
    pub fn iter(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.handles.iter().copied()
    }

    /// Removes every member, keeping capacity.
    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|w| *w = 0);
        self.handles.clear();
    }

    /// Moves all members out, leaving the set empty.
    pub fn take(&mut self) -> Vec<BodyHandle> {
        self.bits.iter_mut().for_each(|w| *w = 0);
        std::mem::take(&mut self.handles)
    }

    #[inline]
    fn locate(handle: BodyHandle) -> (usize, u64) {
        let index = handle.index() as usize;
        (index / 64, 1u64 << (index % 64))
    }
}

impl Extend<BodyHandle> for BodySet {
    fn extend<I: IntoIterator<Item = BodyHandle>>(&mut self, iter: I) {
        for handle in iter {
            self.insert(handle);
        }
    }
}

impl FromIterator<BodyHandle> for BodySet {
    fn from_iter<I: IntoIterator<Item = BodyHandle>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = BodySet::new();
        let a = BodyHandle::new(5, 0);
        let b = BodyHandle::new(130, 2);

        assert!(set.insert(a));
        assert!(set.insert(b));
        assert!(!set.insert(a));

        assert!(set.contains(a));
        assert!(set.contains(b));
        assert!(!set.contains(BodyHandle::new(6, 0)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_stale_generation_not_member() {
        let mut set = BodySet::new();
        set.insert(BodyHandle::new(1, 0));
        assert!(!set.contains(BodyHandle::new(1, 1)));
        assert!(!set.remove(BodyHandle::new(1, 1)));
        assert!(set.contains(BodyHandle::new(1, 0)));
    }

    #[test]
    fn test_newer_generation_replaces_member() {
        let mut set = BodySet::new();
        let old = BodyHandle::new(3, 0);
        let new = BodyHandle::new(3, 1);

        assert!(set.insert(old));
        assert!(set.insert(new));
        assert!(!set.insert(new));

        assert!(set.contains(new));
        assert!(!set.contains(old));
        assert_eq!(set.as_slice(), &[new]);
    }

    #[test]
    fn test_remove_and_take() {
        let mut set: BodySet = [BodyHandle::new(0, 0), BodyHandle::new(64, 0)]
            .into_iter()
            .collect();
        assert!(set.remove(BodyHandle::new(0, 0)));
        assert!(!set.remove(BodyHandle::new(0, 0)));

        let taken = set.take();
        assert_eq!(taken, vec![BodyHandle::new(64, 0)]);
        assert!(set.is_empty());
        assert!(!set.contains(BodyHandle::new(64, 0)));
    }
}

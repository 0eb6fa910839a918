//! # Handles
//!
//! Every object the scheduler refers to is named by a 64-bit handle:
//! - Lower 32 bits: slot index in the owner's table
//! - Upper 32 bits: generation counter for detecting stale references

use bytemuck::{Pod, Zeroable};

/// Common shape of every generational handle.
pub trait Handle: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    /// Builds a handle from its parts.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Slot index portion.
    fn index(self) -> u32;

    /// Generation portion.
    fn generation(self) -> u32;
}

macro_rules! generational_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
        pub struct $name(u64);

        impl $name {
            /// Creates a handle from index and generation.
            #[inline]
            #[must_use]
            pub const fn new(index: u32, generation: u32) -> Self {
                Self(((generation as u64) << 32) | (index as u64))
            }

            /// Returns the index portion of the handle.
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.0 as u32
            }

            /// Returns the generation portion of the handle.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                (self.0 >> 32) as u32
            }

            /// Raw 64-bit value.
            #[inline]
            #[must_use]
            pub const fn to_bits(self) -> u64 {
                self.0
            }

            /// Rebuilds a handle from its raw value.
            #[inline]
            #[must_use]
            pub const fn from_bits(bits: u64) -> Self {
                Self(bits)
            }

            /// Null/invalid handle.
            pub const NULL: Self = Self(u64::MAX);

            /// Checks if this handle is null/invalid.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == u64::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }

        impl Handle for $name {
            #[inline]
            fn from_parts(index: u32, generation: u32) -> Self {
                Self::new(index, generation)
            }

            #[inline]
            fn index(self) -> u32 {
                $name::index(self)
            }

            #[inline]
            fn generation(self) -> u32 {
                $name::generation(self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_null() {
                    write!(f, "{}(null)", stringify!($name))
                } else {
                    write!(f, "{}({}v{})", stringify!($name), self.index(), self.generation())
                }
            }
        }
    };
}

generational_handle! {
    /// Names one rigid body in the collaborator's body table.
    BodyHandle
}

generational_handle! {
    /// Names one constraint registered with a scene.
    ConstraintId
}

/// Names one collider attached to a body. Chosen by the caller, unique per body.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct ColliderId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let h = BodyHandle::new(12345, 67890);
        assert_eq!(h.index(), 12345);
        assert_eq!(h.generation(), 67890);
        assert_eq!(BodyHandle::from_bits(h.to_bits()), h);
    }

    #[test]
    fn test_null_handle() {
        assert!(BodyHandle::default().is_null());
        assert!(!BodyHandle::new(0, 0).is_null());
        assert_eq!(format!("{}", ConstraintId::NULL), "ConstraintId(null)");
    }

    #[test]
    fn test_generation_distinguishes_reuse() {
        let old = BodyHandle::new(3, 0);
        let new = BodyHandle::new(3, 1);
        assert_ne!(old, new);
        assert_eq!(old.index(), new.index());
    }
}

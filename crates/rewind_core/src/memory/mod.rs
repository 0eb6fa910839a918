//! # Memory Management
//!
//! Free-list handle allocation. Slots are recycled, generations are not.

pub mod allocator;

pub use allocator::HandleAllocator;

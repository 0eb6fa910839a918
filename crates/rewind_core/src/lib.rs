//! # Rewind Core
//!
//! Identity and hand-off primitives used by the physics scheduler:
//!
//! - **Handles**: `{index, generation}` identifiers validated before every use
//! - **Allocators**: free-list allocation of handles with generation bumps
//! - **Body sets**: bitset membership for the rolled-back body set
//! - **Activation queues**: double-buffered sleep/wake batching
//!
//! ## Architecture
//!
//! ```text
//!   any thread                         command stage thread
//!   ──────────                         ────────────────────
//!   push(handle) ──► [buffer 0] ──┐
//!                    [buffer 1] ──┼──► drain_with(|batch| engine.activate(batch))
//!   strip(handle) ─► both buffers ┘
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body_set;
pub mod handle;
pub mod memory;
pub mod sync;

pub use body_set::BodySet;
pub use handle::{BodyHandle, ColliderId, ConstraintId, Handle};
pub use memory::HandleAllocator;
pub use sync::{ActivationQueue, DrainFlags};

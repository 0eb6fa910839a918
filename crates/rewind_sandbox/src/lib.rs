//! # Rewind Sandbox
//!
//! A small deterministic rigid-body engine behind the `PhysicsEngine` trait.
//! It exists so the scheduler can be exercised end to end: the same saved
//! state plus the same command stream always produces the same bits.
//!
//! ```text
//!   PhysicsScene ──► SandboxEngine
//!                      ├─ slot table (generational handles)
//!                      ├─ semi-implicit Euler
//!                      └─ bounding-sphere contacts
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body;
pub mod collision;
pub mod engine;

pub use body::SandboxBody;
pub use engine::{SandboxConstraint, SandboxEngine, GRAVITY, SANDBOX_STATE_SCHEMA};

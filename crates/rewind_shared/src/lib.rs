//! # Rewind Shared
//!
//! Plain-data types used by every crate in the workspace.
//!
//! Everything here is `Pod`, so it can be written straight into a
//! state recorder, and `serde`-enabled, so it can appear in config files.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{COMMAND_QUEUE_RESERVE, HISTORY_CAPACITY, MAX_TICKS_PER_FRAME, NANOS_PER_SECOND, TICK_RATE};
pub use math::{Quaternion, Transform, Vec3};

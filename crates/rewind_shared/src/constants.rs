//! # Simulation Constants
//!
//! Defaults for the fixed-timestep scheduler. Scenes can override all of
//! them through `SceneConfig`.

// =============================================================================
// TIMING
// =============================================================================

/// Tick rate (simulation updates per second)
pub const TICK_RATE: u32 = 60;

/// Maximum ticks executed in one `step()` call before owed time is dropped.
pub const MAX_TICKS_PER_FRAME: u32 = 16;

/// Nanoseconds per second
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

// =============================================================================
// HISTORY
// =============================================================================

/// Number of ticks retained for rollback (one second at the default rate).
pub const HISTORY_CAPACITY: usize = 60;

/// Soft reserve for the generic command queue.
pub const COMMAND_QUEUE_RESERVE: usize = 1024;

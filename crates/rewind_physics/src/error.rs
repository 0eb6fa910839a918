//! # Physics Scheduler Error Types
//!
//! All errors that can occur in the scheduling subsystem. Only the rollback
//! boolean crosses the public boundary by default; the typed variants are
//! there for callers that want the reason.

use rewind_core::BodyHandle;
use thiserror::Error;

use crate::clock::Timestamp;

/// Errors raised while reading a state recorder.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderError {
    /// A read asked for more bytes than remain after the cursor.
    #[error("unexpected end of recorder: requested {requested} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes requested.
        requested: usize,
        /// Bytes left after the cursor.
        remaining: usize,
    },
}

/// Errors raised while decoding a captured snapshot.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// The buffer does not start with the snapshot magic.
    #[error("invalid snapshot magic")]
    BadMagic,

    /// The snapshot was written by another codec version.
    #[error("unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version stored in the header.
        found: u16,
        /// Version this build writes.
        expected: u16,
    },

    /// The engine's state layout changed since the snapshot was taken.
    #[error("engine state schema {found} does not match {expected}")]
    SchemaMismatch {
        /// Schema stored in the header.
        found: u32,
        /// Schema reported by the engine now.
        expected: u32,
    },

    /// Header length disagrees with the bytes present.
    #[error("snapshot truncated: header declares {declared} payload bytes, {present} present")]
    Truncated {
        /// Declared payload length.
        declared: u64,
        /// Bytes actually present.
        present: u64,
    },

    /// Payload does not match its checksum.
    #[error("snapshot checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC32 stored in the header.
        stored: u32,
        /// CRC32 of the payload as read.
        computed: u32,
    },

    /// The engine refused the payload (body table no longer matches).
    #[error("engine rejected snapshot payload")]
    Rejected,

    /// Low-level read failure.
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

/// Why a rollback or visit did not happen.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackError {
    /// No retained history entry is old enough, or the newest eligible
    /// entry is the current tick boundary.
    #[error("rollback target {requested:?} is outside the retained history window")]
    OutOfWindow {
        /// Requested timestamp.
        requested: Timestamp,
    },

    /// Replay found a history entry that does not line up with the
    /// scheduler's next tick.
    #[error("history desync during replay: expected tick at {expected:?}, found {found:?}")]
    Desync {
        /// Next tick time the scheduler expected.
        expected: Timestamp,
        /// Timestamp of the history entry found instead.
        found: Timestamp,
    },

    /// Restoring the history entry failed.
    #[error("failed to restore history entry: {0}")]
    Restore(#[from] SnapshotError),

    /// Template scenes keep no history.
    #[error("template scenes cannot roll back")]
    TemplateScene,
}

/// Errors raised while loading scene configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for `SceneConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for the subsystem.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// A command referenced a body that no longer exists. Flushes report
    /// one per skipped command through `FlushReport::errors`.
    #[error("invalid body handle: {0}")]
    InvalidHandle(BodyHandle),

    /// Snapshot encode/decode failure.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Rollback failure.
    #[error(transparent)]
    Rollback(#[from] RollbackError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result type for rollback operations.
pub type RollbackResult<T> = Result<T, RollbackError>;

/// Result type for the subsystem.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

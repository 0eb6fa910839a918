//! # Snapshot Codec
//!
//! Frames the engine's opaque state bytes with a versioned header so a
//! snapshot written by one build is never silently fed to another.
//!
//! ## Layout
//!
//! ```text
//!   offset  size  field
//!   ──────  ────  ─────────────────────────────
//!        0     4  magic "RWND"
//!        4     2  format version (LE)
//!        6     4  engine state schema (LE)
//!       10     8  payload length (LE)
//!       18     4  payload CRC32 (LE)
//!       22     n  payload (engine save_state)
//! ```
//!
//! Every entry point leaves the recorder rewound.

use crate::engine::PhysicsEngine;
use crate::error::{SnapshotError, SnapshotResult};
use crate::recorder::StateRecorder;

/// Magic bytes identifying a snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"RWND";

/// Current snapshot framing version.
pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
pub const HEADER_LEN: usize = 22;

/// Decoded snapshot header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Framing version.
    pub format_version: u16,
    /// Engine state schema.
    pub schema: u32,
    /// Payload length in bytes.
    pub payload_len: u64,
    /// CRC32 of the payload.
    pub checksum: u32,
}

impl SnapshotHeader {
    /// Serializes to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(SNAPSHOT_MAGIC);
        bytes[4..6].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.schema.to_le_bytes());
        bytes[10..18].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes[18..22].copy_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Parses and checks the magic.
    pub fn from_bytes(bytes: &[u8]) -> SnapshotResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::Truncated {
                declared: HEADER_LEN as u64,
                present: bytes.len() as u64,
            });
        }
        if &bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::BadMagic);
        }

        let mut u16_bytes = [0u8; 2];
        let mut u32_bytes = [0u8; 4];
        let mut u64_bytes = [0u8; 8];

        u16_bytes.copy_from_slice(&bytes[4..6]);
        let format_version = u16::from_le_bytes(u16_bytes);
        u32_bytes.copy_from_slice(&bytes[6..10]);
        let schema = u32::from_le_bytes(u32_bytes);
        u64_bytes.copy_from_slice(&bytes[10..18]);
        let payload_len = u64::from_le_bytes(u64_bytes);
        u32_bytes.copy_from_slice(&bytes[18..22]);
        let checksum = u32::from_le_bytes(u32_bytes);

        Ok(Self {
            format_version,
            schema,
            payload_len,
            checksum,
        })
    }
}

/// Captures the engine's full state into `recorder`, replacing its contents.
pub fn capture_state<E: PhysicsEngine + ?Sized>(engine: &E, recorder: &mut StateRecorder) {
    recorder.clear();
    recorder.write_bytes(&[0u8; HEADER_LEN]);
    engine.save_state(recorder);

    let payload = &recorder.as_bytes()[HEADER_LEN..];
    let header = SnapshotHeader {
        format_version: SNAPSHOT_FORMAT_VERSION,
        schema: engine.state_schema(),
        payload_len: payload.len() as u64,
        checksum: crc32fast::hash(payload),
    };
    // The placeholder was written above, so the patch is in bounds.
    if recorder.patch(0, &header.to_bytes()).is_err() {
        tracing::warn!("snapshot header patch out of bounds");
    }
    recorder.rewind();
}

/// Checks a captured snapshot without touching any engine.
pub fn validate(recorder: &StateRecorder, expected_schema: u32) -> SnapshotResult<SnapshotHeader> {
    let bytes = recorder.as_bytes();
    let header = SnapshotHeader::from_bytes(bytes)?;

    if header.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: header.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }
    if header.schema != expected_schema {
        return Err(SnapshotError::SchemaMismatch {
            found: header.schema,
            expected: expected_schema,
        });
    }

    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != header.payload_len {
        return Err(SnapshotError::Truncated {
            declared: header.payload_len,
            present: payload.len() as u64,
        });
    }

    let computed = crc32fast::hash(payload);
    if computed != header.checksum {
        return Err(SnapshotError::ChecksumMismatch {
            stored: header.checksum,
            computed,
        });
    }
    Ok(header)
}

/// Restores the engine from a snapshot captured by `capture_state`.
///
/// The engine is only touched once the header and checksum check out.
pub fn restore_state<E: PhysicsEngine + ?Sized>(
    engine: &mut E,
    recorder: &mut StateRecorder,
) -> SnapshotResult<()> {
    let result = restore_inner(engine, recorder);
    recorder.rewind();
    result
}

fn restore_inner<E: PhysicsEngine + ?Sized>(engine: &mut E, recorder: &mut StateRecorder) -> SnapshotResult<()> {
    validate(recorder, engine.state_schema())?;
    recorder.rewind();
    recorder.read_slice(HEADER_LEN)?;
    if engine.restore_state(recorder) {
        Ok(())
    } else {
        Err(SnapshotError::Rejected)
    }
}

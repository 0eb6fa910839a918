//! # Rewind Physics
//!
//! Deferred physics command queue and deterministic rollback scheduler.
//!
//! Any thread may request body mutations at any time. They are queued (or,
//! when nothing is stepping, applied directly) and flushed into the engine
//! at the start of each fixed-timestep tick, so the engine sees one
//! deterministic, replayable timeline. Every tick is snapshotted, which lets
//! a scene roll back, replay a chosen set of bodies, and merge the result
//! into an otherwise untouched present.
//!
//! ## Architecture
//!
//! ```text
//!   producers (any thread)
//!        │ Command / sleep / wake
//!        ▼
//!   ┌──────────────────┐   flush    ┌──────────────────┐
//!   │ CommandStage     │ ─────────► │ PhysicsEngine    │
//!   │  queue + 2x2 buf │            │ (external)       │
//!   └──────────────────┘            └──────────────────┘
//!                                     ▲   │ save_state
//!   ┌──────────────────┐   restore    │   ▼
//!   │ StepScheduler    │ ◄──────────  HistoryRing
//!   │  fixed timestep  │              (snapshot per tick)
//!   └──────────────────┘
//!        │ publish
//!        ▼
//!   TransformSink (scene graph)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rewind_physics::{BodySettings, PhysicsScene, SceneConfig};
//!
//! let scene = PhysicsScene::new(engine, SceneConfig::default())?;
//! let body = scene.register_body();
//! scene.create_body(body, BodySettings::dynamic(Vec3::Z), owner_id);
//! scene.add_body(body);
//! scene.run_frame();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body;
pub mod clock;
pub mod command;
pub mod config;
pub mod constraint;
pub mod contact;
pub mod engine;
pub mod error;
pub mod frame;
pub mod history;
pub mod queue;
pub mod recorder;
pub mod scene;
pub mod scheduler;
pub mod snapshot;
pub mod stage;
pub mod writeback;

#[cfg(test)]
mod test_support;

pub use body::{
    Activation, BodySettings, BodyState, ColliderDesc, ColliderShape, MotionType, ObjectLayer, PhysicsMaterial,
};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use command::Command;
pub use config::SceneConfig;
pub use constraint::{ConstraintSettings, Limit, VehicleSettings, WheelSettings};
pub use contact::{
    combine_materials, ContactEvent, ContactEventKind, ContactListener, ContactManifold, ContactPair, ContactSettings,
    MaterialCombiner,
};
pub use engine::PhysicsEngine;
pub use error::{
    ConfigError, PhysicsError, PhysicsResult, RecorderError, RollbackError, RollbackResult, SnapshotError,
    SnapshotResult,
};
pub use frame::run_frames;
pub use history::{HistoryEntry, HistoryRing};
pub use recorder::StateRecorder;
pub use scene::{PhysicsScene, RolledBackState, SceneBuilder};
pub use scheduler::{SchedulerStats, StepScheduler};
pub use stage::{CommandStage, StageStats};
pub use writeback::{NullSink, RecordingSink, TransformSink};

pub use rewind_core::{BodyHandle, ColliderId, ConstraintId};
pub use rewind_shared::{Quaternion, Transform, Vec3};

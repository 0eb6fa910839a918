//! # Physics Scene
//!
//! Per-scene owner of the engine, the command stage, the history ring and
//! the step scheduler. Everything the rest of the program does to physics
//! goes through here.
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ any thread:  create_body / add_force / wake_body_from_sleep ...  │
//! │              └─ queued, or applied directly when nothing is      │
//! │                 stepping and nothing is queued                   │
//! │                                                                  │
//! │ step():      step lock ─► engine lock                            │
//! │              while a tick is due:                                │
//! │                ├─ capture history entry at next_tick             │
//! │                ├─ flush command stage                            │
//! │                ├─ engine.step (skipped when all bodies sleep)    │
//! │                └─ next_tick += tick                              │
//! │              publish awake bodies to the transform sink          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Order
//!
//! Step lock, then the rolled-back set, then the engine, then queue locks.
//! Producers never take the step lock and only `try_lock` the engine.

mod commands;
mod rollback;
mod tick;

pub use rollback::RolledBackState;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use rewind_core::{BodyHandle, BodySet, ConstraintId, HandleAllocator};

use crate::body::Activation;
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::command::Command;
use crate::config::SceneConfig;
use crate::contact::{ContactChannel, ContactEvent};
use crate::engine::PhysicsEngine;
use crate::error::ConfigError;
use crate::history::HistoryRing;
use crate::recorder::StateRecorder;
use crate::scheduler::{SchedulerStats, StepScheduler};
use crate::stage::{Applied, CommandStage, DispatchContext, StageStats};
use crate::writeback::{NullSink, TransformSink};

/// Set while `step()` runs its tick loop.
const STEPPING: u8 = 1 << 0;
/// Set while a rollback or visit holds a past state.
const ROLLING_BACK: u8 = 1 << 1;

/// Raises a scene flag for the lifetime of the guard.
struct FlagGuard<'a> {
    flags: &'a AtomicU8,
    bit: u8,
}

impl<'a> FlagGuard<'a> {
    fn raise(flags: &'a AtomicU8, bit: u8) -> Self {
        flags.fetch_or(bit, Ordering::AcqRel);
        Self { flags, bit }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flags.fetch_and(!self.bit, Ordering::AcqRel);
    }
}

/// State only touched under the step lock.
struct StepState {
    scheduler: StepScheduler,
    history: HistoryRing,
    /// Undo record for rollback and visit.
    scratch: StateRecorder,
    /// Reused handle buffer for write-back.
    active: Vec<BodyHandle>,
}

/// Builds a [`PhysicsScene`].
pub struct SceneBuilder<E: PhysicsEngine> {
    engine: E,
    config: SceneConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TransformSink>,
}

impl<E: PhysicsEngine> SceneBuilder<E> {
    /// Starts from defaults: 60 Hz, wall clock, no transform sink.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: SceneConfig::default(),
            clock: Arc::new(SystemClock::new()),
            sink: Arc::new(NullSink),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: SceneConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the transform sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn TransformSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validates the configuration and builds the scene. The first tick
    /// starts at the clock's current time.
    pub fn build(self) -> Result<PhysicsScene<E>, ConfigError> {
        self.config.validate()?;
        let config = self.config;
        let start = self.clock.now();
        let scheduler = StepScheduler::new(config.tick_duration(), config.max_ticks_per_frame, start);
        let tick_seconds = scheduler.tick_seconds();

        tracing::debug!(
            tick_rate = config.tick_rate_hz,
            history = config.history_capacity,
            template = config.is_template,
            "physics scene created"
        );

        Ok(PhysicsScene {
            engine: Mutex::new(self.engine),
            stage: CommandStage::new(config.command_queue_reserve),
            step: Mutex::new(StepState {
                scheduler,
                history: HistoryRing::new(config.history_capacity),
                scratch: StateRecorder::new(),
                active: Vec::new(),
            }),
            flags: AtomicU8::new(0),
            bodies: Mutex::new(HandleAllocator::new()),
            constraints: Mutex::new(HandleAllocator::new()),
            rolled_back: Mutex::new(BodySet::new()),
            dynamic_bodies: Mutex::new(BodySet::new()),
            sleep_by_default: AtomicBool::new(config.bodies_sleep_by_default),
            collision_steps: config.collision_steps(),
            tick_seconds,
            contacts: ContactChannel::new(),
            clock: self.clock,
            sink: self.sink,
            config,
        })
    }
}

/// One simulated scene.
pub struct PhysicsScene<E: PhysicsEngine> {
    config: SceneConfig,
    engine: Mutex<E>,
    stage: CommandStage,
    step: Mutex<StepState>,
    flags: AtomicU8,
    bodies: Mutex<HandleAllocator<BodyHandle>>,
    constraints: Mutex<HandleAllocator<ConstraintId>>,
    rolled_back: Mutex<BodySet>,
    dynamic_bodies: Mutex<BodySet>,
    sleep_by_default: AtomicBool,
    collision_steps: u32,
    tick_seconds: f32,
    contacts: ContactChannel,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TransformSink>,
}

impl<E: PhysicsEngine> PhysicsScene<E> {
    /// Scene with the given configuration, wall clock and no sink.
    pub fn new(engine: E, config: SceneConfig) -> Result<Self, ConfigError> {
        SceneBuilder::new(engine).config(config).build()
    }

    /// Starts a builder.
    pub fn builder(engine: E) -> SceneBuilder<E> {
        SceneBuilder::new(engine)
    }

    /// Configuration the scene was built with.
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Reserves a body handle. The body itself is created by `create_body`.
    pub fn register_body(&self) -> BodyHandle {
        self.bodies.lock().acquire()
    }

    /// Releases a body handle. Queue `destroy_body` first.
    pub fn deregister_body(&self, handle: BodyHandle) {
        if !self.bodies.lock().release(handle) {
            tracing::debug!(%handle, "deregistering unknown body handle");
        }
        self.dynamic_bodies.lock().remove(handle);
        self.rolled_back.lock().remove(handle);
    }

    /// Whether `handle` is currently registered.
    #[must_use]
    pub fn is_registered(&self, handle: BodyHandle) -> bool {
        self.bodies.lock().is_live(handle)
    }

    /// Reserves a constraint id for `add_constraint`.
    pub fn register_constraint(&self) -> ConstraintId {
        self.constraints.lock().acquire()
    }

    // -------------------------------------------------------------------------
    // Queuing policy
    // -------------------------------------------------------------------------

    /// Whether mutations must go through the queue right now.
    #[must_use]
    pub fn should_queue_commands(&self) -> bool {
        self.flags.load(Ordering::Acquire) != 0
            || self.config.is_template
            || self.config.always_defer_commands
            || self.stage.has_pending()
    }

    /// Whether a rollback or visit is in progress.
    #[must_use]
    pub fn is_rolling_back(&self) -> bool {
        self.flags.load(Ordering::Acquire) & ROLLING_BACK != 0
    }

    /// `AddBody` leaves new bodies asleep from now on.
    pub fn enable_bodies_sleep_by_default(&self) {
        self.sleep_by_default.store(true, Ordering::Release);
    }

    /// `AddBody` wakes new bodies from now on.
    pub fn disable_bodies_sleep_by_default(&self) {
        self.sleep_by_default.store(false, Ordering::Release);
    }

    fn dispatch_context(&self) -> DispatchContext {
        DispatchContext {
            kinematic_delta_time: self.tick_seconds,
            default_activation: if self.sleep_by_default.load(Ordering::Acquire) {
                Activation::DontActivate
            } else {
                Activation::Activate
            },
        }
    }

    /// Applies a command now if that is safe, otherwise queues it.
    ///
    /// The typed methods below all end here.
    pub fn submit_command(&self, command: Command) {
        if self.should_queue_commands() {
            self.stage.enqueue(command);
            return;
        }
        let Some(mut engine) = self.engine.try_lock() else {
            self.stage.enqueue(command);
            return;
        };
        // Re-checked under the engine lock so a direct call never overtakes
        // a queued one.
        if self.should_queue_commands() {
            drop(engine);
            self.stage.enqueue(command);
            return;
        }
        let ctx = self.dispatch_context();
        if let Applied::ConstraintRemoved(id) = self.stage.apply_immediate(&mut *engine, command, &ctx) {
            self.constraints.lock().release(id);
        }
    }

    fn release_constraints(&self, removed: &[ConstraintId]) {
        if removed.is_empty() {
            return;
        }
        let mut constraints = self.constraints.lock();
        for &id in removed {
            constraints.release(id);
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Ticks executed on the live timeline.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.step.lock().scheduler.tick_count()
    }

    /// Start time of the next tick.
    #[must_use]
    pub fn next_tick_time(&self) -> Timestamp {
        self.step.lock().scheduler.next_tick()
    }

    /// Tick duration in nanoseconds.
    #[must_use]
    pub fn tick_duration(&self) -> u64 {
        self.config.tick_duration()
    }

    /// Retained history entries.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.step.lock().history.len()
    }

    /// Timestamps of the retained history, oldest first.
    #[must_use]
    pub fn history_timestamps(&self) -> Vec<Timestamp> {
        self.step.lock().history.iter().map(|entry| entry.timestamp).collect()
    }

    /// Generic commands waiting for the next flush.
    #[must_use]
    pub fn pending_command_count(&self) -> usize {
        self.stage.pending()
    }

    /// Command stage counters.
    #[must_use]
    pub fn stats(&self) -> StageStats {
        self.stage.stats()
    }

    /// Scheduler counters.
    #[must_use]
    pub fn scheduler_stats(&self) -> SchedulerStats {
        *self.step.lock().scheduler.stats()
    }

    /// Contact events from live ticks.
    #[must_use]
    pub fn contact_events(&self) -> Receiver<ContactEvent> {
        self.contacts.receiver()
    }

    /// Read access to the engine. Blocks while a tick is running.
    pub fn with_engine<R>(&self, read: impl FnOnce(&E) -> R) -> R {
        read(&self.engine.lock())
    }

    /// Whether `handle` appears in any pending command or activation buffer.
    #[must_use]
    pub fn has_pending_references(&self, handle: BodyHandle) -> bool {
        self.stage.references(handle)
    }
}

//! # Command Stage
//!
//! The schedulable unit that applies deferred mutations to the engine. Runs
//! as the direct predecessor of every simulation tick.
//!
//! ## Flush Order
//!
//! ```text
//!   1. generic queue        (insertion order, one engine call per command)
//!   2. sleep buffer 0, 1    (one deactivate_bodies call per buffer)
//!      put-all-to-sleep     (flag, checked once)
//!   3. wake buffer 0, 1     (one activate_bodies call per buffer)
//!      wake-all             (flag, checked once)
//! ```
//!
//! Destroy and remove commands strip their handle from all four activation
//! buffers, and from later commands in the queue, before the engine sees
//! them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rewind_core::{ActivationQueue, BodyHandle, ConstraintId};

use crate::body::Activation;
use crate::command::Command;
use crate::engine::PhysicsEngine;
use crate::error::PhysicsError;
use crate::queue::CommandQueue;

/// Per-flush parameters supplied by the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DispatchContext {
    /// Delta time handed to kinematic moves.
    pub kinematic_delta_time: f32,
    /// Wake state used by `AddBody`.
    pub default_activation: Activation,
}

/// Result of applying one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The engine was called.
    Done,
    /// Nothing changed (already in the requested state).
    Unchanged,
    /// A constraint was removed; its id may be recycled.
    ConstraintRemoved(ConstraintId),
    /// The command named a body the engine does not hold.
    InvalidHandle(BodyHandle),
    /// The command referenced something else that no longer exists.
    Skipped,
}

impl Applied {
    /// Whether the command was dropped without reaching the engine.
    #[must_use]
    pub const fn is_skipped(self) -> bool {
        matches!(self, Self::InvalidHandle(_) | Self::Skipped)
    }
}

/// Counts of what the stage has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Commands applied during flushes.
    pub flushed: u64,
    /// Commands applied directly, bypassing the queue.
    pub immediate: u64,
    /// Commands skipped for invalid handles.
    pub skipped: u64,
    /// Batched activation calls issued.
    pub activation_batches: u64,
    /// Flushes run.
    pub flushes: u64,
}

#[derive(Default)]
struct AtomicStats {
    flushed: AtomicU64,
    immediate: AtomicU64,
    skipped: AtomicU64,
    activation_batches: AtomicU64,
    flushes: AtomicU64,
}

/// What one flush did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Commands applied.
    pub applied: usize,
    /// Commands skipped.
    pub skipped: usize,
    /// Bodies put to sleep through the sleep buffers.
    pub slept: usize,
    /// Bodies woken through the wake buffers.
    pub woken: usize,
    /// Constraint ids freed by this flush.
    pub removed_constraints: Vec<ConstraintId>,
    /// Bodies named by skipped commands, in dispatch order.
    pub invalid_handles: Vec<BodyHandle>,
}

impl FlushReport {
    /// The skipped commands as errors.
    pub fn errors(&self) -> impl Iterator<Item = PhysicsError> + '_ {
        self.invalid_handles.iter().copied().map(PhysicsError::InvalidHandle)
    }
}

/// Generic queue plus the sleep and wake activation queues of one scene.
pub struct CommandStage {
    queue: CommandQueue,
    sleep: ActivationQueue<BodyHandle>,
    wake: ActivationQueue<BodyHandle>,
    put_all_to_sleep: AtomicBool,
    wake_all: AtomicBool,
    spare: Mutex<Vec<Command>>,
    stats: AtomicStats,
}

impl CommandStage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(queue_reserve: usize) -> Self {
        Self {
            queue: CommandQueue::new(queue_reserve),
            sleep: ActivationQueue::new(),
            wake: ActivationQueue::new(),
            put_all_to_sleep: AtomicBool::new(false),
            wake_all: AtomicBool::new(false),
            spare: Mutex::new(Vec::with_capacity(queue_reserve)),
            stats: AtomicStats::default(),
        }
    }

    /// Queues a command. Retiring commands strip the activation buffers now
    /// and again at dispatch.
    pub fn enqueue(&self, command: Command) {
        if let Some(handle) = command.retired_body() {
            self.strip_activation(handle);
        }
        self.queue.push(command);
    }

    /// Queues a sleep request for one body.
    pub fn request_sleep(&self, handle: BodyHandle) {
        self.sleep.push(handle);
    }

    /// Queues a wake request for one body.
    pub fn request_wake(&self, handle: BodyHandle) {
        self.wake.push(handle);
    }

    /// Puts every body to sleep at the next flush.
    pub fn request_sleep_all(&self) {
        self.put_all_to_sleep.store(true, Ordering::Release);
    }

    /// Wakes every body at the next flush.
    pub fn request_wake_all(&self) {
        self.wake_all.store(true, Ordering::Release);
    }

    /// Whether generic commands are waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of queued generic commands.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The generic queue.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// The sleep activation queue.
    #[must_use]
    pub const fn sleep_queue(&self) -> &ActivationQueue<BodyHandle> {
        &self.sleep
    }

    /// The wake activation queue.
    #[must_use]
    pub const fn wake_queue(&self) -> &ActivationQueue<BodyHandle> {
        &self.wake
    }

    /// Whether `handle` appears in the generic queue or any activation buffer.
    #[must_use]
    pub fn references(&self, handle: BodyHandle) -> bool {
        self.queue.references(handle) || self.sleep.contains(&handle) || self.wake.contains(&handle)
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> StageStats {
        StageStats {
            flushed: self.stats.flushed.load(Ordering::Relaxed),
            immediate: self.stats.immediate.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            activation_batches: self.stats.activation_batches.load(Ordering::Relaxed),
            flushes: self.stats.flushes.load(Ordering::Relaxed),
        }
    }

    /// Applies every pending mutation to the engine.
    ///
    /// Only the thread holding the engine lock for a tick calls this.
    pub fn flush<E: PhysicsEngine + ?Sized>(&self, engine: &mut E, ctx: &DispatchContext) -> FlushReport {
        let mut report = FlushReport::default();

        let spare = std::mem::take(&mut *self.spare.lock());
        let mut commands = self.queue.take(spare);
        for command in commands.drain(..) {
            match self.apply(engine, command, ctx) {
                Applied::InvalidHandle(handle) => {
                    report.skipped += 1;
                    report.invalid_handles.push(handle);
                }
                Applied::Skipped => report.skipped += 1,
                Applied::ConstraintRemoved(id) => {
                    report.applied += 1;
                    report.removed_constraints.push(id);
                }
                Applied::Done | Applied::Unchanged => report.applied += 1,
            }
        }
        *self.spare.lock() = commands;

        let mut batches = 0u64;
        report.slept = self.sleep.drain_with(|batch| {
            engine.deactivate_bodies(batch);
            batches += 1;
        });
        if self.put_all_to_sleep.swap(false, Ordering::AcqRel) {
            engine.deactivate_all_bodies();
        }

        report.woken = self.wake.drain_with(|batch| {
            engine.activate_bodies(batch);
            batches += 1;
        });
        if self.wake_all.swap(false, Ordering::AcqRel) {
            engine.activate_all_bodies();
        }

        self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        self.stats.flushed.fetch_add(report.applied as u64, Ordering::Relaxed);
        self.stats.skipped.fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.stats.activation_batches.fetch_add(batches, Ordering::Relaxed);
        report
    }

    /// Applies one command outside a flush.
    pub fn apply_immediate<E: PhysicsEngine + ?Sized>(
        &self,
        engine: &mut E,
        command: Command,
        ctx: &DispatchContext,
    ) -> Applied {
        let applied = self.apply(engine, command, ctx);
        if applied.is_skipped() {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.immediate.fetch_add(1, Ordering::Relaxed);
        }
        applied
    }

    fn strip_activation(&self, handle: BodyHandle) -> usize {
        self.sleep.strip(&handle) + self.wake.strip(&handle)
    }

    fn skip(command: &Command, handle: BodyHandle) -> Applied {
        let error = PhysicsError::InvalidHandle(handle);
        tracing::debug!(kind = command.kind(), %error, "skipping command");
        Applied::InvalidHandle(handle)
    }

    #[allow(clippy::too_many_lines)]
    fn apply<E: PhysicsEngine + ?Sized>(&self, engine: &mut E, command: Command, ctx: &DispatchContext) -> Applied {
        // Creation targets must be free; everything else must exist.
        match &command {
            Command::CreateBody { handle, .. } => {
                if handle.is_null() || engine.contains_body(*handle) {
                    return Self::skip(&command, *handle);
                }
            }
            Command::CloneBody { handle, source, .. } => {
                if handle.is_null() || engine.contains_body(*handle) {
                    return Self::skip(&command, *handle);
                }
                if !engine.contains_body(*source) {
                    return Self::skip(&command, *source);
                }
            }
            Command::AddConstraint { bodies, .. } => {
                if !engine.contains_body(bodies[0]) {
                    return Self::skip(&command, bodies[0]);
                }
                if !bodies[1].is_null() && !engine.contains_body(bodies[1]) {
                    return Self::skip(&command, bodies[1]);
                }
            }
            Command::RemoveConstraint { .. } => {}
            other => {
                if let Some(handle) = other.body() {
                    if !engine.contains_body(handle) {
                        return Self::skip(&command, handle);
                    }
                }
            }
        }

        match command {
            Command::CreateBody {
                handle,
                settings,
                user_data,
            } => engine.create_body(handle, &settings, user_data),
            Command::CloneBody {
                handle,
                source,
                user_data,
            } => match engine.body_settings(source) {
                Some(settings) => engine.create_body(handle, &settings, user_data),
                None => return Self::skip(&Command::CloneBody { handle, source, user_data }, source),
            },
            Command::DestroyBody { handle } => {
                self.strip_activation(handle);
                self.queue.strip(handle);
                engine.destroy_body(handle);
            }
            Command::AddBody { handle } => {
                if engine.is_in_simulation(handle) {
                    return Applied::Unchanged;
                }
                engine.add_bodies_to_simulation(&[handle], ctx.default_activation);
            }
            Command::RemoveBody { handle } => {
                self.strip_activation(handle);
                self.queue.strip(handle);
                if !engine.is_in_simulation(handle) {
                    return Applied::Unchanged;
                }
                engine.remove_bodies_from_simulation(&[handle]);
            }
            Command::SetPosition {
                handle,
                position,
                activation,
            } => engine.set_position(handle, position, activation),
            Command::SetRotation {
                handle,
                rotation,
                activation,
            } => engine.set_rotation(handle, rotation, activation),
            Command::SetTransform {
                handle,
                position,
                rotation,
                activation,
            } => {
                let unchanged = engine
                    .body_state(handle)
                    .is_some_and(|state| state.position == position && state.rotation == rotation);
                if unchanged {
                    return Applied::Unchanged;
                }
                engine.set_position_and_rotation(handle, position, rotation, activation);
            }
            Command::MoveKinematicPosition { handle, position } => {
                let Some(state) = engine.body_state(handle) else {
                    return Applied::InvalidHandle(handle);
                };
                engine.move_kinematic(handle, position, state.rotation, ctx.kinematic_delta_time);
            }
            Command::MoveKinematicRotation { handle, rotation } => {
                let Some(state) = engine.body_state(handle) else {
                    return Applied::InvalidHandle(handle);
                };
                engine.move_kinematic(handle, state.position, rotation, ctx.kinematic_delta_time);
            }
            Command::MoveKinematic {
                handle,
                position,
                rotation,
            } => engine.move_kinematic(handle, position, rotation, ctx.kinematic_delta_time),
            Command::SetLinearVelocity { handle, velocity } => engine.set_linear_velocity(handle, velocity),
            Command::SetAngularVelocity { handle, velocity } => engine.set_angular_velocity(handle, velocity),
            Command::SetVelocities {
                handle,
                linear,
                angular,
            } => engine.set_linear_and_angular_velocity(handle, linear, angular),
            Command::SetMotionType {
                handle,
                motion_type,
                activation,
            } => engine.set_motion_type(handle, motion_type, activation),
            Command::SetObjectLayer { handle, layer } => engine.set_object_layer(handle, layer),
            Command::AddCollider {
                handle,
                collider,
                desc,
            } => engine.add_collider(handle, collider, &desc),
            Command::ReplaceCollider {
                handle,
                collider,
                desc,
            } => engine.replace_collider(handle, collider, &desc),
            Command::RemoveCollider { handle, collider } => engine.remove_collider(handle, collider),
            Command::SetColliderTransform {
                handle,
                collider,
                transform,
            } => engine.set_collider_transform(handle, collider, transform),
            Command::AddConstraint {
                constraint,
                bodies,
                settings,
            } => engine.add_constraint(constraint, bodies, &settings),
            Command::AddVehicleConstraint {
                constraint,
                body,
                settings,
            } => engine.add_vehicle_constraint(constraint, body, &settings),
            Command::RemoveConstraint { constraint } => {
                if engine.remove_constraint(constraint) {
                    return Applied::ConstraintRemoved(constraint);
                }
                tracing::debug!(%constraint, "skipping removal of unknown constraint");
                return Applied::Skipped;
            }
            Command::AddImpulse { handle, impulse } => engine.add_impulse(handle, impulse),
            Command::AddImpulseAt {
                handle,
                impulse,
                location,
            } => engine.add_impulse_at(handle, impulse, location),
            Command::AddForce { handle, force } => engine.add_force(handle, force),
            Command::AddForceAt {
                handle,
                force,
                location,
            } => engine.add_force_at(handle, force, location),
            Command::AddTorque { handle, torque } => engine.add_torque(handle, torque),
            Command::AddAngularImpulse { handle, impulse } => engine.add_angular_impulse(handle, impulse),
        }
        Applied::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySettings;
    use crate::test_support::RecordingEngine;
    use rewind_shared::Vec3;

    fn ctx() -> DispatchContext {
        DispatchContext {
            kinematic_delta_time: 1.0 / 60.0,
            default_activation: Activation::Activate,
        }
    }

    fn create(handle: BodyHandle) -> Command {
        Command::CreateBody {
            handle,
            settings: Box::new(BodySettings::dynamic(Vec3::ZERO)),
            user_data: 1,
        }
    }

    #[test]
    fn test_flush_applies_in_order_then_activation() {
        let stage = CommandStage::new(16);
        let mut engine = RecordingEngine::default();
        let a = BodyHandle::new(0, 0);

        stage.request_wake(a);
        stage.enqueue(create(a));
        stage.enqueue(Command::AddBody { handle: a });
        stage.enqueue(Command::AddForce {
            handle: a,
            force: Vec3::Z,
        });

        let report = stage.flush(&mut engine, &ctx());
        assert_eq!(report.applied, 3);
        assert_eq!(report.woken, 1);
        assert_eq!(
            engine.calls,
            vec!["create_body", "add_bodies_to_simulation", "add_force", "activate_bodies"]
        );
        assert!(!stage.has_pending());
    }

    #[test]
    fn test_invalid_handle_skipped() {
        let stage = CommandStage::new(16);
        let mut engine = RecordingEngine::default();

        stage.enqueue(Command::AddImpulse {
            handle: BodyHandle::new(9, 0),
            impulse: Vec3::Z,
        });
        let report = stage.flush(&mut engine, &ctx());

        assert_eq!(report.skipped, 1);
        assert_eq!(report.invalid_handles, vec![BodyHandle::new(9, 0)]);
        assert!(matches!(
            report.errors().next(),
            Some(PhysicsError::InvalidHandle(handle)) if handle == BodyHandle::new(9, 0)
        ));
        assert!(engine.calls.is_empty());
        assert_eq!(stage.stats().skipped, 1);
    }

    #[test]
    fn test_destroy_strips_activation_and_later_commands() {
        let stage = CommandStage::new(16);
        let mut engine = RecordingEngine::default();
        let a = BodyHandle::new(0, 0);
        stage.enqueue(create(a));
        stage.flush(&mut engine, &ctx());

        stage.request_sleep(a);
        stage.request_wake(a);
        stage.enqueue(Command::DestroyBody { handle: a });
        assert!(!stage.sleep_queue().contains(&a));
        assert!(!stage.wake_queue().contains(&a));

        // Requests made after the destroy was queued are stripped at dispatch.
        stage.request_wake(a);
        stage.flush(&mut engine, &ctx());
        assert!(!stage.references(a));
        assert!(!engine.calls.iter().any(|c| *c == "activate_bodies"));
    }

    #[test]
    fn test_sleep_all_and_wake_all_flags() {
        let stage = CommandStage::new(4);
        let mut engine = RecordingEngine::default();
        stage.request_sleep_all();
        stage.request_wake_all();

        stage.flush(&mut engine, &ctx());
        assert_eq!(engine.calls, vec!["deactivate_all_bodies", "activate_all_bodies"]);

        engine.calls.clear();
        stage.flush(&mut engine, &ctx());
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn test_set_transform_skips_when_unchanged() {
        let stage = CommandStage::new(4);
        let mut engine = RecordingEngine::default();
        let a = BodyHandle::new(0, 0);
        stage.enqueue(create(a));
        stage.flush(&mut engine, &ctx());
        engine.calls.clear();

        let same = Command::SetTransform {
            handle: a,
            position: Vec3::ZERO,
            rotation: rewind_shared::Quaternion::IDENTITY,
            activation: Activation::Activate,
        };
        assert_eq!(stage.apply_immediate(&mut engine, same, &ctx()), Applied::Unchanged);
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn test_remove_constraint_reports_id() {
        let stage = CommandStage::new(4);
        let mut engine = RecordingEngine::default();
        let a = BodyHandle::new(0, 0);
        let id = ConstraintId::new(0, 0);
        stage.enqueue(create(a));
        stage.enqueue(Command::AddConstraint {
            constraint: id,
            bodies: [a, BodyHandle::NULL],
            settings: Box::new(crate::constraint::ConstraintSettings::Fixed {
                auto_detect_point: true,
                point: Vec3::ZERO,
            }),
        });
        stage.enqueue(Command::RemoveConstraint { constraint: id });
        stage.enqueue(Command::RemoveConstraint { constraint: id });

        let report = stage.flush(&mut engine, &ctx());
        assert_eq!(report.removed_constraints, vec![id]);
        assert_eq!(report.skipped, 1);
    }
}

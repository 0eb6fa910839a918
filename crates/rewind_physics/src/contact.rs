//! # Contact Forwarding
//!
//! The engine reports contacts through a `ContactListener` during its step.
//! The scene's listener combines the two surface materials, which the engine
//! then uses for the response, and forwards each contact as a `ContactEvent`
//! over a channel so gameplay code can consume them off the step thread.
//!
//! ```text
//!   engine.step() ──► ContactForwarder ──► crossbeam channel ──► consumers
//!                        │
//!                        └─► ContactSettings (friction, restitution)
//! ```

use crossbeam_channel::{Receiver, Sender};
use rewind_core::BodyHandle;
use rewind_shared::Vec3;

use crate::body::PhysicsMaterial;

/// The two bodies in a contact plus what the listener needs to know about them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPair {
    /// Bodies in contact.
    pub bodies: [BodyHandle; 2],
    /// Owner ids of the bodies (0 = none).
    pub user_data: [u64; 2],
    /// Materials of the touching colliders.
    pub materials: [PhysicsMaterial; 2],
}

/// Contact geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactManifold {
    /// World-space contact points.
    pub points: Vec<Vec3>,
    /// World-space normal, pointing from body 1 to body 2.
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
}

/// Response parameters chosen by the listener.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactSettings {
    /// Combined friction.
    pub combined_friction: f32,
    /// Combined restitution.
    pub combined_restitution: f32,
}

/// Friction is the geometric mean, restitution the maximum.
#[must_use]
pub fn combine_materials(a: PhysicsMaterial, b: PhysicsMaterial) -> ContactSettings {
    ContactSettings {
        combined_friction: (a.friction * b.friction).sqrt(),
        combined_restitution: a.restitution.max(b.restitution),
    }
}

/// Receives contact callbacks from the engine's step.
pub trait ContactListener {
    /// A new contact started this step.
    fn on_contact_added(&mut self, pair: &ContactPair, manifold: &ContactManifold)
        -> ContactSettings;

    /// A contact from the previous step is still touching.
    fn on_contact_persisted(
        &mut self,
        pair: &ContactPair,
        manifold: &ContactManifold,
    ) -> ContactSettings;

    /// A contact from the previous step ended.
    fn on_contact_removed(&mut self, bodies: [BodyHandle; 2]);
}

/// Listener that only combines materials. For engines stepped outside a scene.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialCombiner;

impl ContactListener for MaterialCombiner {
    fn on_contact_added(&mut self, pair: &ContactPair, _: &ContactManifold) -> ContactSettings {
        combine_materials(pair.materials[0], pair.materials[1])
    }

    fn on_contact_persisted(&mut self, pair: &ContactPair, _: &ContactManifold) -> ContactSettings {
        combine_materials(pair.materials[0], pair.materials[1])
    }

    fn on_contact_removed(&mut self, _: [BodyHandle; 2]) {}
}

/// What happened to a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactEventKind {
    /// Contact started.
    Added,
    /// Contact continued.
    Persisted,
    /// Contact ended.
    Removed,
}

/// A contact reported to consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactEvent {
    /// What happened.
    pub kind: ContactEventKind,
    /// Bodies involved.
    pub bodies: [BodyHandle; 2],
    /// Owner ids of the bodies, `None` when the body has no owner.
    pub owners: [Option<u64>; 2],
    /// Contact points (empty for `Removed`).
    pub points: Vec<Vec3>,
    /// Contact normal (zero for `Removed`).
    pub normal: Vec3,
    /// Scheduler tick the contact occurred in.
    pub tick: u64,
}

/// Owns the contact event channel of one scene.
#[derive(Debug)]
pub struct ContactChannel {
    sender: Sender<ContactEvent>,
    receiver: Receiver<ContactEvent>,
}

impl ContactChannel {
    /// Creates an unbounded channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// A receiver for consumers. Every clone sees each event once in total.
    #[must_use]
    pub fn receiver(&self) -> Receiver<ContactEvent> {
        self.receiver.clone()
    }

    /// Builds the listener handed to the engine for one tick.
    #[must_use]
    pub fn forwarder(&self, tick: u64, suppressed: bool, forward_persisted: bool) -> ContactForwarder<'_> {
        ContactForwarder {
            sender: &self.sender,
            tick,
            suppressed,
            forward_persisted,
            forwarded: 0,
        }
    }
}

impl Default for ContactChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that combines materials and forwards events for one tick.
pub struct ContactForwarder<'a> {
    sender: &'a Sender<ContactEvent>,
    tick: u64,
    suppressed: bool,
    forward_persisted: bool,
    forwarded: usize,
}

impl ContactForwarder<'_> {
    /// Events sent so far.
    #[must_use]
    pub const fn forwarded(&self) -> usize {
        self.forwarded
    }

    fn send(&mut self, event: ContactEvent) {
        if self.suppressed {
            return;
        }
        // The scene keeps a receiver alive, so send only fails during teardown.
        if self.sender.send(event).is_ok() {
            self.forwarded += 1;
        }
    }

    fn owners(pair: &ContactPair) -> [Option<u64>; 2] {
        pair.user_data.map(|owner| (owner != 0).then_some(owner))
    }
}

impl ContactListener for ContactForwarder<'_> {
    fn on_contact_added(&mut self, pair: &ContactPair, manifold: &ContactManifold) -> ContactSettings {
        self.send(ContactEvent {
            kind: ContactEventKind::Added,
            bodies: pair.bodies,
            owners: Self::owners(pair),
            points: manifold.points.clone(),
            normal: manifold.normal,
            tick: self.tick,
        });
        combine_materials(pair.materials[0], pair.materials[1])
    }

    fn on_contact_persisted(
        &mut self,
        pair: &ContactPair,
        manifold: &ContactManifold,
    ) -> ContactSettings {
        if self.forward_persisted {
            self.send(ContactEvent {
                kind: ContactEventKind::Persisted,
                bodies: pair.bodies,
                owners: Self::owners(pair),
                points: manifold.points.clone(),
                normal: manifold.normal,
                tick: self.tick,
            });
        }
        combine_materials(pair.materials[0], pair.materials[1])
    }

    fn on_contact_removed(&mut self, bodies: [BodyHandle; 2]) {
        self.send(ContactEvent {
            kind: ContactEventKind::Removed,
            bodies,
            owners: [None, None],
            points: Vec::new(),
            normal: Vec3::ZERO,
            tick: self.tick,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> ContactPair {
        ContactPair {
            bodies: [BodyHandle::new(0, 0), BodyHandle::new(1, 0)],
            user_data: [7, 0],
            materials: [PhysicsMaterial::new(0.25, 0.1), PhysicsMaterial::new(1.0, 0.8)],
        }
    }

    #[test]
    fn test_combine_materials() {
        let settings = combine_materials(PhysicsMaterial::new(0.25, 0.1), PhysicsMaterial::new(1.0, 0.8));
        assert!((settings.combined_friction - 0.5).abs() < 1e-6);
        assert_eq!(settings.combined_restitution, 0.8);
    }

    #[test]
    fn test_forwarder_sends_added_and_removed() {
        let channel = ContactChannel::new();
        let rx = channel.receiver();
        let mut forwarder = channel.forwarder(3, false, false);

        let manifold = ContactManifold {
            points: vec![Vec3::Z],
            normal: Vec3::Z,
            penetration: 0.01,
        };
        forwarder.on_contact_added(&pair(), &manifold);
        forwarder.on_contact_persisted(&pair(), &manifold);
        forwarder.on_contact_removed(pair().bodies);
        assert_eq!(forwarder.forwarded(), 2);

        let added = rx.try_recv().unwrap();
        assert_eq!(added.kind, ContactEventKind::Added);
        assert_eq!(added.owners, [Some(7), None]);
        assert_eq!(added.tick, 3);
        assert_eq!(rx.try_recv().unwrap().kind, ContactEventKind::Removed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_suppressed_forwarder_still_combines() {
        let channel = ContactChannel::new();
        let rx = channel.receiver();
        let mut forwarder = channel.forwarder(0, true, true);

        let settings = forwarder.on_contact_added(&pair(), &ContactManifold::default());
        assert_eq!(settings.combined_restitution, 0.8);
        assert!(rx.try_recv().is_err());
    }
}

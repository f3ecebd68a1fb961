use std::time::{Duration, Instant};

use peerlink_serde::{Quat, Vec3};

use crate::{
    authority::extrapolation::{Extrapolator, MotionSample},
    messages::replication::TransformSync,
    types::{ObjectId, PeerId},
};

/// What the local peer does with an owner-driven object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorityRole {
    /// Samples and broadcasts the transform
    Owner,
    /// Extrapolates from received samples
    Observer,
}

impl AuthorityRole {
    pub fn of(owner: PeerId, local: PeerId) -> Self {
        if !owner.is_unowned() && owner == local {
            AuthorityRole::Owner
        } else {
            AuthorityRole::Observer
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        }
    }
}

/// Fixed-owner push replication of one object's transform.
#[derive(Clone, Debug)]
pub struct OwnerDrivenSync {
    transform: Transform,
    extrapolator: Extrapolator,
    send_interval: Duration,
    next_send: Option<Instant>,
}

impl OwnerDrivenSync {
    pub fn new(send_interval: Duration, blend: f32, max_extrapolation: Duration) -> Self {
        Self {
            transform: Transform::default(),
            extrapolator: Extrapolator::new(blend, max_extrapolation),
            send_interval,
            next_send: None,
        }
    }

    /// The local transform: sampled on the owner, last rendered on observers
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Records the owner's current transform for the next send
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn has_sample(&self) -> bool {
        self.extrapolator.has_sample()
    }

    /// Resets send and receive state after an ownership change
    pub fn on_owner_changed(&mut self) {
        self.extrapolator.clear();
        self.next_send = None;
    }

    /// Produces a sample when the local peer owns the object and the interval has elapsed.
    pub fn poll_send(
        &mut self,
        now: Instant,
        object: ObjectId,
        owner: PeerId,
        local: PeerId,
    ) -> Option<TransformSync> {
        if AuthorityRole::of(owner, local) != AuthorityRole::Owner {
            return None;
        }
        if let Some(next_send) = self.next_send {
            if now < next_send {
                return None;
            }
        }
        self.next_send = Some(now + self.send_interval);
        Some(TransformSync {
            object,
            owner,
            position: self.transform.position,
            rotation: self.transform.rotation,
            velocity: self.transform.velocity,
        })
    }

    /// Buffers a received sample. Callers have already checked the sender owns the object.
    pub fn receive(&mut self, message: &TransformSync, now: Instant) {
        self.extrapolator.push(MotionSample {
            position: message.position,
            rotation: message.rotation,
            velocity: message.velocity,
            angular_velocity: Vec3::ZERO,
            received_at: now,
        });
    }

    /// Updates and returns the rendered transform on an observer
    pub fn render(&mut self, now: Instant) -> Option<Transform> {
        let (position, rotation) = self.extrapolator.update(now)?;
        let velocity = self
            .extrapolator
            .latest()
            .map(|sample| sample.velocity)
            .unwrap_or(Vec3::ZERO);
        self.transform = Transform {
            position,
            rotation,
            velocity,
        };
        Some(self.transform)
    }
}

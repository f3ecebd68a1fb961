use std::time::{Duration, Instant};

use peerlink_serde::{Quat, Vec3};

use crate::{
    authority::extrapolation::{Extrapolator, MotionSample},
    messages::replication::PhysicsSync,
    types::{ObjectId, PeerId},
};

/// Last-touch tie-break: a non-zero requester replaces an unowned holder
/// or a numerically lower one.
///
/// The rule is commutative, so peers racing for the same object converge
/// on the highest id without negotiating.
pub fn claim_wins(current: PeerId, requested: PeerId) -> bool {
    !requested.is_unowned() && (current.is_unowned() || requested > current)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthorityClaim {
    pub holder: PeerId,
    pub acquired_at: Option<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Accepted { previous: PeerId },
    Rejected { holder: PeerId },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Last-touch authority over one free physics object.
#[derive(Clone, Debug)]
pub struct ContestedSync {
    claim: AuthorityClaim,
    state: PhysicsState,
    extrapolator: Extrapolator,
    send_interval: Duration,
    next_send: Option<Instant>,
    cooldown: Duration,
}

impl ContestedSync {
    pub fn new(
        send_interval: Duration,
        cooldown: Duration,
        blend: f32,
        max_extrapolation: Duration,
    ) -> Self {
        Self {
            claim: AuthorityClaim::default(),
            state: PhysicsState::default(),
            extrapolator: Extrapolator::new(blend, max_extrapolation),
            send_interval,
            next_send: None,
            cooldown,
        }
    }

    pub fn holder(&self) -> PeerId {
        self.claim.holder
    }

    pub fn claim(&self) -> &AuthorityClaim {
        &self.claim
    }

    pub fn state(&self) -> PhysicsState {
        self.state
    }

    /// Records the simulated state on the holder
    pub fn set_state(&mut self, state: PhysicsState) {
        self.state = state;
    }

    /// Applies the tie-break to a request arriving from anyone, the local peer included
    pub fn apply_request(&mut self, requested: PeerId, now: Instant) -> ClaimOutcome {
        if !claim_wins(self.claim.holder, requested) {
            return ClaimOutcome::Rejected {
                holder: self.claim.holder,
            };
        }
        let previous = self.claim.holder;
        self.claim = AuthorityClaim {
            holder: requested,
            acquired_at: Some(now),
        };
        self.next_send = None;
        self.extrapolator.clear();
        ClaimOutcome::Accepted { previous }
    }

    /// Whether an interaction by `local` should produce a request now.
    ///
    /// Requests are held back while a fresh claim is still cooling down,
    /// and when the tie-break would reject them anyway.
    pub fn should_request(&self, local: PeerId, now: Instant) -> bool {
        if self.claim.holder == local || !claim_wins(self.claim.holder, local) {
            return false;
        }
        match self.claim.acquired_at {
            Some(acquired_at) => now.saturating_duration_since(acquired_at) >= self.cooldown,
            None => true,
        }
    }

    /// Resets to unowned, e.g. when the holder leaves the session
    pub fn release(&mut self) -> PeerId {
        let previous = self.claim.holder;
        self.claim = AuthorityClaim::default();
        self.next_send = None;
        previous
    }

    pub fn poll_send(&mut self, now: Instant, object: ObjectId, local: PeerId) -> Option<PhysicsSync> {
        if self.claim.holder.is_unowned() || self.claim.holder != local {
            return None;
        }
        if let Some(next_send) = self.next_send {
            if now < next_send {
                return None;
            }
        }
        self.next_send = Some(now + self.send_interval);
        Some(PhysicsSync {
            object,
            owner: local,
            position: self.state.position,
            rotation: self.state.rotation,
            linear_velocity: self.state.linear_velocity,
            angular_velocity: self.state.angular_velocity,
        })
    }

    /// A sample implies a claim by its owner. Returns the claim outcome
    /// when the sample changed the holder.
    pub fn receive(&mut self, message: &PhysicsSync, local: PeerId, now: Instant) -> Option<ClaimOutcome> {
        let mut outcome = None;
        if message.owner != self.claim.holder {
            let result = self.apply_request(message.owner, now);
            if let ClaimOutcome::Rejected { .. } = result {
                return Some(result);
            }
            outcome = Some(result);
        }
        if self.claim.holder != local {
            self.extrapolator.push(MotionSample {
                position: message.position,
                rotation: message.rotation,
                velocity: message.linear_velocity,
                angular_velocity: message.angular_velocity,
                received_at: now,
            });
        }
        outcome
    }

    /// Updates and returns the rendered state on a non-holder
    pub fn render(&mut self, now: Instant) -> Option<PhysicsState> {
        let (position, rotation) = self.extrapolator.update(now)?;
        let sample = self.extrapolator.latest()?;
        self.state = PhysicsState {
            position,
            rotation,
            linear_velocity: sample.velocity,
            angular_velocity: sample.angular_velocity,
        };
        Some(self.state)
    }
}

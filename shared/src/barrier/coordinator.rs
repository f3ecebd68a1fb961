use std::{
    collections::{BTreeMap, BTreeSet},
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    barrier::{deadline_timer::DeadlineTimer, error::BarrierError},
    messages::transition::{RoleAssignment, TransitionAck},
    types::{PeerId, Place, Role},
};

struct PendingBarrier {
    epoch: u8,
    targets: BTreeMap<PeerId, Place>,
    expected_acks: BTreeSet<PeerId>,
}

/// What the host does to start a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierStart {
    pub epoch: u8,
    /// Applied locally right away; the host never acks itself
    pub local_role: Option<Role>,
    /// One assignment per remote peer
    pub assignments: Vec<RoleAssignment>,
    /// No remote peer was expected, so the barrier is already complete
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BarrierProgress {
    Waiting { remaining: usize },
    Completed { epoch: u8 },
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierTimeout {
    pub epoch: u8,
    pub missing: Vec<PeerId>,
}

/// Host side of a collective transition: Idle, then AwaitingAcks, then Idle.
///
/// At most one barrier is pending. A timeout abandons the barrier without
/// retrying.
pub struct BarrierCoordinator {
    local: PeerId,
    timeout: Duration,
    next_epoch: u8,
    pending: Option<PendingBarrier>,
    timer: DeadlineTimer,
}

impl BarrierCoordinator {
    pub fn new(local: PeerId, timeout: Duration) -> Self {
        Self {
            local,
            timeout,
            next_epoch: 1,
            pending: None,
            timer: DeadlineTimer::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_epoch(&self) -> Option<u8> {
        self.pending.as_ref().map(|pending| pending.epoch)
    }

    pub fn expected_acks(&self) -> Vec<PeerId> {
        self.pending
            .as_ref()
            .map(|pending| pending.expected_acks.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Starts a barrier moving every remote roster member to its role's place.
    ///
    /// Every id in `remotes` needs a role. Roles for peers outside the roster
    /// are skipped.
    pub fn begin(
        &mut self,
        now: Instant,
        host: Option<PeerId>,
        remotes: &[PeerId],
        roles: &BTreeMap<PeerId, Role>,
    ) -> Result<BarrierStart, BarrierError> {
        if host != Some(self.local) {
            return Err(BarrierError::NotHost {
                local: self.local,
                host,
            });
        }
        if let Some(pending) = &self.pending {
            return Err(BarrierError::AlreadyPending {
                epoch: pending.epoch,
            });
        }

        let mut members = Vec::with_capacity(remotes.len());
        for peer in remotes.iter().filter(|peer| **peer != self.local) {
            let Some(role) = roles.get(peer) else {
                return Err(BarrierError::MissingRole { peer: *peer });
            };
            members.push((*peer, *role));
        }
        for peer in roles.keys() {
            if *peer != self.local && !remotes.contains(peer) {
                debug!("Role for {} skipped: not in the roster", peer);
            }
        }

        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1).max(1);

        let mut targets = BTreeMap::new();
        let mut assignments = Vec::new();
        for (peer, role) in members {
            targets.insert(peer, role.target_place());
            assignments.push(RoleAssignment { peer, role, epoch });
        }

        let completed = targets.is_empty();
        if completed {
            info!("Barrier {} completed immediately: no remote peers", epoch);
        } else {
            info!(
                "Barrier {} started, awaiting {} acknowledgements",
                epoch,
                targets.len()
            );
            self.pending = Some(PendingBarrier {
                epoch,
                expected_acks: targets.keys().copied().collect(),
                targets,
            });
            self.timer.start(now, self.timeout);
        }

        Ok(BarrierStart {
            epoch,
            local_role: roles.get(&self.local).copied(),
            assignments,
            completed,
        })
    }

    fn remove_expected(&mut self, peer: PeerId) -> BarrierProgress {
        let Some(pending) = self.pending.as_mut() else {
            return BarrierProgress::Ignored;
        };
        pending.expected_acks.remove(&peer);
        if !pending.expected_acks.is_empty() {
            return BarrierProgress::Waiting {
                remaining: pending.expected_acks.len(),
            };
        }
        let epoch = pending.epoch;
        self.pending = None;
        self.timer.cancel();
        info!("Barrier {} completed", epoch);
        BarrierProgress::Completed { epoch }
    }

    /// Counts an acknowledgement if it matches the pending barrier.
    /// Duplicates are harmless.
    pub fn receive_ack(&mut self, sender: PeerId, ack: &TransitionAck) -> BarrierProgress {
        if ack.peer != sender {
            warn!("Ack from {} claims to be from {}; dropped", sender, ack.peer);
            return BarrierProgress::Ignored;
        }
        let Some(pending) = &self.pending else {
            debug!("Ack from {} for barrier {} with none pending", sender, ack.epoch);
            return BarrierProgress::Ignored;
        };
        if ack.epoch != pending.epoch {
            debug!(
                "Stale ack from {} for barrier {} (pending {})",
                sender, ack.epoch, pending.epoch
            );
            return BarrierProgress::Ignored;
        }
        match pending.targets.get(&sender).copied() {
            Some(place) if place == ack.place => self.remove_expected(sender),
            Some(place) => {
                debug!(
                    "Ack from {} reached {:?}, expected {:?}",
                    sender, ack.place, place
                );
                BarrierProgress::Ignored
            }
            None => BarrierProgress::Ignored,
        }
    }

    /// A peer leaving no longer holds the barrier up
    pub fn forget_peer(&mut self, peer: PeerId) -> BarrierProgress {
        let expected = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.expected_acks.contains(&peer));
        if expected {
            self.remove_expected(peer)
        } else {
            BarrierProgress::Ignored
        }
    }

    /// Abandons the pending barrier once its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<BarrierTimeout> {
        if !self.timer.fire(now) {
            return None;
        }
        let pending = self.pending.take()?;
        let missing: Vec<PeerId> = pending.expected_acks.into_iter().collect();
        warn!(
            "Barrier {} timed out; proceeding without acks from {:?}",
            pending.epoch, missing
        );
        Some(BarrierTimeout {
            epoch: pending.epoch,
            missing,
        })
    }
}

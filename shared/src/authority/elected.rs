use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    authority::error::AuthorityError,
    messages::{
        outbox::Recipient,
        snapshot::SnapshotResponse,
        world_state::{RecordUpdate, WorldStateUpdate},
    },
    types::{PeerId, Place},
    world::{
        presence::PresenceDirectory,
        world_state::{SharedRecord, SharedWorldState, WorldChange, FLAG_COUNT},
    },
};

/// The lowest non-zero id in the roster.
pub fn elected_authority<I: IntoIterator<Item = PeerId>>(roster: I) -> Option<PeerId> {
    roster.into_iter().filter(|id| !id.is_unowned()).min()
}

/// Everything the authority sends in one publish.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldPublish {
    pub recipient: Recipient,
    pub update: WorldStateUpdate,
    pub records: Vec<RecordUpdate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorityChange {
    pub previous: Option<PeerId>,
    pub current: Option<PeerId>,
}

/// The global shared record, mutated only by the lowest-id peer.
///
/// Every peer derives the authority from its own roster, so no election
/// message exists. Non-authorities only apply state from the network.
///
/// A peer joining a session that already has members starts unreconciled:
/// until its first snapshot lands (or the pull gives up) it never publishes,
/// serves snapshots, or mutates, even when it holds the lowest id.
pub struct ElectedWorld {
    local: PeerId,
    authority: Option<PeerId>,
    reconciled: bool,
    state: SharedWorldState,
    dirty: bool,
    dirty_records: BTreeSet<u32>,
    publish_interval: Duration,
    next_publish: Option<Instant>,
    recipient_place: Option<Place>,
}

impl ElectedWorld {
    pub fn new(local: PeerId, publish_interval: Duration, recipient_place: Option<Place>) -> Self {
        Self {
            local,
            authority: None,
            reconciled: true,
            state: SharedWorldState::new(),
            dirty: false,
            dirty_records: BTreeSet::new(),
            publish_interval,
            next_publish: None,
            recipient_place,
        }
    }

    pub fn state(&self) -> &SharedWorldState {
        &self.state
    }

    pub fn authority(&self) -> Option<PeerId> {
        self.authority
    }

    pub fn is_authority(&self) -> bool {
        self.authority == Some(self.local)
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    /// Whether the local peer is the authority and holds state worth serving
    pub fn is_acting_authority(&self) -> bool {
        self.reconciled && self.is_authority()
    }

    /// Holds back publishing until the state is pulled from the session
    pub fn begin_reconcile(&mut self) {
        debug!("{} waiting for a world snapshot", self.local);
        self.reconciled = false;
        self.dirty = false;
        self.dirty_records.clear();
    }

    /// Ends the wait. An authority then republishes what it now holds.
    pub fn finish_reconcile(&mut self) {
        if self.reconciled {
            return;
        }
        self.reconciled = true;
        info!("{} reconciled with the shared world", self.local);
        if self.is_authority() {
            self.mark_dirty();
        }
    }

    pub fn recipient_place(&self) -> Option<Place> {
        self.recipient_place
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || !self.dirty_records.is_empty()
    }

    /// Recomputes the authority from the roster. A reconciled peer that
    /// becomes the authority republishes everything it holds.
    pub fn refresh_authority<I: IntoIterator<Item = PeerId>>(&mut self, roster: I) -> Option<AuthorityChange> {
        let current = elected_authority(roster);
        if current == self.authority {
            return None;
        }
        let previous = std::mem::replace(&mut self.authority, current);
        info!(
            "Elected world authority changed from {:?} to {:?}",
            previous, current
        );
        if self.is_acting_authority() {
            self.mark_dirty();
        }
        Some(AuthorityChange { previous, current })
    }

    /// Queues a full republish of scalar, flags, and every record
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.dirty_records
            .extend(self.state.records().map(|(id, _)| *id));
        self.next_publish = None;
    }

    fn check_authority(&self) -> Result<(), AuthorityError> {
        let error = if !self.is_authority() {
            AuthorityError::NotAuthority {
                local: self.local,
                authority: self.authority.unwrap_or(PeerId::UNOWNED),
            }
        } else if !self.reconciled {
            AuthorityError::Unreconciled { local: self.local }
        } else {
            return Ok(());
        };
        warn!("{}", error);
        Err(error)
    }

    pub fn try_set_scalar(&mut self, scalar: f32, changes: &mut Vec<WorldChange>) -> Result<(), AuthorityError> {
        self.check_authority()?;
        let before = changes.len();
        self.state.apply_scalar(scalar, changes);
        if changes.len() != before {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn try_set_flag(
        &mut self,
        index: u8,
        value: bool,
        changes: &mut Vec<WorldChange>,
    ) -> Result<(), AuthorityError> {
        if index >= FLAG_COUNT {
            return Err(AuthorityError::FlagIndexOutOfRange { index });
        }
        self.check_authority()?;
        let before = changes.len();
        self.state.apply_flag(index, value, changes);
        if changes.len() != before {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn try_set_record(
        &mut self,
        id: u32,
        record: SharedRecord,
        changes: &mut Vec<WorldChange>,
    ) -> Result<(), AuthorityError> {
        self.check_authority()?;
        let before = changes.len();
        self.state.apply_record(id, record, changes);
        if changes.len() != before {
            self.dirty_records.insert(id);
        }
        Ok(())
    }

    fn accepts_remote(&self, sender: PeerId, name: &str) -> bool {
        if self.is_acting_authority() {
            debug!("Ignoring {} from {}: local peer is the authority", name, sender);
            return false;
        }
        if self.authority != Some(sender) {
            debug!(
                "Applying {} from {} although {:?} is the computed authority",
                name, sender, self.authority
            );
        }
        true
    }

    pub fn apply_update(&mut self, sender: PeerId, update: &WorldStateUpdate, changes: &mut Vec<WorldChange>) {
        if !self.accepts_remote(sender, "WorldState") {
            return;
        }
        self.state.apply_scalar(update.scalar, changes);
        self.state.apply_flags(update.flags, changes);
    }

    pub fn apply_record_update(&mut self, sender: PeerId, update: &RecordUpdate, changes: &mut Vec<WorldChange>) {
        if !self.accepts_remote(sender, "RecordUpdate") {
            return;
        }
        self.state.apply_record(update.id, update.record.clone(), changes);
    }

    /// Applies a full snapshot through the same change detection as routine updates
    pub fn apply_snapshot(&mut self, snapshot: &SnapshotResponse, changes: &mut Vec<WorldChange>) {
        self.state.apply_scalar(snapshot.scalar, changes);
        self.state.apply_flags(snapshot.flags, changes);
        for (id, record) in &snapshot.records {
            self.state.apply_record(*id, record.clone(), changes);
        }
    }

    pub fn build_snapshot(&self) -> SnapshotResponse {
        SnapshotResponse {
            scalar: self.state.scalar(),
            flags: self.state.flags(),
            records: self
                .state
                .records()
                .map(|(id, record)| (*id, record.clone()))
                .collect(),
        }
    }

    /// Emits the dirty state at most once per publish interval.
    ///
    /// With a recipient place configured only peers in that place receive
    /// it. Publishing with no eligible recipient still clears the dirty state.
    pub fn poll_publish(&mut self, now: Instant, presence: &PresenceDirectory) -> Option<WorldPublish> {
        if !self.is_acting_authority() || !self.is_dirty() {
            return None;
        }
        if let Some(next_publish) = self.next_publish {
            if now < next_publish {
                return None;
            }
        }
        self.next_publish = Some(now + self.publish_interval);
        self.dirty = false;
        let records: Vec<RecordUpdate> = std::mem::take(&mut self.dirty_records)
            .into_iter()
            .filter_map(|id| {
                self.state.record(id).map(|record| RecordUpdate {
                    id,
                    record: record.clone(),
                })
            })
            .collect();

        let recipient = match self.recipient_place {
            None => Recipient::All,
            Some(place) => {
                let peers = presence.peers_in_place(place);
                if peers.is_empty() {
                    debug!("No peer in {:?} to receive the world state", place);
                    return None;
                }
                Recipient::Many(peers)
            }
        };

        Some(WorldPublish {
            recipient,
            update: WorldStateUpdate {
                scalar: self.state.scalar(),
                flags: self.state.flags(),
            },
            records,
        })
    }
}

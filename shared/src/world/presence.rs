use std::{collections::BTreeMap, time::Instant};

use log::info;

use crate::{
    authority::elected::elected_authority,
    types::{PeerId, Place, Role},
};

/// Cached state of one session participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerRecord {
    pub id: PeerId,
    pub name: String,
    pub place: Place,
    pub role: Role,
    pub ready: bool,
    pub last_update: Option<Instant>,
}

impl PeerRecord {
    fn new(id: PeerId, name: String, now: Option<Instant>) -> Self {
        Self {
            id,
            name,
            place: Place::None,
            role: Role::None,
            ready: false,
            last_update: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenceChange {
    Joined(PeerId),
    Left(PeerId),
    RoleChanged { peer: PeerId, role: Role },
    PlaceChanged { peer: PeerId, place: Place },
    ReadyChanged { peer: PeerId, ready: bool },
}

/// Per-peer place, role, and ready flag for everyone in the session,
/// the local peer included.
pub struct PresenceDirectory {
    local: PeerId,
    host: Option<PeerId>,
    peers: BTreeMap<PeerId, PeerRecord>,
}

impl PresenceDirectory {
    pub fn new(local: PeerId, name: impl Into<String>) -> Self {
        let mut peers = BTreeMap::new();
        peers.insert(local, PeerRecord::new(local, name.into(), None));
        Self {
            local,
            host: None,
            peers,
        }
    }

    pub fn local(&self) -> PeerId {
        self.local
    }

    pub fn local_record(&self) -> Option<&PeerRecord> {
        self.peers.get(&self.local)
    }

    /// Adds a peer seen through the roster. Returns the change if it is new.
    pub fn join(&mut self, id: PeerId, name: &str, now: Instant) -> Option<PresenceChange> {
        if let Some(record) = self.peers.get_mut(&id) {
            if record.name != name {
                record.name = name.to_string();
            }
            return None;
        }
        info!("{} ({}) joined", id, name);
        self.peers
            .insert(id, PeerRecord::new(id, name.to_string(), Some(now)));
        Some(PresenceChange::Joined(id))
    }

    /// Creates a nameless record for a peer first seen in a state message.
    fn ensure(&mut self, id: PeerId, now: Instant, changes: &mut Vec<PresenceChange>) -> &mut PeerRecord {
        if !self.peers.contains_key(&id) {
            info!("{} joined (first seen in a state message)", id);
            changes.push(PresenceChange::Joined(id));
        }
        let record = self
            .peers
            .entry(id)
            .or_insert_with(|| PeerRecord::new(id, String::new(), None));
        record.last_update = Some(now);
        record
    }

    /// Removes a peer. The local peer is never removed.
    pub fn leave(&mut self, id: PeerId) -> Option<PeerRecord> {
        if id == self.local {
            return None;
        }
        let record = self.peers.remove(&id)?;
        info!("{} left", id);
        if self.host == Some(id) {
            self.host = None;
        }
        Some(record)
    }

    pub fn set_role(&mut self, id: PeerId, role: Role, now: Instant, changes: &mut Vec<PresenceChange>) {
        let record = self.ensure(id, now, changes);
        if record.role != role {
            record.role = role;
            changes.push(PresenceChange::RoleChanged { peer: id, role });
        }
    }

    pub fn set_place(&mut self, id: PeerId, place: Place, now: Instant, changes: &mut Vec<PresenceChange>) {
        let record = self.ensure(id, now, changes);
        if record.place != place {
            record.place = place;
            changes.push(PresenceChange::PlaceChanged { peer: id, place });
        }
    }

    pub fn set_ready(&mut self, id: PeerId, ready: bool, now: Instant, changes: &mut Vec<PresenceChange>) {
        let record = self.ensure(id, now, changes);
        if record.ready != ready {
            record.ready = ready;
            changes.push(PresenceChange::ReadyChanged { peer: id, ready });
        }
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerRecord> {
        self.peers.get(&id)
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    /// Every peer id in the session, ascending
    pub fn roster_ids(&self) -> Vec<PeerId> {
        self.peers.keys().copied().collect()
    }

    pub fn remote_ids(&self) -> Vec<PeerId> {
        self.peers
            .keys()
            .copied()
            .filter(|id| *id != self.local)
            .collect()
    }

    /// Remote peers currently in `place`
    pub fn peers_in_place(&self, place: Place) -> Vec<PeerId> {
        self.peers
            .values()
            .filter(|record| record.id != self.local && record.place == place)
            .map(|record| record.id)
            .collect()
    }

    pub fn elected_authority(&self) -> Option<PeerId> {
        elected_authority(self.peers.keys().copied())
    }

    pub fn is_local_authority(&self) -> bool {
        self.elected_authority() == Some(self.local)
    }

    pub fn host(&self) -> Option<PeerId> {
        self.host
    }

    pub fn set_host(&mut self, host: Option<PeerId>) {
        self.host = host;
    }

    pub fn is_host(&self) -> bool {
        self.host == Some(self.local)
    }
}

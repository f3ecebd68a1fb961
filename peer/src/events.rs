use std::{cell::RefCell, mem, rc::Rc, vec::IntoIter};

use peerlink_shared::{
    BarrierTimeout, NetworkObject, ObjectId, PeerId, Place, PresenceChange, Role,
    TransitionRequest, WorldChange,
};

use crate::PeerlinkError;

/// Everything observable that happened during one tick.
pub struct Events {
    joins: Vec<PeerId>,
    leaves: Vec<PeerId>,
    role_changes: Vec<(PeerId, Role)>,
    place_changes: Vec<(PeerId, Place)>,
    ready_changes: Vec<(PeerId, bool)>,
    scalar_changes: Vec<f32>,
    flags_raised: Vec<u8>,
    flags_cleared: Vec<u8>,
    record_changes: Vec<u32>,
    transition_requests: Vec<TransitionRequest>,
    barrier_completions: Vec<u8>,
    barrier_timeouts: Vec<BarrierTimeout>,
    object_spawns: Vec<(ObjectId, Rc<RefCell<NetworkObject>>)>,
    owner_changes: Vec<(ObjectId, PeerId)>,
    authority_changes: Vec<(ObjectId, PeerId)>,
    elected_authority_changes: Vec<Option<PeerId>>,
    snapshots_applied: Vec<PeerId>,
    snapshots_failed: Vec<u32>,
    errors: Vec<PeerlinkError>,

    empty: bool,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            joins: Vec::new(),
            leaves: Vec::new(),
            role_changes: Vec::new(),
            place_changes: Vec::new(),
            ready_changes: Vec::new(),
            scalar_changes: Vec::new(),
            flags_raised: Vec::new(),
            flags_cleared: Vec::new(),
            record_changes: Vec::new(),
            transition_requests: Vec::new(),
            barrier_completions: Vec::new(),
            barrier_timeouts: Vec::new(),
            object_spawns: Vec::new(),
            owner_changes: Vec::new(),
            authority_changes: Vec::new(),
            elected_authority_changes: Vec::new(),
            snapshots_applied: Vec::new(),
            snapshots_failed: Vec::new(),
            errors: Vec::new(),

            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: Event>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_presence_changes(&mut self, changes: Vec<PresenceChange>) {
        for change in changes {
            match change {
                PresenceChange::Joined(peer) => self.joins.push(peer),
                PresenceChange::Left(peer) => self.leaves.push(peer),
                PresenceChange::RoleChanged { peer, role } => self.role_changes.push((peer, role)),
                PresenceChange::PlaceChanged { peer, place } => {
                    self.place_changes.push((peer, place))
                }
                PresenceChange::ReadyChanged { peer, ready } => {
                    self.ready_changes.push((peer, ready))
                }
            }
            self.empty = false;
        }
    }

    pub(crate) fn push_world_changes(&mut self, changes: Vec<WorldChange>) {
        for change in changes {
            match change {
                WorldChange::ScalarChanged(scalar) => self.scalar_changes.push(scalar),
                WorldChange::FlagRaised(index) => self.flags_raised.push(index),
                WorldChange::FlagCleared(index) => self.flags_cleared.push(index),
                WorldChange::RecordChanged(id) => self.record_changes.push(id),
            }
            self.empty = false;
        }
    }

    pub(crate) fn push_transition_request(&mut self, request: TransitionRequest) {
        self.transition_requests.push(request);
        self.empty = false;
    }

    pub(crate) fn push_barrier_completion(&mut self, epoch: u8) {
        self.barrier_completions.push(epoch);
        self.empty = false;
    }

    pub(crate) fn push_barrier_timeout(&mut self, timeout: BarrierTimeout) {
        self.barrier_timeouts.push(timeout);
        self.empty = false;
    }

    pub(crate) fn push_object_spawn(&mut self, id: ObjectId, object: Rc<RefCell<NetworkObject>>) {
        self.object_spawns.push((id, object));
        self.empty = false;
    }

    pub(crate) fn push_owner_change(&mut self, id: ObjectId, owner: PeerId) {
        self.owner_changes.push((id, owner));
        self.empty = false;
    }

    pub(crate) fn push_authority_change(&mut self, id: ObjectId, holder: PeerId) {
        self.authority_changes.push((id, holder));
        self.empty = false;
    }

    pub(crate) fn push_elected_authority_change(&mut self, authority: Option<PeerId>) {
        self.elected_authority_changes.push(authority);
        self.empty = false;
    }

    pub(crate) fn push_snapshot_applied(&mut self, sender: PeerId) {
        self.snapshots_applied.push(sender);
        self.empty = false;
    }

    pub(crate) fn push_snapshot_failed(&mut self, attempts: u32) {
        self.snapshots_failed.push(attempts);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: PeerlinkError) {
        self.errors.push(error);
        self.empty = false;
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

macro_rules! event {
    ($(#[$meta:meta])* $name:ident, $field:ident, $item:ty) => {
        $(#[$meta])*
        pub struct $name;
        impl Event for $name {
            type Iter = IntoIter<$item>;

            fn iter(events: &mut Events) -> Self::Iter {
                let list = mem::take(&mut events.$field);
                IntoIterator::into_iter(list)
            }

            fn has(events: &Events) -> bool {
                !events.$field.is_empty()
            }
        }
    };
}

event!(
    /// A peer entered the session
    JoinedEvent, joins, PeerId
);
event!(LeftEvent, leaves, PeerId);
event!(RoleChangedEvent, role_changes, (PeerId, Role));
event!(PlaceChangedEvent, place_changes, (PeerId, Place));
event!(ReadyEvent, ready_changes, (PeerId, bool));
event!(
    /// The shared world's scalar took a new value
    WorldScalarChangedEvent, scalar_changes, f32
);
event!(
    /// A world flag became true
    FlagRaisedEvent, flags_raised, u8
);
event!(
    /// A world flag became false
    FlagClearedEvent, flags_cleared, u8
);
event!(RecordChangedEvent, record_changes, u32);
event!(
    /// The host assigned the local peer a role; finish the move, then call
    /// `Session::complete_transition`
    TransitionRequestedEvent, transition_requests, TransitionRequest
);
event!(BarrierCompletedEvent, barrier_completions, u8);
event!(
    /// A barrier was abandoned with acknowledgements still missing
    BarrierTimedOutEvent, barrier_timeouts, BarrierTimeout
);
event!(
    /// An object first seen in an inbound message
    ObjectSpawnedEvent, object_spawns, (ObjectId, Rc<RefCell<NetworkObject>>)
);
event!(OwnerChangedEvent, owner_changes, (ObjectId, PeerId));
event!(
    /// The holder of a contested object changed
    AuthorityChangedEvent, authority_changes, (ObjectId, PeerId)
);
event!(ElectedAuthorityChangedEvent, elected_authority_changes, Option<PeerId>);
event!(SnapshotAppliedEvent, snapshots_applied, PeerId);
event!(SnapshotFailedEvent, snapshots_failed, u32);
event!(ErrorEvent, errors, PeerlinkError);

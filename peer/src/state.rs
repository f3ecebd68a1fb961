use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Instant};

use log::{debug, info, warn};

use peerlink_shared::{
    elected_authority, AssignmentOutcome, AuthorityRequest, BarrierCoordinator,
    BarrierParticipant, BarrierProgress, ClaimOutcome, ContestedSync, ElectedWorld, HandlerError,
    NetworkObject, ObjectError, ObjectId, ObjectRegistry, Outbox, OwnerAssign, OwnerDrivenSync,
    PeerId, PhysicsSync, PresenceChange, PresenceDirectory, PresenceState, ReadyState,
    RecordUpdate, RoleAssignment, SnapshotReconciler, SnapshotRequest, SnapshotResponse,
    TransformSync, TransitionAck, WorldChange, WorldStateUpdate,
};

use crate::{events::Events, SessionConfig};

/// Everything a message handler may read or change.
///
/// Handlers run on the session's single tick thread; packets they queue in
/// the outbox are sent after the whole inbound queue has been applied.
pub struct SessionState {
    pub(crate) config: SessionConfig,
    pub(crate) local: PeerId,
    pub(crate) now: Instant,
    pub(crate) presence: PresenceDirectory,
    pub(crate) objects: ObjectRegistry<NetworkObject>,
    /// Strong handles of objects first seen on the network, held until despawn
    pub(crate) adopted: HashMap<ObjectId, Rc<RefCell<NetworkObject>>>,
    pub(crate) world: ElectedWorld,
    pub(crate) barrier: BarrierCoordinator,
    pub(crate) participant: BarrierParticipant,
    pub(crate) snapshot: SnapshotReconciler,
    pub(crate) outbox: Outbox,
    pub(crate) events: Events,
}

impl SessionState {
    pub(crate) fn new(config: SessionConfig, local: PeerId, name: &str, now: Instant) -> Self {
        Self {
            presence: PresenceDirectory::new(local, name),
            objects: ObjectRegistry::new(),
            adopted: HashMap::new(),
            world: ElectedWorld::new(
                local,
                config.world_publish_interval,
                config.world_recipient_place,
            ),
            barrier: BarrierCoordinator::new(local, config.barrier_timeout),
            participant: BarrierParticipant::new(local),
            snapshot: SnapshotReconciler::new(
                local,
                config.snapshot_timeout,
                config.snapshot_max_attempts,
            ),
            outbox: Outbox::new(),
            events: Events::new(),
            config,
            local,
            now,
        }
    }

    // Public

    pub fn local(&self) -> PeerId {
        self.local
    }

    /// Time of the tick being processed
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn presence(&self) -> &PresenceDirectory {
        &self.presence
    }

    pub fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    // Crate-public

    pub(crate) fn new_owner_driven(&self, id: ObjectId) -> NetworkObject {
        NetworkObject::owner_driven(
            id,
            OwnerDrivenSync::new(
                self.config.transform_send_interval,
                self.config.extrapolation_blend,
                self.config.max_extrapolation,
            ),
        )
    }

    pub(crate) fn new_contested(&self, id: ObjectId) -> NetworkObject {
        NetworkObject::contested(
            id,
            ContestedSync::new(
                self.config.physics_send_interval,
                self.config.authority_cooldown,
                self.config.extrapolation_blend,
                self.config.max_extrapolation,
            ),
        )
    }

    pub(crate) fn apply_presence_changes(&mut self, changes: Vec<PresenceChange>) {
        if let Some(place) = self.world.recipient_place() {
            let entered = changes.iter().any(|change| {
                matches!(change, PresenceChange::PlaceChanged { peer, place: entered }
                    if *peer != self.local && *entered == place)
            });
            if entered && self.world.is_acting_authority() {
                self.world.mark_dirty();
            }
        }
        self.events.push_presence_changes(changes);
    }

    pub(crate) fn apply_world_changes(&mut self, changes: Vec<WorldChange>) {
        self.events.push_world_changes(changes);
    }

    /// Recomputes the elected authority from the current roster
    pub(crate) fn refresh_authority(&mut self) {
        if let Some(change) = self.world.refresh_authority(self.presence.roster_ids()) {
            self.events.push_elected_authority_change(change.current);
        }
    }

    /// The peer that serves `requester` a snapshot: the lowest id besides it
    pub(crate) fn snapshot_source(&self, requester: PeerId) -> Option<PeerId> {
        elected_authority(
            self.presence
                .roster_ids()
                .into_iter()
                .filter(|id| *id != requester),
        )
    }

    /// Registers an object first seen on the network and keeps it alive
    fn adopt(&mut self, object: NetworkObject, owner: PeerId) -> Rc<RefCell<NetworkObject>> {
        let id = object.id();
        let handle = Rc::new(RefCell::new(object));
        self.objects.register(id, &handle, owner);
        self.adopted.insert(id, Rc::clone(&handle));
        info!("Adopted {} from the network, owner {}", id, owner);
        self.events.push_object_spawn(id, Rc::clone(&handle));
        handle
    }

    fn lookup_or_adopt(
        &mut self,
        id: ObjectId,
        owner: PeerId,
        contested: bool,
    ) -> Rc<RefCell<NetworkObject>> {
        match self.objects.lookup(id) {
            Ok(handle) => handle,
            Err(_) => {
                let object = if contested {
                    self.new_contested(id)
                } else {
                    self.new_owner_driven(id)
                };
                self.adopt(object, owner)
            }
        }
    }

    fn check_sender(sender: PeerId, claimed: PeerId, name: &str) -> Result<(), HandlerError> {
        if sender == claimed {
            return Ok(());
        }
        warn!("{} from {} claims to come from {}; dropped", name, sender, claimed);
        Err(HandlerError::Rejected {
            reason: format!("{} sent by {} on behalf of {}", name, sender, claimed),
        })
    }

    // Handlers

    pub(crate) fn on_presence(&mut self, sender: PeerId, message: PresenceState) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.peer, "PresenceState")?;
        let mut changes = Vec::new();
        self.presence
            .set_place(message.peer, message.place, self.now, &mut changes);
        self.presence
            .set_role(message.peer, message.role, self.now, &mut changes);
        self.apply_presence_changes(changes);
        Ok(())
    }

    pub(crate) fn on_ready(&mut self, sender: PeerId, message: ReadyState) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.peer, "ReadyState")?;
        let mut changes = Vec::new();
        self.presence
            .set_ready(message.peer, message.ready, self.now, &mut changes);
        self.apply_presence_changes(changes);
        Ok(())
    }

    pub(crate) fn on_role_assignment(
        &mut self,
        sender: PeerId,
        message: RoleAssignment,
    ) -> Result<(), HandlerError> {
        match self
            .participant
            .on_assignment(sender, self.presence.host(), &message)
        {
            AssignmentOutcome::Transition(request) => {
                let mut changes = Vec::new();
                self.presence
                    .set_role(self.local, request.role, self.now, &mut changes);
                self.apply_presence_changes(changes);
                info!(
                    "Transition {} requested: move to {:?}",
                    request.epoch, request.place
                );
                self.events.push_transition_request(request);
            }
            AssignmentOutcome::Reack(ack) => {
                self.outbox.send_to(sender, &ack)?;
            }
            AssignmentOutcome::Ignored => {}
        }
        Ok(())
    }

    pub(crate) fn on_transition_ack(&mut self, sender: PeerId, message: TransitionAck) -> Result<(), HandlerError> {
        if sender == message.peer {
            let mut changes = Vec::new();
            self.presence
                .set_place(sender, message.place, self.now, &mut changes);
            self.apply_presence_changes(changes);
        }
        if let BarrierProgress::Completed { epoch } = self.barrier.receive_ack(sender, &message) {
            self.events.push_barrier_completion(epoch);
        }
        Ok(())
    }

    /// Whether `peer` may hand `id` to `owner`: the recorded owner may, and so
    /// may the host while the object is unknown or unowned. A new object may
    /// also be announced by the peer that will own it.
    pub(crate) fn may_assign_owner(&mut self, peer: PeerId, id: ObjectId, owner: PeerId) -> bool {
        let is_host = self.presence.host() == Some(peer);
        match self.objects.owner(id) {
            Ok(recorded) if recorded.is_unowned() => is_host,
            Ok(recorded) => recorded == peer,
            Err(_) => is_host || peer == owner,
        }
    }

    pub(crate) fn on_owner_assign(&mut self, sender: PeerId, message: OwnerAssign) -> Result<(), HandlerError> {
        if !self.may_assign_owner(sender, message.object, message.owner) {
            warn!(
                "OwnerAssign of {} to {} from {} dropped: sender does not control it",
                message.object, message.owner, sender
            );
            return Err(HandlerError::Rejected {
                reason: format!("{} may not reassign {}", sender, message.object),
            });
        }
        if self.objects.lookup(message.object).is_err() {
            let object = self.new_owner_driven(message.object);
            self.adopt(object, message.owner);
            return Ok(());
        }
        let handle = self.objects.lookup(message.object).map_err(reject)?;
        handle.borrow_mut().owner_driven_mut().map_err(reject)?.on_owner_changed();
        let previous = self
            .objects
            .rebind(message.object, message.owner)
            .map_err(reject)?;
        if previous != message.owner {
            debug!(
                "{} reassigned {} from {} to {}",
                sender, message.object, previous, message.owner
            );
            self.events.push_owner_change(message.object, message.owner);
        }
        Ok(())
    }

    pub(crate) fn on_transform(&mut self, sender: PeerId, message: TransformSync) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.owner, "TransformSync")?;
        let handle = self.lookup_or_adopt(message.object, sender, false);
        let owner = self.objects.owner(message.object).map_err(reject)?;
        if owner != sender {
            debug!(
                "Transform of {} from {} ignored: owned by {}",
                message.object, sender, owner
            );
            return Ok(());
        }
        let mut object = handle.borrow_mut();
        object
            .owner_driven_mut()
            .map_err(reject)?
            .receive(&message, self.now);
        Ok(())
    }

    pub(crate) fn on_physics(&mut self, sender: PeerId, message: PhysicsSync) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.owner, "PhysicsSync")?;
        let handle = self.lookup_or_adopt(message.object, PeerId::UNOWNED, true);
        let outcome = handle
            .borrow_mut()
            .contested_mut()
            .map_err(reject)?
            .receive(&message, self.local, self.now);
        match outcome {
            Some(ClaimOutcome::Accepted { .. }) => {
                self.objects
                    .rebind(message.object, message.owner)
                    .map_err(reject)?;
                self.events.push_authority_change(message.object, message.owner);
            }
            Some(ClaimOutcome::Rejected { holder }) => {
                debug!(
                    "Physics of {} from {} ignored: held by {}",
                    message.object, sender, holder
                );
            }
            None => {}
        }
        Ok(())
    }

    pub(crate) fn on_authority_request(
        &mut self,
        sender: PeerId,
        message: AuthorityRequest,
    ) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.requester, "AuthorityRequest")?;
        let handle = self.lookup_or_adopt(message.object, PeerId::UNOWNED, true);
        let outcome = handle
            .borrow_mut()
            .contested_mut()
            .map_err(reject)?
            .apply_request(message.requester, self.now);
        if let ClaimOutcome::Accepted { previous } = outcome {
            debug!(
                "Authority over {} moved from {} to {}",
                message.object, previous, message.requester
            );
            self.objects
                .rebind(message.object, message.requester)
                .map_err(reject)?;
            self.events
                .push_authority_change(message.object, message.requester);
        }
        Ok(())
    }

    pub(crate) fn on_world_state(&mut self, sender: PeerId, message: WorldStateUpdate) -> Result<(), HandlerError> {
        let mut changes = Vec::new();
        self.world.apply_update(sender, &message, &mut changes);
        self.apply_world_changes(changes);
        Ok(())
    }

    pub(crate) fn on_record_update(&mut self, sender: PeerId, message: RecordUpdate) -> Result<(), HandlerError> {
        let mut changes = Vec::new();
        self.world.apply_record_update(sender, &message, &mut changes);
        self.apply_world_changes(changes);
        Ok(())
    }

    pub(crate) fn on_snapshot_request(
        &mut self,
        sender: PeerId,
        message: SnapshotRequest,
    ) -> Result<(), HandlerError> {
        Self::check_sender(sender, message.requester, "SnapshotRequest")?;
        if !self.world.is_reconciled() || self.snapshot_source(sender) != Some(self.local) {
            return Ok(());
        }
        let snapshot = self.world.build_snapshot();
        info!(
            "Answering snapshot request from {} with {} records",
            sender,
            snapshot.records.len()
        );
        self.outbox.send_to(sender, &snapshot)?;
        Ok(())
    }

    pub(crate) fn on_snapshot_response(
        &mut self,
        sender: PeerId,
        message: SnapshotResponse,
    ) -> Result<(), HandlerError> {
        if self.world.is_acting_authority() {
            debug!("Ignoring snapshot from {}: local peer is the authority", sender);
            return Ok(());
        }
        let source = self.snapshot_source(self.local);
        self.snapshot.on_response(sender, source);
        let mut changes = Vec::new();
        self.world.apply_snapshot(&message, &mut changes);
        self.world.finish_reconcile();
        info!(
            "Applied snapshot from {}: {} records, {} changes",
            sender,
            message.records.len(),
            changes.len()
        );
        self.apply_world_changes(changes);
        self.events.push_snapshot_applied(sender);
        Ok(())
    }
}

fn reject(error: ObjectError) -> HandlerError {
    HandlerError::Rejected {
        reason: error.to_string(),
    }
}

use std::{cell::RefCell, collections::BTreeMap, mem, rc::Rc, time::Instant};

use log::{debug, info, warn};

use peerlink_shared::{
    AuthorityRequest, BarrierProgress, ClaimOutcome, HandlerError, Message, MessageDispatcher,
    NetworkObject, ObjectError, ObjectId, OwnerAssign, PacketTransport, PeerId, PhysicsState, PhysicsSync,
    Place, PresenceChange, PresenceDirectory, PresenceState, Protocol, ReadyState, RecordUpdate,
    RegistrationError, Role, RoleAssignment, RosterEvent, RosterSource, SharedRecord,
    SharedWorldState, SnapshotPoll, SnapshotRequest, SnapshotResponse, Transform, TransformSync,
    TransitionAck, WorldStateUpdate,
};

use crate::{events::Events, state::SessionState, PeerlinkError, SessionConfig};

/// One peer's view of the session.
///
/// Call `tick` once per frame. Each tick applies roster changes, drains and
/// applies every inbound packet, re-evaluates authority, runs timers and
/// periodic sends, and only then flushes outbound packets.
pub struct Session<T: PacketTransport, R: RosterSource> {
    transport: T,
    roster: R,
    dispatcher: MessageDispatcher<SessionState>,
    state: SessionState,
}

impl<T: PacketTransport, R: RosterSource> Session<T, R> {
    /// Create a new Session
    pub fn new(
        config: SessionConfig,
        mut protocol: Protocol,
        local: PeerId,
        transport: T,
        roster: R,
        now: Instant,
    ) -> Result<Self, PeerlinkError> {
        if !protocol.is_locked() {
            protocol.try_lock()?;
        }

        let members = roster.members();
        let name = members
            .iter()
            .find(|member| member.id == local)
            .map(|member| member.name.clone())
            .unwrap_or_default();

        let mut state = SessionState::new(config, local, &name, now);
        let mut changes = Vec::new();
        for member in members.iter().filter(|member| member.id != local) {
            if let Some(change) = state.presence.join(member.id, &member.name, now) {
                changes.push(change);
            }
        }
        state.presence.set_host(roster.session_host());
        state.apply_presence_changes(changes);

        // joining a running session: pull its world before acting on it
        if !state.presence.remote_ids().is_empty() {
            state.world.begin_reconcile();
            if let Some(request) = state.snapshot.request(now) {
                state.outbox.send_to_all(&request)?;
            }
        }
        state.refresh_authority();

        let mut dispatcher = MessageDispatcher::new(protocol.message_kinds.clone());
        register_handlers(&mut dispatcher)?;

        info!("Session started for {} with {} peers", local, members.len());

        Ok(Self {
            transport,
            roster,
            dispatcher,
            state,
        })
    }

    // Tick

    /// Runs one synchronization step and returns what happened
    pub fn tick(&mut self, now: Instant) -> Events {
        self.state.now = now;

        self.process_roster();
        self.state.refresh_authority();

        self.drain_inbound();
        self.state.refresh_authority();

        self.run_timers();
        self.send_objects();
        self.publish_world();

        self.state.outbox.flush(&mut self.transport);

        mem::take(&mut self.state.events)
    }

    fn process_roster(&mut self) {
        while let Some(event) = self.roster.poll_event() {
            match event {
                RosterEvent::Joined(member) => {
                    if member.id == self.state.local {
                        continue;
                    }
                    let now = self.state.now;
                    if let Some(change) = self.state.presence.join(member.id, &member.name, now) {
                        self.state.apply_presence_changes(vec![change]);
                    }
                    self.introduce_to(member.id);
                }
                RosterEvent::Left(peer) => self.forget_peer(peer),
                RosterEvent::HostChanged(host) => {
                    info!("Session host is now {}", host);
                    self.state.presence.set_host(Some(host));
                }
            }
        }
    }

    /// Tells a newly joined peer where the local peer is
    fn introduce_to(&mut self, peer: PeerId) {
        let Some(record) = self.state.presence.local_record() else {
            return;
        };
        let presence = PresenceState {
            peer: self.state.local,
            place: record.place,
            role: record.role,
        };
        let ready = ReadyState {
            peer: self.state.local,
            ready: record.ready,
        };
        self.queue_to(peer, &presence);
        self.queue_to(peer, &ready);
    }

    fn forget_peer(&mut self, peer: PeerId) {
        if self.state.presence.leave(peer).is_none() {
            return;
        }
        self.state
            .apply_presence_changes(vec![PresenceChange::Left(peer)]);
        if self.state.presence.remote_ids().is_empty() {
            self.state.world.finish_reconcile();
        }

        if let BarrierProgress::Completed { epoch } = self.state.barrier.forget_peer(peer) {
            self.state.events.push_barrier_completion(epoch);
        }

        // contested objects held by the departed peer become free
        for id in self.state.objects.owned_by(peer) {
            let Ok(handle) = self.state.objects.lookup(id) else {
                continue;
            };
            let released = match handle.borrow_mut().contested_mut() {
                Ok(sync) => {
                    sync.release();
                    true
                }
                Err(_) => false,
            };
            if released && self.state.objects.rebind(id, PeerId::UNOWNED).is_ok() {
                debug!("{} released by departed {}", id, peer);
                self.state.events.push_authority_change(id, PeerId::UNOWNED);
            }
        }
    }

    fn drain_inbound(&mut self) {
        loop {
            match self.transport.try_receive() {
                Ok(Some(packet)) => {
                    self.dispatcher
                        .dispatch(&mut self.state, packet.sender, &packet.payload);
                }
                Ok(None) => break,
                Err(error) => {
                    warn!("Transport receive failed: {}", error);
                    self.state.events.push_error(error.into());
                    break;
                }
            }
        }
    }

    fn run_timers(&mut self) {
        let now = self.state.now;
        if let Some(timeout) = self.state.barrier.poll(now) {
            self.state.events.push_barrier_timeout(timeout);
        }
        match self.state.snapshot.poll(now) {
            SnapshotPoll::Retry { attempt, request } => {
                info!("Snapshot request attempt {}", attempt);
                self.queue_to_all(&request);
            }
            SnapshotPoll::GaveUp { attempts } => {
                // nobody answered; carry on with the local copy
                self.state.world.finish_reconcile();
                self.state.events.push_snapshot_failed(attempts);
            }
            SnapshotPoll::Idle | SnapshotPoll::Waiting => {}
        }
    }

    fn send_objects(&mut self) {
        let now = self.state.now;
        let local = self.state.local;
        for id in self.state.objects.ids() {
            let Ok(handle) = self.state.objects.lookup(id) else {
                continue;
            };
            let Ok(owner) = self.state.objects.owner(id) else {
                continue;
            };
            let mut object = handle.borrow_mut();
            let mut transform = None;
            let mut physics = None;
            if object.is_contested() {
                if let Ok(sync) = object.contested_mut() {
                    physics = sync.poll_send(now, id, local);
                    if physics.is_none() && sync.holder() != local {
                        sync.render(now);
                    }
                }
            } else if let Ok(sync) = object.owner_driven_mut() {
                transform = sync.poll_send(now, id, owner, local);
                if transform.is_none() && owner != local {
                    sync.render(now);
                }
            }
            drop(object);
            if let Some(message) = transform {
                self.queue_to_all(&message);
            }
            if let Some(message) = physics {
                self.queue_to_all(&message);
            }
        }
    }

    fn publish_world(&mut self) {
        let Some(publish) = self
            .state
            .world
            .poll_publish(self.state.now, &self.state.presence)
        else {
            return;
        };
        if let Err(error) = self
            .state
            .outbox
            .push(publish.recipient.clone(), &publish.update)
        {
            warn!("Failed to encode world state: {}", error);
        }
        for record in &publish.records {
            if let Err(error) = self.state.outbox.push(publish.recipient.clone(), record) {
                warn!("Failed to encode record {}: {}", record.id, error);
            }
        }
    }

    fn queue_to<M: Message>(&mut self, peer: PeerId, message: &M) {
        if let Err(error) = self.state.outbox.send_to(peer, message) {
            warn!("Failed to encode {}: {}", M::NAME, error);
        }
    }

    fn queue_to_all<M: Message>(&mut self, message: &M) {
        if let Err(error) = self.state.outbox.send_to_all(message) {
            warn!("Failed to encode {}: {}", M::NAME, error);
        }
    }

    fn broadcast_presence(&mut self) {
        let Some(record) = self.state.presence.local_record() else {
            return;
        };
        let presence = PresenceState {
            peer: self.state.local,
            place: record.place,
            role: record.role,
        };
        self.queue_to_all(&presence);
    }

    // Presence

    pub fn local_id(&self) -> PeerId {
        self.state.local
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn presence(&self) -> &PresenceDirectory {
        &self.state.presence
    }

    pub fn host(&self) -> Option<PeerId> {
        self.state.presence.host()
    }

    pub fn is_host(&self) -> bool {
        self.state.presence.is_host()
    }

    /// Moves the local peer and tells everyone
    pub fn set_place(&mut self, place: Place) {
        let mut changes = Vec::new();
        self.state
            .presence
            .set_place(self.state.local, place, self.state.now, &mut changes);
        let changed = !changes.is_empty();
        self.state.apply_presence_changes(changes);
        if changed {
            self.broadcast_presence();
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        let mut changes = Vec::new();
        self.state
            .presence
            .set_ready(self.state.local, ready, self.state.now, &mut changes);
        if changes.is_empty() {
            return;
        }
        self.state.apply_presence_changes(changes);
        let message = ReadyState {
            peer: self.state.local,
            ready,
        };
        self.queue_to_all(&message);
    }

    // Barrier

    /// Starts a collective transition. Only the session host may call this.
    ///
    /// Every remote roster member needs a role in `roles`; the local peer's
    /// role, if given, is applied immediately.
    pub fn begin_transition(&mut self, now: Instant, roles: &BTreeMap<PeerId, Role>) -> Result<u8, PeerlinkError> {
        let remotes = self.state.presence.remote_ids();
        let start = self
            .state
            .barrier
            .begin(now, self.state.presence.host(), &remotes, roles)?;

        if let Some(role) = start.local_role {
            let mut changes = Vec::new();
            let local = self.state.local;
            self.state.presence.set_role(local, role, now, &mut changes);
            self.state
                .presence
                .set_place(local, role.target_place(), now, &mut changes);
            self.state.apply_presence_changes(changes);
            self.broadcast_presence();
        }
        for assignment in &start.assignments {
            self.queue_to(assignment.peer, assignment);
        }
        if start.completed {
            self.state.events.push_barrier_completion(start.epoch);
        }
        Ok(start.epoch)
    }

    /// Reports that the local peer finished moving to `place`.
    /// Acknowledges the pending transition if `place` is its target.
    pub fn complete_transition(&mut self, place: Place) -> bool {
        self.set_place(place);
        let Some(ack) = self.state.participant.complete(place) else {
            return false;
        };
        match self.state.presence.host() {
            Some(host) => {
                self.queue_to(host, &ack);
                true
            }
            None => {
                warn!("Transition {} completed with no session host to ack", ack.epoch);
                false
            }
        }
    }

    pub fn is_barrier_pending(&self) -> bool {
        self.state.barrier.is_pending()
    }

    pub fn expected_acks(&self) -> Vec<PeerId> {
        self.state.barrier.expected_acks()
    }

    // Objects

    /// Spawns an owner-driven object. The returned handle is the only strong
    /// reference; dropping it tears the object down.
    pub fn spawn_owned(&mut self, id: ObjectId, owner: PeerId) -> Result<Rc<RefCell<NetworkObject>>, PeerlinkError> {
        let handle = Rc::new(RefCell::new(self.state.new_owner_driven(id)));
        self.state.objects.try_register(id, &handle, owner)?;
        self.queue_to_all(&OwnerAssign { object: id, owner });
        Ok(handle)
    }

    /// Spawns an unowned contested object
    pub fn spawn_contested(&mut self, id: ObjectId) -> Result<Rc<RefCell<NetworkObject>>, PeerlinkError> {
        let handle = Rc::new(RefCell::new(self.state.new_contested(id)));
        self.state
            .objects
            .try_register(id, &handle, PeerId::UNOWNED)?;
        Ok(handle)
    }

    /// Removes an object from shared scope
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        self.state.adopted.remove(&id);
        self.state.objects.unregister(id)
    }

    pub fn object(&mut self, id: ObjectId) -> Result<Rc<RefCell<NetworkObject>>, PeerlinkError> {
        Ok(self.state.objects.lookup(id)?)
    }

    pub fn owner(&mut self, id: ObjectId) -> Result<PeerId, PeerlinkError> {
        Ok(self.state.objects.owner(id)?)
    }

    /// Hands an owner-driven object to `owner` and tells everyone. Only the
    /// current owner may do this, or the host for an unowned object.
    pub fn set_owner(&mut self, id: ObjectId, owner: PeerId) -> Result<(), PeerlinkError> {
        let handle = self.state.objects.lookup(id)?;
        let local = self.state.local;
        if !self.state.may_assign_owner(local, id, owner) {
            let current = self.state.objects.owner(id)?;
            return Err(ObjectError::NotOwner { id, owner: current }.into());
        }
        handle.borrow_mut().owner_driven_mut()?.on_owner_changed();
        let previous = self.state.objects.rebind(id, owner)?;
        if previous != owner {
            self.state.events.push_owner_change(id, owner);
        }
        self.queue_to_all(&OwnerAssign { object: id, owner });
        Ok(())
    }

    /// Records the local owner's transform for the next send
    pub fn set_transform(&mut self, id: ObjectId, transform: Transform) -> Result<(), PeerlinkError> {
        let handle = self.state.objects.lookup(id)?;
        handle.borrow_mut().owner_driven_mut()?.set_transform(transform);
        Ok(())
    }

    /// Records the holder's simulated state for the next send
    pub fn set_physics(&mut self, id: ObjectId, state: PhysicsState) -> Result<(), PeerlinkError> {
        let handle = self.state.objects.lookup(id)?;
        handle.borrow_mut().contested_mut()?.set_state(state);
        Ok(())
    }

    /// Asks for authority over a contested object after a local interaction.
    /// Returns whether a request was made.
    pub fn request_authority(&mut self, now: Instant, id: ObjectId) -> Result<bool, PeerlinkError> {
        let local = self.state.local;
        let handle = self.state.objects.lookup(id)?;
        let outcome = {
            let mut object = handle.borrow_mut();
            let sync = object.contested_mut()?;
            if !sync.should_request(local, now) {
                return Ok(false);
            }
            sync.apply_request(local, now)
        };
        if let ClaimOutcome::Accepted { .. } = outcome {
            self.state.objects.rebind(id, local)?;
            self.state.events.push_authority_change(id, local);
        }
        self.queue_to_all(&AuthorityRequest {
            object: id,
            requester: local,
        });
        Ok(true)
    }

    // World

    pub fn world(&self) -> &SharedWorldState {
        self.state.world.state()
    }

    pub fn elected_authority(&self) -> Option<PeerId> {
        self.state.world.authority()
    }

    pub fn is_world_authority(&self) -> bool {
        self.state.world.is_authority()
    }

    pub fn set_world_scalar(&mut self, scalar: f32) -> Result<(), PeerlinkError> {
        let mut changes = Vec::new();
        self.state.world.try_set_scalar(scalar, &mut changes)?;
        self.state.apply_world_changes(changes);
        Ok(())
    }

    pub fn set_world_flag(&mut self, index: u8, value: bool) -> Result<(), PeerlinkError> {
        let mut changes = Vec::new();
        self.state.world.try_set_flag(index, value, &mut changes)?;
        self.state.apply_world_changes(changes);
        Ok(())
    }

    pub fn set_world_record(&mut self, id: u32, record: SharedRecord) -> Result<(), PeerlinkError> {
        let mut changes = Vec::new();
        self.state.world.try_set_record(id, record, &mut changes)?;
        self.state.apply_world_changes(changes);
        Ok(())
    }

    /// Asks the session for the full world. A new session already does this
    /// when it joins a populated roster. Returns whether a new pull started.
    pub fn request_snapshot(&mut self, now: Instant) -> bool {
        let Some(request) = self.state.snapshot.request(now) else {
            return false;
        };
        self.queue_to_all(&request);
        true
    }

    /// Whether the local world copy has been pulled from the session
    pub fn is_reconciled(&self) -> bool {
        self.state.world.is_reconciled()
    }

    pub fn is_snapshot_pending(&self) -> bool {
        self.state.snapshot.is_pending()
    }

    // Extension

    /// Registers a handler for an extension message declared on the protocol
    pub fn try_register_message<M, F>(&mut self, handler: F) -> Result<(), PeerlinkError>
    where
        M: Message,
        F: FnMut(&mut SessionState, PeerId, M) -> Result<(), HandlerError> + 'static,
    {
        self.dispatcher.try_register_message::<M, F>(handler)?;
        Ok(())
    }

    /// Queues an extension message to every peer
    pub fn send_to_all<M: Message>(&mut self, message: &M) -> Result<(), PeerlinkError> {
        self.state.outbox.send_to_all(message)?;
        Ok(())
    }

    /// Queues an extension message to one peer
    pub fn send_to<M: Message>(&mut self, peer: PeerId, message: &M) -> Result<(), PeerlinkError> {
        self.state.outbox.send_to(peer, message)?;
        Ok(())
    }

    // Transport

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn roster_mut(&mut self) -> &mut R {
        &mut self.roster
    }
}

fn register_handlers(dispatcher: &mut MessageDispatcher<SessionState>) -> Result<(), RegistrationError> {
    dispatcher
        .try_register_message::<PresenceState, _>(|state, sender, message| {
            state.on_presence(sender, message)
        })?;
    dispatcher
        .try_register_message::<ReadyState, _>(|state, sender, message| {
            state.on_ready(sender, message)
        })?;
    dispatcher
        .try_register_message::<RoleAssignment, _>(|state, sender, message| {
            state.on_role_assignment(sender, message)
        })?;
    dispatcher
        .try_register_message::<TransitionAck, _>(|state, sender, message| {
            state.on_transition_ack(sender, message)
        })?;
    dispatcher
        .try_register_message::<OwnerAssign, _>(|state, sender, message| {
            state.on_owner_assign(sender, message)
        })?;
    dispatcher
        .try_register_message::<TransformSync, _>(|state, sender, message| {
            state.on_transform(sender, message)
        })?;
    dispatcher
        .try_register_message::<PhysicsSync, _>(|state, sender, message| {
            state.on_physics(sender, message)
        })?;
    dispatcher
        .try_register_message::<AuthorityRequest, _>(|state, sender, message| {
            state.on_authority_request(sender, message)
        })?;
    dispatcher
        .try_register_message::<WorldStateUpdate, _>(|state, sender, message| {
            state.on_world_state(sender, message)
        })?;
    dispatcher
        .try_register_message::<RecordUpdate, _>(|state, sender, message| {
            state.on_record_update(sender, message)
        })?;
    dispatcher
        .try_register_message::<SnapshotRequest, _>(|state, sender, message| {
            state.on_snapshot_request(sender, message)
        })?;
    dispatcher
        .try_register_message::<SnapshotResponse, _>(|state, sender, message| {
            state.on_snapshot_response(sender, message)
        })?;
    Ok(())
}

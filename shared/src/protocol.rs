use std::time::Duration;

use crate::messages::{
    channels::{
        channel::{Channel, ChannelMode, ChannelSettings},
        channel_kinds::ChannelKinds,
    },
    error::RegistrationError,
    message::Message,
    message_kinds::MessageKinds,
    presence::{PresenceState, ReadyState},
    replication::{AuthorityRequest, OwnerAssign, PhysicsSync, TransformSync},
    snapshot::{SnapshotRequest, SnapshotResponse},
    transition::{RoleAssignment, TransitionAck},
    world_state::{RecordUpdate, WorldStateUpdate},
};

pub mod error;
pub use error::ProtocolError;

// Protocol
pub struct Protocol {
    pub channel_kinds: ChannelKinds,
    pub message_kinds: MessageKinds,
    /// The duration between each synchronization tick
    pub tick_interval: Duration,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        let channel_kinds = ChannelKinds::default_channels();
        let mut message_kinds = MessageKinds::new();
        if let Err(error) = declare_builtin_messages(&mut message_kinds, &channel_kinds) {
            panic!("Built-in message kinds disagree with the default channels: {}", error);
        }

        Self {
            channel_kinds,
            message_kinds,
            tick_interval: Duration::from_millis(50),
            locked: false,
        }
    }
}

fn declare_builtin_messages(
    message_kinds: &mut MessageKinds,
    channel_kinds: &ChannelKinds,
) -> Result<(), RegistrationError> {
    message_kinds.try_add_message::<PresenceState>(channel_kinds)?;
    message_kinds.try_add_message::<ReadyState>(channel_kinds)?;
    message_kinds.try_add_message::<RoleAssignment>(channel_kinds)?;
    message_kinds.try_add_message::<TransitionAck>(channel_kinds)?;
    message_kinds.try_add_message::<OwnerAssign>(channel_kinds)?;
    message_kinds.try_add_message::<TransformSync>(channel_kinds)?;
    message_kinds.try_add_message::<PhysicsSync>(channel_kinds)?;
    message_kinds.try_add_message::<AuthorityRequest>(channel_kinds)?;
    message_kinds.try_add_message::<WorldStateUpdate>(channel_kinds)?;
    message_kinds.try_add_message::<RecordUpdate>(channel_kinds)?;
    message_kinds.try_add_message::<SnapshotRequest>(channel_kinds)?;
    message_kinds.try_add_message::<SnapshotResponse>(channel_kinds)?;
    Ok(())
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn tick_interval(&mut self, duration: Duration) -> &mut Self {
        self.check_lock();
        self.tick_interval = duration;
        self
    }

    /// Configure an additional channel
    ///
    /// # Panics
    ///
    /// Panics if the protocol is locked or the channel already exists.
    pub fn add_channel(&mut self, channel: Channel, mode: ChannelMode) -> &mut Self {
        if let Err(error) = self.try_add_channel(channel, mode) {
            panic!("{}", error);
        }
        self
    }

    /// Declare an externally supplied message kind
    ///
    /// # Panics
    ///
    /// Panics if the protocol is locked or the kind conflicts with a declared one.
    pub fn add_message<M: Message>(&mut self) -> &mut Self {
        if let Err(error) = self.try_add_message::<M>() {
            panic!("{}", error);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_tick_interval(&mut self, duration: Duration) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.tick_interval = duration;
        Ok(self)
    }

    pub fn try_add_channel(
        &mut self,
        channel: Channel,
        mode: ChannelMode,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.channel_kinds
            .try_add_channel(channel, ChannelSettings::new(mode))?;
        Ok(self)
    }

    pub fn try_add_message<M: Message>(&mut self) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.message_kinds.try_add_message::<M>(&self.channel_kinds)?;
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    /// Returns Err if protocol is locked
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}

use std::{any::TypeId, collections::HashMap};

use crate::messages::{
    channels::{channel::Channel, channel_kinds::ChannelKinds},
    error::RegistrationError,
    message::Message,
};

/// What the registry knows about one declared message kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageKindInfo {
    pub tag: u8,
    pub name: &'static str,
    pub channel: Channel,
    pub reliable: bool,
}

/// Tag ↔ type table of every declared message kind.
#[derive(Clone, Debug, Default)]
pub struct MessageKinds {
    tag_map: HashMap<u8, MessageKindInfo>,
    type_map: HashMap<TypeId, u8>,
}

impl MessageKinds {
    pub fn new() -> Self {
        Self {
            tag_map: HashMap::new(),
            type_map: HashMap::new(),
        }
    }

    /// Declares `M`, checking it against the configured channels.
    ///
    /// Fails if the type or its tag is already declared, or if its
    /// reliability disagrees with its channel.
    pub fn try_add_message<M: Message>(
        &mut self,
        channel_kinds: &ChannelKinds,
    ) -> Result<(), RegistrationError> {
        if self.type_map.contains_key(&TypeId::of::<M>()) {
            return Err(RegistrationError::DuplicateMessageType { name: M::NAME });
        }
        if let Some(existing) = self.tag_map.get(&M::TAG) {
            return Err(RegistrationError::DuplicateTag {
                tag: M::TAG,
                existing: existing.name,
                new: M::NAME,
            });
        }
        let Some(settings) = channel_kinds.settings(&M::CHANNEL) else {
            return Err(RegistrationError::ChannelNotConfigured {
                name: M::NAME,
                channel: M::CHANNEL.index(),
            });
        };
        if settings.reliable() != M::RELIABLE {
            return Err(RegistrationError::ReliabilityMismatch {
                name: M::NAME,
                channel: M::CHANNEL.index(),
                reliable: M::RELIABLE,
            });
        }

        self.type_map.insert(TypeId::of::<M>(), M::TAG);
        self.tag_map.insert(
            M::TAG,
            MessageKindInfo {
                tag: M::TAG,
                name: M::NAME,
                channel: M::CHANNEL,
                reliable: M::RELIABLE,
            },
        );
        Ok(())
    }

    pub fn contains<M: Message>(&self) -> bool {
        self.type_map.contains_key(&TypeId::of::<M>())
    }

    pub fn info(&self, tag: u8) -> Option<&MessageKindInfo> {
        self.tag_map.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.tag_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_map.is_empty()
    }
}

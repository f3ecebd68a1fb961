use std::collections::BTreeMap;

use crate::messages::{
    channels::channel::{Channel, ChannelMode, ChannelSettings},
    error::RegistrationError,
};

/// Static table of the channels a session uses and their reliability class.
#[derive(Clone, Debug, Default)]
pub struct ChannelKinds {
    channels: BTreeMap<Channel, ChannelSettings>,
}

impl ChannelKinds {
    pub fn new() -> Self {
        Self {
            channels: BTreeMap::new(),
        }
    }

    /// The five channels of the reference session
    pub fn default_channels() -> Self {
        let mut kinds = Self::new();
        for (channel, mode) in [
            (Channel::CONTROL, ChannelMode::OrderedReliable),
            (Channel::TRANSFORM, ChannelMode::UnorderedUnreliable),
            (Channel::PHYSICS, ChannelMode::UnorderedUnreliable),
            (Channel::VOICE, ChannelMode::UnorderedUnreliable),
            (Channel::WORLD, ChannelMode::UnorderedReliable),
        ] {
            kinds.channels.insert(channel, ChannelSettings::new(mode));
        }
        kinds
    }

    pub fn try_add_channel(
        &mut self,
        channel: Channel,
        settings: ChannelSettings,
    ) -> Result<(), RegistrationError> {
        if self.channels.contains_key(&channel) {
            return Err(RegistrationError::DuplicateChannel {
                channel: channel.index(),
            });
        }
        self.channels.insert(channel, settings);
        Ok(())
    }

    pub fn settings(&self, channel: &Channel) -> Option<&ChannelSettings> {
        self.channels.get(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&Channel, &ChannelSettings)> {
        self.channels.iter()
    }
}

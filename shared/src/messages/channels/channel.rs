use std::fmt;

/// A logical lane over the transport, identified by a small index.
///
/// The reference session uses five channels, exposed as constants; the
/// reliability class of each lives in [`ChannelKinds`](super::channel_kinds::ChannelKinds).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Presence, barrier and authority control traffic
    pub const CONTROL: Channel = Channel(0);
    /// Owner-driven transform samples
    pub const TRANSFORM: Channel = Channel(1);
    /// Contested physics samples
    pub const PHYSICS: Channel = Channel(2);
    /// Reserved for the voice collaborator
    pub const VOICE: Channel = Channel(3);
    /// Elected world-state publication
    pub const WORLD: Channel = Channel(4);

    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// Delivery guaranteed, order preserved within the channel
    OrderedReliable,
    /// Delivery guaranteed, no ordering
    UnorderedReliable,
    /// Fire and forget
    UnorderedUnreliable,
}

impl ChannelMode {
    pub fn reliable(&self) -> bool {
        match self {
            ChannelMode::OrderedReliable | ChannelMode::UnorderedReliable => true,
            ChannelMode::UnorderedUnreliable => false,
        }
    }

    pub fn ordered(&self) -> bool {
        matches!(self, ChannelMode::OrderedReliable)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSettings {
    pub mode: ChannelMode,
}

impl ChannelSettings {
    pub fn new(mode: ChannelMode) -> Self {
        Self { mode }
    }

    pub fn reliable(&self) -> bool {
        self.mode.reliable()
    }
}

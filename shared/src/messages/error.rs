use peerlink_serde::BoundsError;
use thiserror::Error;

/// Reasons an inbound packet cannot be read as the message its tag declares.
/// Always a drop-and-warn condition: peers may run mismatched versions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Packet has no bytes at all, not even a tag
    #[error("Empty packet carries no message tag")]
    Empty,

    /// Packet is shorter than the fixed layout of its message type
    #[error("Packet for {name} is {actual} bytes, expected at least {expected}")]
    TooShort {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Packet was routed to a decoder for a different tag
    #[error("Packet tag {actual:#04x} does not match {name} ({expected:#04x})")]
    UnexpectedTag {
        name: &'static str,
        expected: u8,
        actual: u8,
    },

    /// A field carried a value outside of its domain
    #[error("Invalid value {value} for field '{field}'")]
    InvalidField {
        field: &'static str,
        value: u64,
    },

    /// A variable-length section ran past the end of the packet
    #[error("Codec error: {0}")]
    Bounds(#[from] BoundsError),
}

/// Registration conflicts. Raised at registration time, never deferred to
/// first use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The same handler name was registered twice for one tag
    #[error("Handler '{name}' is already registered for tag {tag:#04x}")]
    DuplicateHandler {
        tag: u8,
        name: &'static str,
    },

    /// A message type was registered twice
    #[error("Message type {name} is already registered")]
    DuplicateMessageType {
        name: &'static str,
    },

    /// Two message types claim the same tag
    #[error("Tag {tag:#04x} of {new} is already used by {existing}")]
    DuplicateTag {
        tag: u8,
        existing: &'static str,
        new: &'static str,
    },

    /// A typed handler was registered for a message kind the protocol never declared
    #[error("Message kind {name} must be declared with Protocol::add_message() before a handler can be registered")]
    MessageKindNotDeclared {
        name: &'static str,
    },

    /// A message was declared on a channel the protocol does not configure
    #[error("Message {name} uses channel {channel}, which is not configured")]
    ChannelNotConfigured {
        name: &'static str,
        channel: u8,
    },

    /// Message reliability disagrees with its channel's mode
    #[error("Message {name} requires reliable={reliable}, but channel {channel} does not provide it")]
    ReliabilityMismatch {
        name: &'static str,
        channel: u8,
        reliable: bool,
    },

    /// Channels are static configuration and cannot be redefined
    #[error("Channel {channel} is already configured")]
    DuplicateChannel {
        channel: u8,
    },
}

/// Failure reported by a message handler. The dispatcher logs it and moves on
/// to the next handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Malformed packet: {0}")]
    Malformed(#[from] MessageError),

    #[error("Failed to encode reply: {0}")]
    Encode(#[from] BoundsError),

    #[error("Rejected: {reason}")]
    Rejected {
        reason: String,
    },
}

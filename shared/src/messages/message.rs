use peerlink_serde::BoundsError;

use crate::messages::{channels::channel::Channel, error::MessageError};

/// Tags of the message kinds every peer understands. Externally supplied
/// kinds pick any tag not listed here and declare it on the `Protocol`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    PresenceState = 0x01,
    ReadyState = 0x02,
    RoleAssignment = 0x03,
    TransitionAck = 0x04,
    OwnerAssign = 0x10,
    TransformSync = 0x11,
    PhysicsSync = 0x12,
    AuthorityRequest = 0x13,
    WorldState = 0x20,
    RecordUpdate = 0x21,
    SnapshotRequest = 0x22,
    SnapshotResponse = 0x23,
}

impl MessageType {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        let message_type = match tag {
            0x01 => MessageType::PresenceState,
            0x02 => MessageType::ReadyState,
            0x03 => MessageType::RoleAssignment,
            0x04 => MessageType::TransitionAck,
            0x10 => MessageType::OwnerAssign,
            0x11 => MessageType::TransformSync,
            0x12 => MessageType::PhysicsSync,
            0x13 => MessageType::AuthorityRequest,
            0x20 => MessageType::WorldState,
            0x21 => MessageType::RecordUpdate,
            0x22 => MessageType::SnapshotRequest,
            0x23 => MessageType::SnapshotResponse,
            _ => return None,
        };
        Some(message_type)
    }
}

/// A structured message with its own tag, channel and reliability.
///
/// `serialize` produces the full packet, tag byte included. `deserialize`
/// receives the full packet as delivered to handlers, tag byte included.
pub trait Message: Sized + 'static {
    const TAG: u8;
    const NAME: &'static str;
    const CHANNEL: Channel;
    const RELIABLE: bool;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError>;

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError>;
}

/// Checks the tag and minimum length of a packet before a layout is read.
/// Every `Message::deserialize`, built-in or not, starts with this.
pub fn check_header<M: Message>(packet: &[u8], min_len: usize) -> Result<(), MessageError> {
    let Some(tag) = packet.first() else {
        return Err(MessageError::Empty);
    };
    if *tag != M::TAG {
        return Err(MessageError::UnexpectedTag {
            name: M::NAME,
            expected: M::TAG,
            actual: *tag,
        });
    }
    if packet.len() < min_len {
        return Err(MessageError::TooShort {
            name: M::NAME,
            expected: min_len,
            actual: packet.len(),
        });
    }
    Ok(())
}

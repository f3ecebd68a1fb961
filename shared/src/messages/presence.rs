use peerlink_serde::{read, write, BoundsError};

use crate::{
    messages::{
        channels::channel::Channel,
        error::MessageError,
        message::{check_header, Message, MessageType},
    },
    types::{PeerId, Place, Role},
};

/// A peer announcing where it is and what it plays.
///
/// `tag | peer: u64 | place: u8 | role: u8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresenceState {
    pub peer: PeerId,
    pub place: Place,
    pub role: Role,
}

impl Message for PresenceState {
    const TAG: u8 = MessageType::PresenceState.tag();
    const NAME: &'static str = "PresenceState";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 11];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.peer.to_u64())?;
        let offset = write(&mut buffer, offset, &self.place.to_u8())?;
        write(&mut buffer, offset, &self.role.to_u8())?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 11)?;
        let (peer, offset) = read::<u64>(packet, 1)?;
        let (place, offset) = read::<u8>(packet, offset)?;
        let (role, _) = read::<u8>(packet, offset)?;
        Ok(Self {
            peer: PeerId::new(peer),
            place: Place::try_from(place)?,
            role: Role::try_from(role)?,
        })
    }
}

/// `tag | peer: u64 | ready: u8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyState {
    pub peer: PeerId,
    pub ready: bool,
}

impl Message for ReadyState {
    const TAG: u8 = MessageType::ReadyState.tag();
    const NAME: &'static str = "ReadyState";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 10];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.peer.to_u64())?;
        write(&mut buffer, offset, &u8::from(self.ready))?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 10)?;
        let (peer, offset) = read::<u64>(packet, 1)?;
        let (ready, _) = read::<u8>(packet, offset)?;
        let ready = match ready {
            0 => false,
            1 => true,
            other => {
                return Err(MessageError::InvalidField {
                    field: "ready",
                    value: u64::from(other),
                })
            }
        };
        Ok(Self {
            peer: PeerId::new(peer),
            ready,
        })
    }
}

use peerlink_serde::{read, write, BoundsError};

use crate::{
    messages::{
        channels::channel::Channel,
        error::MessageError,
        message::{check_header, Message, MessageType},
    },
    types::{PeerId, Place, Role},
};

/// The host telling one peer which role to take for barrier `epoch`.
///
/// `tag | peer: u64 | role: u8 | epoch: u8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleAssignment {
    pub peer: PeerId,
    pub role: Role,
    pub epoch: u8,
}

impl Message for RoleAssignment {
    const TAG: u8 = MessageType::RoleAssignment.tag();
    const NAME: &'static str = "RoleAssignment";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 11];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.peer.to_u64())?;
        let offset = write(&mut buffer, offset, &self.role.to_u8())?;
        write(&mut buffer, offset, &self.epoch)?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 11)?;
        let (peer, offset) = read::<u64>(packet, 1)?;
        let (role, offset) = read::<u8>(packet, offset)?;
        let (epoch, _) = read::<u8>(packet, offset)?;
        Ok(Self {
            peer: PeerId::new(peer),
            role: Role::try_from(role)?,
            epoch,
        })
    }
}

/// A peer reporting it reached `place` for barrier `epoch`.
///
/// `tag | peer: u64 | place: u8 | epoch: u8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionAck {
    pub peer: PeerId,
    pub place: Place,
    pub epoch: u8,
}

impl Message for TransitionAck {
    const TAG: u8 = MessageType::TransitionAck.tag();
    const NAME: &'static str = "TransitionAck";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 11];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.peer.to_u64())?;
        let offset = write(&mut buffer, offset, &self.place.to_u8())?;
        write(&mut buffer, offset, &self.epoch)?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 11)?;
        let (peer, offset) = read::<u64>(packet, 1)?;
        let (place, offset) = read::<u8>(packet, offset)?;
        let (epoch, _) = read::<u8>(packet, offset)?;
        Ok(Self {
            peer: PeerId::new(peer),
            place: Place::try_from(place)?,
            epoch,
        })
    }
}

use peerlink_serde::{read, write, BoundsError, Quat, Vec3};

use crate::{
    messages::{
        channels::channel::Channel,
        error::MessageError,
        message::{check_header, Message, MessageType},
    },
    types::{ObjectId, PeerId},
};

/// Out-of-band ownership change of an owner-driven object.
///
/// `tag | object: u32 | owner: u64`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerAssign {
    pub object: ObjectId,
    pub owner: PeerId,
}

impl Message for OwnerAssign {
    const TAG: u8 = MessageType::OwnerAssign.tag();
    const NAME: &'static str = "OwnerAssign";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 13];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.object.to_u32())?;
        write(&mut buffer, offset, &self.owner.to_u64())?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 13)?;
        let (object, offset) = read::<u32>(packet, 1)?;
        let (owner, _) = read::<u64>(packet, offset)?;
        Ok(Self {
            object: ObjectId::new(object),
            owner: PeerId::new(owner),
        })
    }
}

/// A peer asking for authority over a contested object.
///
/// `tag | object: u32 | requester: u64`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorityRequest {
    pub object: ObjectId,
    pub requester: PeerId,
}

impl Message for AuthorityRequest {
    const TAG: u8 = MessageType::AuthorityRequest.tag();
    const NAME: &'static str = "AuthorityRequest";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 13];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.object.to_u32())?;
        write(&mut buffer, offset, &self.requester.to_u64())?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 13)?;
        let (object, offset) = read::<u32>(packet, 1)?;
        let (requester, _) = read::<u64>(packet, offset)?;
        Ok(Self {
            object: ObjectId::new(object),
            requester: PeerId::new(requester),
        })
    }
}

/// Owner-driven transform sample.
///
/// `tag | object: u32 | owner: u64 | position: 3×f32 | rotation: 4×f32 | velocity: 3×f32`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSync {
    pub object: ObjectId,
    pub owner: PeerId,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl TransformSync {
    pub const SIZE: usize = 53;
}

impl Message for TransformSync {
    const TAG: u8 = MessageType::TransformSync.tag();
    const NAME: &'static str = "TransformSync";
    const CHANNEL: Channel = Channel::TRANSFORM;
    const RELIABLE: bool = false;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; Self::SIZE];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.object.to_u32())?;
        let offset = write(&mut buffer, offset, &self.owner.to_u64())?;
        let offset = write(&mut buffer, offset, &self.position)?;
        let offset = write(&mut buffer, offset, &self.rotation)?;
        write(&mut buffer, offset, &self.velocity)?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, Self::SIZE)?;
        let (object, offset) = read::<u32>(packet, 1)?;
        let (owner, offset) = read::<u64>(packet, offset)?;
        let (position, offset) = read::<Vec3>(packet, offset)?;
        let (rotation, offset) = read::<Quat>(packet, offset)?;
        let (velocity, _) = read::<Vec3>(packet, offset)?;
        Ok(Self {
            object: ObjectId::new(object),
            owner: PeerId::new(owner),
            position,
            rotation,
            velocity,
        })
    }
}

/// Contested physics sample: a transform sample plus angular velocity.
///
/// `TransformSync layout | angular_velocity: 3×f32`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsSync {
    pub object: ObjectId,
    pub owner: PeerId,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl PhysicsSync {
    pub const SIZE: usize = 65;
}

impl Message for PhysicsSync {
    const TAG: u8 = MessageType::PhysicsSync.tag();
    const NAME: &'static str = "PhysicsSync";
    const CHANNEL: Channel = Channel::PHYSICS;
    const RELIABLE: bool = false;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; Self::SIZE];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.object.to_u32())?;
        let offset = write(&mut buffer, offset, &self.owner.to_u64())?;
        let offset = write(&mut buffer, offset, &self.position)?;
        let offset = write(&mut buffer, offset, &self.rotation)?;
        let offset = write(&mut buffer, offset, &self.linear_velocity)?;
        write(&mut buffer, offset, &self.angular_velocity)?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, Self::SIZE)?;
        let (object, offset) = read::<u32>(packet, 1)?;
        let (owner, offset) = read::<u64>(packet, offset)?;
        let (position, offset) = read::<Vec3>(packet, offset)?;
        let (rotation, offset) = read::<Quat>(packet, offset)?;
        let (linear_velocity, offset) = read::<Vec3>(packet, offset)?;
        let (angular_velocity, _) = read::<Vec3>(packet, offset)?;
        Ok(Self {
            object: ObjectId::new(object),
            owner: PeerId::new(owner),
            position,
            rotation,
            linear_velocity,
            angular_velocity,
        })
    }
}

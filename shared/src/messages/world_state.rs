use peerlink_serde::{read, write, BoundsError, PacketReader, PacketWriter};

use crate::{
    messages::{
        channels::channel::Channel,
        error::MessageError,
        message::{check_header, Message, MessageType},
    },
    world::world_state::SharedRecord,
};

/// Full scalar + flag word of the shared world, published by the elected
/// authority.
///
/// `tag | scalar: f32 | flags: u32`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldStateUpdate {
    pub scalar: f32,
    pub flags: u32,
}

impl Message for WorldStateUpdate {
    const TAG: u8 = MessageType::WorldState.tag();
    const NAME: &'static str = "WorldState";
    const CHANNEL: Channel = Channel::WORLD;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut buffer = vec![0u8; 9];
        let offset = write(&mut buffer, 0, &Self::TAG)?;
        let offset = write(&mut buffer, offset, &self.scalar)?;
        write(&mut buffer, offset, &self.flags)?;
        Ok(buffer)
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 9)?;
        let (scalar, offset) = read::<f32>(packet, 1)?;
        let (flags, _) = read::<u32>(packet, offset)?;
        Ok(Self { scalar, flags })
    }
}

/// One per-id record changed on the authority.
///
/// `tag | id: u32 | state: u8 | len: u16 | payload`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: u32,
    pub record: SharedRecord,
}

impl Message for RecordUpdate {
    const TAG: u8 = MessageType::RecordUpdate.tag();
    const NAME: &'static str = "RecordUpdate";
    const CHANNEL: Channel = Channel::WORLD;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut writer = PacketWriter::with_capacity(8 + self.record.payload().len());
        writer.write(&Self::TAG)?;
        write_record(&mut writer, self.id, &self.record)?;
        Ok(writer.to_bytes())
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 8)?;
        let mut reader = PacketReader::at(packet, 1);
        let (id, record) = read_record(&mut reader)?;
        Ok(Self { id, record })
    }
}

/// `id: u32 | state: u8 | len: u16 | payload`
pub(crate) fn write_record(
    writer: &mut PacketWriter,
    id: u32,
    record: &SharedRecord,
) -> Result<(), BoundsError> {
    writer.write(&id)?;
    writer.write(&record.state())?;
    // SharedRecord guarantees the payload fits the u16 prefix
    writer.write(&(record.payload().len() as u16))?;
    writer.write_bytes(record.payload());
    Ok(())
}

pub(crate) fn read_record(reader: &mut PacketReader) -> Result<(u32, SharedRecord), MessageError> {
    let id = reader.read::<u32>()?;
    let state = reader.read::<u8>()?;
    let len = reader.read::<u16>()?;
    let payload = reader.read_bytes(usize::from(len))?;
    Ok((id, SharedRecord::from_wire(state, payload.to_vec())))
}

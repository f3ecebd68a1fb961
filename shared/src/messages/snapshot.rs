use log::warn;
use peerlink_serde::{BoundsError, PacketReader, PacketWriter};

use crate::{
    messages::{
        channels::channel::Channel,
        error::MessageError,
        message::{check_header, Message, MessageType},
        world_state::{read_record, write_record},
    },
    types::PeerId,
    world::world_state::SharedRecord,
};

/// A joining peer asking the elected authority for the full world.
///
/// `tag | requester: u64`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub requester: PeerId,
}

impl Message for SnapshotRequest {
    const TAG: u8 = MessageType::SnapshotRequest.tag();
    const NAME: &'static str = "SnapshotRequest";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let mut writer = PacketWriter::with_capacity(9);
        writer.write(&Self::TAG)?;
        writer.write(&self.requester.to_u64())?;
        Ok(writer.to_bytes())
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, 9)?;
        let mut reader = PacketReader::at(packet, 1);
        Ok(Self {
            requester: PeerId::new(reader.read::<u64>()?),
        })
    }
}

/// Full authoritative world state.
///
/// `tag | scalar: f32 | flags: u32 | count: u16 | count × record | peer_count: u8`
///
/// `peer_count` is reserved for per-peer state and is always written as zero.
/// Readers stop after it, so newer writers may append per-peer entries.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotResponse {
    pub scalar: f32,
    pub flags: u32,
    pub records: Vec<(u32, SharedRecord)>,
}

impl SnapshotResponse {
    /// Bytes before the first record
    const HEADER_LEN: usize = 1 + 4 + 4 + 2;
    /// Smallest encoded record: id, state, empty payload
    const MIN_RECORD_LEN: usize = 4 + 1 + 2;
}

impl Message for SnapshotResponse {
    const TAG: u8 = MessageType::SnapshotResponse.tag();
    const NAME: &'static str = "SnapshotResponse";
    const CHANNEL: Channel = Channel::CONTROL;
    const RELIABLE: bool = true;

    fn serialize(&self) -> Result<Vec<u8>, BoundsError> {
        let count = self.records.len().min(usize::from(u16::MAX));
        if count < self.records.len() {
            warn!(
                "Snapshot holds {} records, only the first {} fit the count prefix",
                self.records.len(),
                count
            );
        }

        let mut writer = PacketWriter::with_capacity(Self::HEADER_LEN + 1 + count * 8);
        writer.write(&Self::TAG)?;
        writer.write(&self.scalar)?;
        writer.write(&self.flags)?;
        writer.write(&(count as u16))?;
        for (id, record) in self.records.iter().take(count) {
            write_record(&mut writer, *id, record)?;
        }
        writer.write(&0u8)?;
        Ok(writer.to_bytes())
    }

    fn deserialize(packet: &[u8]) -> Result<Self, MessageError> {
        check_header::<Self>(packet, Self::HEADER_LEN + 1)?;
        let mut reader = PacketReader::at(packet, 1);
        let scalar = reader.read::<f32>()?;
        let flags = reader.read::<u32>()?;
        let count = reader.read::<u16>()?;

        // the count is untrusted; reserve only what the packet could hold
        let fits = reader.remaining() / Self::MIN_RECORD_LEN;
        let mut records = Vec::with_capacity(usize::from(count).min(fits));
        for _ in 0..count {
            records.push(read_record(&mut reader)?);
        }

        // reserved per-peer section; entries, if any, are a newer format
        let _peer_count = reader.read::<u8>()?;

        Ok(Self {
            scalar,
            flags,
            records,
        })
    }
}

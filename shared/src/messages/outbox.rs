use std::mem;

use log::{trace, warn};
use peerlink_serde::BoundsError;

use crate::{
    messages::{channels::channel::Channel, constants::UNRELIABLE_PACKET_LIMIT_BYTES, message::Message},
    transport::PacketTransport,
    types::PeerId,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    One(PeerId),
    All,
    /// An explicit subset of the roster, e.g. peers in one place
    Many(Vec<PeerId>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingPacket {
    pub recipient: Recipient,
    pub channel: Channel,
    pub reliable: bool,
    pub name: &'static str,
    pub payload: Vec<u8>,
}

/// Packets queued during one tick, flushed to the transport after every
/// inbound packet has been applied.
#[derive(Default)]
pub struct Outbox {
    packets: Vec<OutgoingPacket>,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            packets: Vec::new(),
        }
    }

    pub fn push<M: Message>(&mut self, recipient: Recipient, message: &M) -> Result<(), BoundsError> {
        let payload = message.serialize()?;
        if !M::RELIABLE && payload.len() > UNRELIABLE_PACKET_LIMIT_BYTES {
            warn!(
                "{} is {} bytes on unreliable {}, above the {} byte fragmentation limit",
                M::NAME,
                payload.len(),
                M::CHANNEL,
                UNRELIABLE_PACKET_LIMIT_BYTES
            );
        }
        self.packets.push(OutgoingPacket {
            recipient,
            channel: M::CHANNEL,
            reliable: M::RELIABLE,
            name: M::NAME,
            payload,
        });
        Ok(())
    }

    pub fn send_to<M: Message>(&mut self, peer: PeerId, message: &M) -> Result<(), BoundsError> {
        self.push(Recipient::One(peer), message)
    }

    pub fn send_to_all<M: Message>(&mut self, message: &M) -> Result<(), BoundsError> {
        self.push(Recipient::All, message)
    }

    pub fn send_to_many<M: Message>(&mut self, peers: Vec<PeerId>, message: &M) -> Result<(), BoundsError> {
        self.push(Recipient::Many(peers), message)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn packets(&self) -> &[OutgoingPacket] {
        &self.packets
    }

    pub fn take(&mut self) -> Vec<OutgoingPacket> {
        mem::take(&mut self.packets)
    }

    /// Hands every queued packet to the transport. Sends are fire-and-forget:
    /// a transport error is logged and the remaining packets still go out.
    /// Returns how many transport sends succeeded.
    pub fn flush(&mut self, transport: &mut dyn PacketTransport) -> usize {
        let mut sent = 0;
        for packet in self.take() {
            trace!("Sending {} on {} to {:?}", packet.name, packet.channel, packet.recipient);
            let mut report = |result: Result<(), _>| match result {
                Ok(()) => sent += 1,
                Err(error) => warn!("Failed to send {}: {}", packet.name, error),
            };
            match &packet.recipient {
                Recipient::One(peer) => report(transport.send(
                    *peer,
                    &packet.payload,
                    packet.channel,
                    packet.reliable,
                )),
                Recipient::All => {
                    report(transport.broadcast(&packet.payload, packet.channel, packet.reliable))
                }
                Recipient::Many(peers) => {
                    for peer in peers {
                        report(transport.send(
                            *peer,
                            &packet.payload,
                            packet.channel,
                            packet.reliable,
                        ));
                    }
                }
            }
        }
        sent
    }
}

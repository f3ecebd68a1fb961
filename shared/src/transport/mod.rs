mod error;
mod roster;

pub use error::TransportError;
pub use roster::{RosterEvent, RosterMember, RosterSource};

use crate::{messages::channels::channel::Channel, types::PeerId};

/// A packet drained from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub sender: PeerId,
    pub channel: Channel,
    pub payload: Box<[u8]>,
}

/// Raw peer-to-peer send and receive, supplied by the embedding application.
///
/// The session never opens or closes connections itself. Sends are
/// fire-and-forget and receives never block.
pub trait PacketTransport {
    /// Sends a packet to one peer
    fn send(
        &mut self,
        peer: PeerId,
        payload: &[u8],
        channel: Channel,
        reliable: bool,
    ) -> Result<(), TransportError>;

    /// Sends a packet to every connected peer
    fn broadcast(
        &mut self,
        payload: &[u8],
        channel: Channel,
        reliable: bool,
    ) -> Result<(), TransportError>;

    /// Receives the next pending packet, if any
    fn try_receive(&mut self) -> Result<Option<ReceivedPacket>, TransportError>;

    fn is_connected(&self) -> bool;

    fn connected_peer_count(&self) -> usize;
}

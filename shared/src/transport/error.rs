use thiserror::Error;

use crate::types::PeerId;

/// Errors a transport may report back to the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No connection to the addressed peer
    #[error("Peer {peer} is not connected. The packet was not sent")]
    PeerNotConnected { peer: PeerId },

    /// The local endpoint has lost its session
    #[error("Transport is disconnected from the session")]
    Disconnected,
}

use thiserror::Error;

use peerlink_shared::{
    AuthorityError, BarrierError, BoundsError, ObjectError, ProtocolError, RegistrationError,
    TransportError, WorldError,
};

/// Errors surfaced at the session boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeerlinkError {
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("Barrier error: {0}")]
    Barrier(#[from] BarrierError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// A message did not fit its own layout
    #[error("Encode error: {0}")]
    Encode(#[from] BoundsError),
}

use thiserror::Error;

use crate::types::PeerId;

/// Errors that can occur when starting a barrier transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarrierError {
    /// Only the session host may start a transition
    #[error("{local} is not the session host (host is {host:?}). Only the host may start a transition")]
    NotHost { local: PeerId, host: Option<PeerId> },

    /// A transition is already waiting for acknowledgements
    #[error("Barrier {epoch} is still waiting for acknowledgements. Only one barrier may be pending")]
    AlreadyPending { epoch: u8 },

    /// A roster member was given no role
    #[error("No role given for roster member {peer}. Every peer must be assigned a role")]
    MissingRole { peer: PeerId },
}

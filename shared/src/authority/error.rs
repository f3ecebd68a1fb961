use thiserror::Error;

use crate::types::PeerId;

/// Errors that can occur when mutating authority-protected state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The local peer is not the elected authority
    #[error("{local} is not the authority for the shared world (authority is {authority}). Local mutation rejected")]
    NotAuthority { local: PeerId, authority: PeerId },

    /// The local peer is the authority but has not pulled the session's state yet
    #[error("{local} has not reconciled with the session yet. Local mutation rejected until a snapshot arrives")]
    Unreconciled { local: PeerId },

    /// Flag index outside the 32-bit field
    #[error("Flag index {index} is out of range. The world has 32 flags")]
    FlagIndexOutOfRange { index: u8 },
}

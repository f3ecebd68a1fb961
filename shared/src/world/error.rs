use thiserror::Error;

use crate::types::{ObjectId, PeerId};

/// Errors that can occur when addressing shared objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// No live object is registered under the id
    #[error("Object {id} not found. It was never registered or has been torn down")]
    NotFound { id: ObjectId },

    /// A different live object already holds the id
    #[error("Object id {id} collides with a live object owned by {owner}. Ids must be unique")]
    IdCollision { id: ObjectId, owner: PeerId },

    /// The object exists but uses another authority model
    #[error("Object {id} is not a {expected} object")]
    WrongModel { id: ObjectId, expected: &'static str },

    /// Only the recorded owner may hand the object on
    #[error("Object {id} is owned by {owner}. Only its owner may reassign it")]
    NotOwner { id: ObjectId, owner: PeerId },
}

/// Errors that can occur when building shared world records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// A record payload does not fit the u16 length prefix
    #[error("Record payload is {len} bytes but at most {max} bytes fit on the wire")]
    PayloadTooLarge { len: usize, max: usize },
}

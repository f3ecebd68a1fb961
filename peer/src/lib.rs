//! # Peerlink Peer
//! A per-tick synchronization session for a small peer-to-peer group.
//! Each peer runs one `Session` over a `PacketTransport` and a
//! `RosterSource`, and reads back what happened as `Events`.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use peerlink_shared::{
    ObjectId, PeerId, PhysicsState, Place, Protocol, Role, SharedRecord, Transform,
};

mod config;
mod error;
mod events;
mod session;
mod state;

pub use config::SessionConfig;
pub use error::PeerlinkError;
pub use events::{
    AuthorityChangedEvent, BarrierCompletedEvent, BarrierTimedOutEvent,
    ElectedAuthorityChangedEvent, ErrorEvent, Event, Events, FlagClearedEvent, FlagRaisedEvent,
    JoinedEvent, LeftEvent, ObjectSpawnedEvent, OwnerChangedEvent, PlaceChangedEvent,
    ReadyEvent, RecordChangedEvent, RoleChangedEvent, SnapshotAppliedEvent, SnapshotFailedEvent,
    TransitionRequestedEvent, WorldScalarChangedEvent,
};
pub use session::Session;
pub use state::SessionState;

//! # Peerlink Shared
//! Message routing, authority models, and synchronization protocols shared
//! by every peer of a small-group session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use peerlink_serde::{
    read, write, BoundsError, PacketReader, PacketWriter, Quat, Vec3, WireType, QUAT_EPSILON,
};

mod authority;
mod barrier;
mod messages;
mod protocol;
mod snapshot;
mod transport;
mod types;
mod world;

pub use authority::{
    contested::{claim_wins, AuthorityClaim, ClaimOutcome, ContestedSync, PhysicsState},
    elected::{elected_authority, AuthorityChange, ElectedWorld, WorldPublish},
    error::AuthorityError,
    extrapolation::{Extrapolator, MotionSample},
    owner_driven::{AuthorityRole, OwnerDrivenSync, Transform},
};
pub use barrier::{
    AssignmentOutcome, BarrierCoordinator, BarrierError, BarrierParticipant, BarrierProgress,
    BarrierStart, BarrierTimeout, DeadlineTimer, TransitionRequest,
};
pub use messages::{
    channels::{
        channel::{Channel, ChannelMode, ChannelSettings},
        channel_kinds::ChannelKinds,
    },
    constants::{RECORD_PAYLOAD_LIMIT_BYTES, UNRELIABLE_PACKET_LIMIT_BYTES},
    dispatcher::{DispatchOutcome, Handler, MessageDispatcher},
    error::{HandlerError, MessageError, RegistrationError},
    message::{check_header, Message, MessageType},
    message_kinds::{MessageKindInfo, MessageKinds},
    outbox::{OutgoingPacket, Outbox, Recipient},
    presence::{PresenceState, ReadyState},
    replication::{AuthorityRequest, OwnerAssign, PhysicsSync, TransformSync},
    snapshot::{SnapshotRequest, SnapshotResponse},
    transition::{RoleAssignment, TransitionAck},
    world_state::{RecordUpdate, WorldStateUpdate},
};
pub use protocol::{Protocol, ProtocolError};
pub use snapshot::{SnapshotPoll, SnapshotReconciler};
pub use transport::{
    PacketTransport, ReceivedPacket, RosterEvent, RosterMember, RosterSource, TransportError,
};
pub use types::{ObjectId, PeerId, Place, Role};
pub use world::{
    error::{ObjectError, WorldError},
    network_object::{NetworkObject, ObjectModel},
    object_registry::ObjectRegistry,
    presence::{PeerRecord, PresenceChange, PresenceDirectory},
    world_state::{
        diff_flags, SharedRecord, SharedWorldState, WorldChange, FLAG_COUNT, SCALAR_MAX,
        SCALAR_MIN,
    },
};

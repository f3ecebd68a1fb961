use std::fmt;

use crate::messages::error::MessageError;

/// Stable 64-bit identifier of a session participant.
///
/// `PeerId::UNOWNED` (zero) never names a real peer; it marks shared state
/// nobody currently controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u64);

impl PeerId {
    pub const UNOWNED: PeerId = PeerId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn to_u64(self) -> u64 {
        self.0
    }

    pub const fn is_unowned(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// 32-bit identifier of a shared object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Derives an id from a stable name (scene path, prefab key, ...).
    /// Uses 32-bit FNV-1a so every peer computes the same id.
    pub fn derive(name: &str) -> Self {
        const OFFSET_BASIS: u32 = 0x811C_9DC5;
        const PRIME: u32 = 0x0100_0193;

        let mut hash = OFFSET_BASIS;
        for byte in name.as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(PRIME);
        }
        Self(hash)
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{:08x}", self.0)
    }
}

/// Where a peer currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Place {
    #[default]
    None = 0,
    Lobby = 1,
    RoleAArea = 2,
    RoleBArea = 3,
}

impl Place {
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Place {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Place::None),
            1 => Ok(Place::Lobby),
            2 => Ok(Place::RoleAArea),
            3 => Ok(Place::RoleBArea),
            _ => Err(MessageError::InvalidField {
                field: "place",
                value: u64::from(value),
            }),
        }
    }
}

/// The part a peer plays in the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    #[default]
    None = 0,
    Lobby = 1,
    RoleA = 2,
    RoleB = 3,
}

impl Role {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The place a peer assigned this role transitions to
    pub fn target_place(self) -> Place {
        match self {
            Role::None => Place::None,
            Role::Lobby => Place::Lobby,
            Role::RoleA => Place::RoleAArea,
            Role::RoleB => Place::RoleBArea,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::None),
            1 => Ok(Role::Lobby),
            2 => Ok(Role::RoleA),
            3 => Ok(Role::RoleB),
            _ => Err(MessageError::InvalidField {
                field: "role",
                value: u64::from(value),
            }),
        }
    }
}

use std::collections::BTreeMap;

use crate::{messages::constants::RECORD_PAYLOAD_LIMIT_BYTES, world::error::WorldError};

pub const SCALAR_MIN: f32 = 0.0;
pub const SCALAR_MAX: f32 = 100.0;
pub const FLAG_COUNT: u8 = 32;

/// Opaque per-id state, e.g. one console or one machine part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedRecord {
    state: u8,
    payload: Vec<u8>,
}

impl SharedRecord {
    pub fn try_new(state: u8, payload: Vec<u8>) -> Result<Self, WorldError> {
        if payload.len() > RECORD_PAYLOAD_LIMIT_BYTES {
            return Err(WorldError::PayloadTooLarge {
                len: payload.len(),
                max: RECORD_PAYLOAD_LIMIT_BYTES,
            });
        }
        Ok(Self { state, payload })
    }

    pub fn from_state(state: u8) -> Self {
        Self {
            state,
            payload: Vec::new(),
        }
    }

    // Length was read from a u16 prefix
    pub(crate) fn from_wire(state: u8, payload: Vec<u8>) -> Self {
        Self { state, payload }
    }

    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// An observable change to the shared world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorldChange {
    ScalarChanged(f32),
    FlagRaised(u8),
    FlagCleared(u8),
    RecordChanged(u32),
}

/// Emits one change per bit that differs between `old` and `new`, lowest bit first.
pub fn diff_flags(old: u32, new: u32, changes: &mut Vec<WorldChange>) {
    let mut changed = old ^ new;
    while changed != 0 {
        let index = changed.trailing_zeros() as u8;
        if new & (1 << index) != 0 {
            changes.push(WorldChange::FlagRaised(index));
        } else {
            changes.push(WorldChange::FlagCleared(index));
        }
        changed &= changed - 1;
    }
}

/// The global record: a clamped scalar, 32 flags, and per-id records.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedWorldState {
    scalar: f32,
    flags: u32,
    records: BTreeMap<u32, SharedRecord>,
}

impl Default for SharedWorldState {
    fn default() -> Self {
        Self {
            scalar: SCALAR_MAX,
            flags: 0,
            records: BTreeMap::new(),
        }
    }
}

impl SharedWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(&self) -> f32 {
        self.scalar
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn flag(&self, index: u8) -> bool {
        index < FLAG_COUNT && self.flags & (1 << index) != 0
    }

    pub fn record(&self, id: u32) -> Option<&SharedRecord> {
        self.records.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = (&u32, &SharedRecord)> {
        self.records.iter()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Clamps into range; NaN is dropped.
    pub fn apply_scalar(&mut self, scalar: f32, changes: &mut Vec<WorldChange>) {
        if scalar.is_nan() {
            return;
        }
        let scalar = scalar.clamp(SCALAR_MIN, SCALAR_MAX);
        if scalar != self.scalar {
            self.scalar = scalar;
            changes.push(WorldChange::ScalarChanged(scalar));
        }
    }

    /// Used for routine updates and snapshots alike.
    pub fn apply_flags(&mut self, flags: u32, changes: &mut Vec<WorldChange>) {
        diff_flags(self.flags, flags, changes);
        self.flags = flags;
    }

    /// Callers check `index < FLAG_COUNT`.
    pub(crate) fn apply_flag(&mut self, index: u8, value: bool, changes: &mut Vec<WorldChange>) {
        let flags = if value {
            self.flags | (1 << index)
        } else {
            self.flags & !(1 << index)
        };
        self.apply_flags(flags, changes);
    }

    /// Overwrites unconditionally; only a differing record is reported.
    pub fn apply_record(&mut self, id: u32, record: SharedRecord, changes: &mut Vec<WorldChange>) {
        if self.records.get(&id) != Some(&record) {
            changes.push(WorldChange::RecordChanged(id));
        }
        self.records.insert(id, record);
    }
}

//! # Peerlink Serde
//! Fixed-layout, big-endian encoding of the primitives every peerlink packet
//! is built from. Writers and readers address the buffer by explicit byte
//! offset and never truncate: a write or read that would run past the end of
//! the buffer fails with a [`BoundsError`].

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod packet_reader;
mod packet_writer;
mod wire_type;

pub use error::BoundsError;
pub use glam::{Quat, Vec3};
pub use packet_reader::PacketReader;
pub use packet_writer::PacketWriter;
pub use wire_type::{read, write, WireType, QUAT_EPSILON};

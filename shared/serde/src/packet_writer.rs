use crate::{error::BoundsError, wire_type::WireType};

/// Growable packet buffer for layouts whose length is only known while
/// writing (count-prefixed lists, opaque payloads).
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Appends `value`, growing the buffer by exactly `T::SIZE` bytes
    pub fn write<T: WireType>(&mut self, value: &T) -> Result<(), BoundsError> {
        let offset = self.buffer.len();
        self.buffer.resize(offset + T::SIZE, 0);
        value.write_to(&mut self.buffer, offset)?;
        Ok(())
    }

    /// Appends raw bytes without a length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

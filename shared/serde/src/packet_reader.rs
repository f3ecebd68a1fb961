use crate::{error::BoundsError, wire_type::WireType};

/// Cursor over a received packet.
pub struct PacketReader<'b> {
    buffer: &'b [u8],
    offset: usize,
}

impl<'b> PacketReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Starts reading at `offset`, e.g. just past a tag byte that has
    /// already been inspected
    pub fn at(buffer: &'b [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    pub fn read<T: WireType>(&mut self) -> Result<T, BoundsError> {
        let (value, offset) = T::read_from(self.buffer, self.offset)?;
        self.offset = offset;
        Ok(value)
    }

    /// Borrows the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'b [u8], BoundsError> {
        BoundsError::check(len, self.offset, self.buffer.len())?;
        let start = self.offset;
        self.offset += len;
        Ok(&self.buffer[start..self.offset])
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

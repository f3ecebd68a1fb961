use glam::{Quat, Vec3};

use crate::error::BoundsError;

/// Squared magnitude under which a quaternion is treated as degenerate and
/// replaced by the identity rotation.
pub const QUAT_EPSILON: f32 = 1.0e-6;

/// A value with a fixed, big-endian wire representation.
pub trait WireType: Sized {
    /// Number of bytes the value occupies on the wire
    const SIZE: usize;

    /// Writes the value at `offset`, returning the offset just past it
    fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize, BoundsError>;

    /// Reads a value at `offset`, returning it with the offset just past it
    fn read_from(buffer: &[u8], offset: usize) -> Result<(Self, usize), BoundsError>;
}

/// Writes `value` into `buffer` at `offset` and returns the new offset.
pub fn write<T: WireType>(buffer: &mut [u8], offset: usize, value: &T) -> Result<usize, BoundsError> {
    value.write_to(buffer, offset)
}

/// Reads a `T` from `buffer` at `offset` and returns it with the new offset.
pub fn read<T: WireType>(buffer: &[u8], offset: usize) -> Result<(T, usize), BoundsError> {
    T::read_from(buffer, offset)
}

macro_rules! impl_wire_number {
    ($type:ty) => {
        impl WireType for $type {
            const SIZE: usize = std::mem::size_of::<$type>();

            fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize, BoundsError> {
                BoundsError::check(Self::SIZE, offset, buffer.len())?;
                let end = offset + Self::SIZE;
                buffer[offset..end].copy_from_slice(&self.to_be_bytes());
                Ok(end)
            }

            fn read_from(buffer: &[u8], offset: usize) -> Result<(Self, usize), BoundsError> {
                BoundsError::check(Self::SIZE, offset, buffer.len())?;
                let end = offset + Self::SIZE;
                let mut bytes = [0u8; std::mem::size_of::<$type>()];
                bytes.copy_from_slice(&buffer[offset..end]);
                Ok((<$type>::from_be_bytes(bytes), end))
            }
        }
    };
}

impl_wire_number!(u8);
impl_wire_number!(u16);
impl_wire_number!(u32);
impl_wire_number!(u64);
impl_wire_number!(f32);

impl WireType for Vec3 {
    const SIZE: usize = 12;

    fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize, BoundsError> {
        BoundsError::check(Self::SIZE, offset, buffer.len())?;
        let offset = self.x.write_to(buffer, offset)?;
        let offset = self.y.write_to(buffer, offset)?;
        self.z.write_to(buffer, offset)
    }

    fn read_from(buffer: &[u8], offset: usize) -> Result<(Self, usize), BoundsError> {
        BoundsError::check(Self::SIZE, offset, buffer.len())?;
        let (x, offset) = f32::read_from(buffer, offset)?;
        let (y, offset) = f32::read_from(buffer, offset)?;
        let (z, offset) = f32::read_from(buffer, offset)?;
        Ok((Vec3::new(x, y, z), offset))
    }
}

/// Quaternions travel as `x, y, z, w`. They are normalized before writing and
/// renormalized after reading.
impl WireType for Quat {
    const SIZE: usize = 16;

    fn write_to(&self, buffer: &mut [u8], offset: usize) -> Result<usize, BoundsError> {
        BoundsError::check(Self::SIZE, offset, buffer.len())?;
        let normalized = normalize_or_identity(*self);
        let offset = normalized.x.write_to(buffer, offset)?;
        let offset = normalized.y.write_to(buffer, offset)?;
        let offset = normalized.z.write_to(buffer, offset)?;
        normalized.w.write_to(buffer, offset)
    }

    fn read_from(buffer: &[u8], offset: usize) -> Result<(Self, usize), BoundsError> {
        BoundsError::check(Self::SIZE, offset, buffer.len())?;
        let (x, offset) = f32::read_from(buffer, offset)?;
        let (y, offset) = f32::read_from(buffer, offset)?;
        let (z, offset) = f32::read_from(buffer, offset)?;
        let (w, offset) = f32::read_from(buffer, offset)?;
        Ok((normalize_or_identity(Quat::from_xyzw(x, y, z, w)), offset))
    }
}

fn normalize_or_identity(quat: Quat) -> Quat {
    let length_squared = quat.length_squared();
    if !length_squared.is_finite() || length_squared < QUAT_EPSILON {
        return Quat::IDENTITY;
    }
    quat / length_squared.sqrt()
}

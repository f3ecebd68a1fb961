use thiserror::Error;

/// A read or write would have touched bytes outside of the buffer.
///
/// This is a local programming error (a packet layout that does not match
/// its buffer), so it is always surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Access of {needed} bytes at offset {offset} exceeds buffer of length {len}")]
pub struct BoundsError {
    pub needed: usize,
    pub offset: usize,
    pub len: usize,
}

impl BoundsError {
    pub(crate) fn check(needed: usize, offset: usize, len: usize) -> Result<(), BoundsError> {
        match offset.checked_add(needed) {
            Some(end) if end <= len => Ok(()),
            _ => Err(BoundsError {
                needed,
                offset,
                len,
            }),
        }
    }
}

use std::mem;

use bytemuck::Pod;
use thiserror::Error;

/// A read that would run past the end of the buffer it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {size} bytes at offset {offset} exceeds buffer of {len} bytes")]
pub struct OutOfBounds {
    pub offset: usize,
    pub size: usize,
    pub len: usize,
}

/// Borrow `size` bytes starting at `offset`, failing instead of panicking on overflow.
pub fn read_slice(buffer: &[u8], offset: usize, size: usize) -> Result<&[u8], OutOfBounds> {
    offset
        .checked_add(size)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(OutOfBounds {
            offset,
            size,
            len: buffer.len(),
        })
}

/// Plain structs laid out exactly as they are stored on disk.
///
/// Implementors are `#[repr(C, packed)]`, so no alignment is assumed of the source buffer.
pub trait BinaryData: Pod {
    fn read(buffer: &[u8], offset: usize) -> Result<Self, OutOfBounds> {
        let bytes = read_slice(buffer, offset, mem::size_of::<Self>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Read `count` consecutive records starting at `offset`.
    fn read_array(buffer: &[u8], offset: usize, count: usize) -> Result<Vec<Self>, OutOfBounds> {
        let size = mem::size_of::<Self>();
        let total = size.checked_mul(count).ok_or(OutOfBounds {
            offset,
            size: usize::MAX,
            len: buffer.len(),
        })?;
        let bytes = read_slice(buffer, offset, total)?;

        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

//! Bounds-checked big-endian reads from a byte buffer.

use crate::IndexError;

/// Reads fixed-size big-endian fields at explicit offsets.
///
/// The reader holds no cursor of its own; the decoder owns the offset so that
/// a single value describes where in the index it is.
#[derive(Debug, Clone, Copy)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], IndexError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(IndexError::Truncated {
                offset,
                needed: len,
            })
    }

    /// Copy `N` bytes starting at `offset` into an array.
    pub fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], IndexError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }

    pub fn u16_be(&self, offset: usize) -> Result<u16, IndexError> {
        self.array::<2>(offset).map(u16::from_be_bytes)
    }

    pub fn u32_be(&self, offset: usize) -> Result<u32, IndexError> {
        self.array::<4>(offset).map(u32::from_be_bytes)
    }

    /// Position of the first `byte` at or after `from`, if any.
    pub fn find(&self, from: usize, byte: u8) -> Option<usize> {
        self.data
            .get(from..)?
            .iter()
            .position(|&b| b == byte)
            .map(|pos| from + pos)
    }
}

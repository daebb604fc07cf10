//! Decoder for the git index (`.git/index`, the "dircache").
//!
//! The index lists every tracked path together with its cached stat data and
//! the hash of its last-known content. This crate only reads it: the 12-byte
//! header is validated, then each variable-length, NUL-padded entry record is
//! decoded in on-disk order. Extensions and the trailing checksum are ignored.

pub mod decode;
pub mod entry;
pub mod reader;

pub use decode::{decode, DecodedIndex, IndexDecoder, Record, SkipReason, SkippedEntry};
pub use entry::{CacheTime, EntryFlags, EntryKind, EntryMetadata, IndexEntry, IndexHeader};
pub use error::IndexError;
pub use reader::BinaryReader;

/// Magic bytes at the start of every index file.
pub const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";

/// Index format versions this decoder accepts.
pub const SUPPORTED_VERSIONS: [u32; 3] = [2, 3, 4];

/// Size of the index header: signature, version, entry count.
pub const HEADER_SIZE: usize = 12;

/// Size of the fixed part of an entry record, before the path name.
pub const ENTRY_FIXED_SIZE: usize = 62;

/// Entry records are padded with NUL bytes to a multiple of this.
pub const ENTRY_ALIGNMENT: usize = 8;

mod error {
    /// Errors that make an index undecodable.
    ///
    /// Every variant is fatal for the whole index: once a record boundary is in
    /// doubt, no later offset can be trusted.
    #[derive(Debug, thiserror::Error)]
    pub enum IndexError {
        #[error("invalid index signature: expected \"DIRC\", got {0:?}")]
        InvalidSignature([u8; 4]),

        #[error("unsupported index version: {0}")]
        UnsupportedVersion(u32),

        #[error("non-zero padding byte at offset {offset}")]
        CorruptPadding { offset: usize },

        #[error("index truncated: needed {needed} bytes at offset {offset}")]
        Truncated { offset: usize, needed: usize },

        #[error("invalid index entry at offset {offset}: {reason}")]
        InvalidEntry { offset: usize, reason: String },
    }
}

//! Loose object extraction.
//!
//! A loose object is stored as the zlib-compressed bytes of
//! `"<type> <size>\0<content>"`. This crate inflates such a stream, parses
//! the header, and hands back the raw content.

mod extract;
pub mod header;

pub use extract::{extract, ContentExtractor, ExtractedObject};

/// Object types that can appear in a loose object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn from_bytes(s: &[u8]) -> Option<Self> {
        match s {
            b"blob" => Some(Self::Blob),
            b"tree" => Some(Self::Tree),
            b"commit" => Some(Self::Commit),
            b"tag" => Some(Self::Tag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from extracting a loose object.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("decompression failed: {0}")]
    DecompressionFailed(#[source] std::io::Error),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("object content is {actual} bytes but header says {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("inflated object exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

//! Read-only access to a `.git` directory published over plain HTTP.
//!
//! There is no protocol server on the other end: the index lives at
//! `<base>/index` and every loose object at `<base>/objects/xx/yyyy...`.
//! This crate turns responses into the small set of outcomes the
//! reconstruction pipeline acts on: content, "absent", "try again", or a
//! transport failure.

pub mod http;
pub mod url;

use git_hash::ObjectAddress;

pub use http::{HttpConfig, HttpObjectStore};
pub use url::RemoteUrl;

/// Errors that can occur while setting up a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

/// Why a single GET did not produce a body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// 404 / 410: the object is not there.
    #[error("not found")]
    NotFound,

    /// The origin reported a server-side or throttling fault.
    #[error("server error: HTTP {status}")]
    TransientServer { status: u16 },

    /// Any other non-success status (401, 403, ...).
    #[error("rejected: HTTP {status}")]
    Rejected { status: u16 },

    /// The body is larger than the configured limit.
    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// The request never completed (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientServer { .. } | Self::Transport(_))
    }

    /// Map an HTTP status to a fetch outcome; `None` for success.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 | 410 => Some(Self::NotFound),
            408 | 429 | 500..=599 => Some(Self::TransientServer { status }),
            _ => Some(Self::Rejected { status }),
        }
    }
}

/// Source of compressed loose objects.
///
/// Implementations perform exactly one attempt per call; retrying is the
/// caller's decision.
pub trait ObjectStore: Send + Sync {
    fn fetch(&self, address: &ObjectAddress) -> Result<Vec<u8>, FetchError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn fetch(&self, address: &ObjectAddress) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(address)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    fn fetch(&self, address: &ObjectAddress) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(address)
    }
}

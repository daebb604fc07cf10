//! Content hash identity for githarvest.
//!
//! Provides the 20-byte `ObjectId` that names every object in a remote
//! object directory, its hex codec, and the `ObjectAddress` split
//! (`xx/yyyy...`) used to locate a loose object under `objects/`.

mod error;
pub mod hex;
mod oid;

pub use error::HashError;
pub use oid::{ObjectAddress, ObjectId};

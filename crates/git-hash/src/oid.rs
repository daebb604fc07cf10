use std::fmt;
use std::str::FromStr;

use crate::{hex, HashError};

/// A content hash naming one object in the object directory.
///
/// Only SHA-1 repositories expose loose objects under the `xx/yyyy...`
/// layout this tool reads, so the digest is always 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Digest length in bytes.
    pub const LEN: usize = 20;

    /// The null (all-zeros) OID.
    pub const NULL: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an ObjectId from a raw byte slice of exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| HashError::InvalidHashLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Create an ObjectId from 40 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let mut arr = [0u8; 20];
        hex::decode_into(s, &mut arr)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Split into the loose-object directory and file names.
    pub fn address(&self) -> ObjectAddress {
        ObjectAddress {
            prefix: hex::encode(&self.0[..1]),
            suffix: hex::encode(&self.0[1..]),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Location of a loose object relative to `objects/`: the first byte as a
/// 2-character directory and the remaining 19 bytes as a 38-character name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectAddress {
    pub prefix: String,
    pub suffix: String,
}

impl ObjectAddress {
    /// `"xx/yyyy..."`, relative to the objects directory.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.prefix, self.suffix)
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

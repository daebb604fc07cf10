//! Index record types: IndexHeader, EntryMetadata, IndexEntry.

use bstr::BString;
use git_hash::ObjectId;

/// The 12-byte index header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub signature: [u8; 4],
    pub version: u32,
    pub entry_count: u32,
}

/// A cached timestamp as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheTime {
    pub secs: u32,
    pub nanos: u32,
}

/// Decoded view of the 16-bit flags word plus the v3 extended flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    /// CE_VALID: assume the entry is unchanged.
    pub assume_valid: bool,
    /// Extended flags follow the fixed record (v3+).
    pub extended: bool,
    /// Merge stage (0 = normal, 1 = base, 2 = ours, 3 = theirs).
    pub stage: u8,
    /// Low 12 bits of the flags word. `0xFFF` means "this long or longer".
    pub name_len: u16,
    pub skip_worktree: bool,
    pub intent_to_add: bool,
}

impl EntryFlags {
    /// Sentinel value of the name-length field for names of 0xFFF bytes or more.
    pub const NAME_MASK: u16 = 0x0FFF;

    pub fn from_raw(raw: u16) -> Self {
        Self {
            assume_valid: raw & 0x8000 != 0,
            extended: raw & 0x4000 != 0,
            stage: ((raw >> 12) & 0x03) as u8,
            name_len: raw & Self::NAME_MASK,
            skip_worktree: false,
            intent_to_add: false,
        }
    }

    /// True when the real name length is not stored in the flags word.
    pub fn has_long_name(&self) -> bool {
        self.name_len == Self::NAME_MASK
    }
}

/// What kind of working-tree object an entry describes, from its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Executable,
    Symlink,
    /// A submodule commit; its object lives in another repository.
    Gitlink,
    Other(u32),
}

impl EntryKind {
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 if mode & 0o111 != 0 => Self::Executable,
            0o100000 => Self::Regular,
            0o120000 => Self::Symlink,
            0o160000 => Self::Gitlink,
            _ => Self::Other(mode),
        }
    }
}

/// The fixed-size part of an entry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryMetadata {
    pub ctime: CacheTime,
    pub mtime: CacheTime,
    pub dev: u32,
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Size of the content when the index was written.
    pub size: u32,
    pub oid: ObjectId,
    pub flags: EntryFlags,
}

impl EntryMetadata {
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_mode(self.mode)
    }
}

/// One decoded entry: metadata, path, and the bytes its record consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub meta: EntryMetadata,
    /// Path relative to the repository root (not necessarily UTF-8).
    pub path: BString,
    /// Record length including name and padding; always a multiple of 8.
    pub record_len: usize,
}

impl IndexEntry {
    pub fn oid(&self) -> &ObjectId {
        &self.meta.oid
    }
}

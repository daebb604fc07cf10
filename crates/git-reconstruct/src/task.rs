//! Per-entry work items and path validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bstr::{BStr, ByteSlice};
use git_hash::{ObjectAddress, ObjectId};
use git_index::{EntryKind, IndexEntry};

use crate::SkipReason;

/// One index entry, ready to be fetched and written.
#[derive(Debug, Clone)]
pub struct ReconstructionTask {
    pub entry: IndexEntry,
    /// Where the object lives under `objects/`.
    pub address: ObjectAddress,
    /// Destination relative to the output root; validated to stay inside it.
    pub target: PathBuf,
}

impl ReconstructionTask {
    /// Build the task for `entry`, or say why it cannot be materialized.
    pub fn new(entry: IndexEntry) -> Result<Self, SkipReason> {
        if entry.meta.kind() == EntryKind::Gitlink {
            return Err(SkipReason::Submodule);
        }
        let target = safe_relative_path(entry.path.as_ref()).ok_or(SkipReason::UnsafePath)?;
        Ok(Self {
            address: entry.oid().address(),
            target,
            entry,
        })
    }

    pub fn oid(&self) -> &ObjectId {
        self.entry.oid()
    }

    pub fn path(&self) -> &BStr {
        self.entry.path.as_ref()
    }

    /// Size recorded in the index.
    pub fn declared_size(&self) -> u64 {
        u64::from(self.entry.meta.size)
    }

    pub fn is_executable(&self) -> bool {
        self.entry.meta.kind() == EntryKind::Executable
    }

    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(&self.target)
    }
}

/// Pick one entry per path.
///
/// An unmerged index lists a path once per conflict stage. Stage 0 wins if
/// present, then stage 2 ("ours"), then 3 ("theirs"), then 1 (the base). Among
/// equal stages the first entry wins. Returns one flag per entry: `true` for
/// the entry to write.
pub fn select_stages(entries: &[IndexEntry]) -> Vec<bool> {
    fn rank(stage: u8) -> u8 {
        match stage {
            0 => 0,
            2 => 1,
            3 => 2,
            _ => 3,
        }
    }

    let mut best: HashMap<&BStr, (u8, usize)> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let candidate = (rank(entry.meta.flags.stage), i);
        best.entry(entry.path.as_ref())
            .and_modify(|current| {
                if candidate.0 < current.0 {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut keep = vec![false; entries.len()];
    for (_, i) in best.into_values() {
        keep[i] = true;
    }
    keep
}

/// Convert an index path into a relative filesystem path that cannot leave
/// the output root.
///
/// Rejects empty paths, absolute paths, `.` and `..` components, empty
/// components, any `.git` component, and embedded NULs.
pub fn safe_relative_path(path: &BStr) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let mut out = PathBuf::new();
    for component in path.split_str("/") {
        if component.is_empty() || component == b"." || component == b".." {
            return None;
        }
        if component.eq_ignore_ascii_case(b".git") || component.contains(&0) {
            return None;
        }
        if cfg!(windows) && component.iter().any(|&b| b == b'\\' || b == b':') {
            return None;
        }
        out.push(component.to_path().ok()?);
    }
    Some(out)
}

//! Materializing content on disk.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Puts reconstructed content on disk.
pub trait Materializer: Send + Sync {
    /// Write `content` to `target` and return the number of bytes written.
    fn write(&self, target: &Path, content: &[u8], executable: bool) -> io::Result<u64>;
}

/// Writes through a temporary file and an atomic rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFileWriter;

impl Materializer for AtomicFileWriter {
    fn write(&self, target: &Path, content: &[u8], executable: bool) -> io::Result<u64> {
        materialize(target, content, executable)
    }
}

impl<M: Materializer + ?Sized> Materializer for &M {
    fn write(&self, target: &Path, content: &[u8], executable: bool) -> io::Result<u64> {
        (**self).write(target, content, executable)
    }
}

/// Write `content` to `target`, creating parent directories as needed.
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `target`, so readers never see a partial file and a
/// second run simply replaces the first.
fn materialize(target: &Path, content: &[u8], executable: bool) -> io::Result<u64> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Tolerates concurrent creators and directories left by a previous run.
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    set_mode(tmp.as_file(), executable)?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(content.len() as u64)
}

#[cfg(unix)]
fn set_mode(file: &fs::File, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _executable: bool) -> io::Result<()> {
    Ok(())
}

/// Whether a write failed because the process ran short of a resource
/// (file descriptors, memory) rather than because the path is unusable.
pub fn is_resource_exhausted(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory
    ) {
        return true;
    }
    #[cfg(unix)]
    {
        if let Some(code) = err.raw_os_error() {
            return matches!(code, libc::EMFILE | libc::ENFILE | libc::EAGAIN | libc::ENOMEM);
        }
    }
    false
}

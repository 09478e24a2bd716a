//! Crash-safe file replacement and creation.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

/// Writes `bytes` to `path` via a synced temp file in the same directory,
/// then renames it into place. Readers see either the old or the new file,
/// never a partial one.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let (dir, tmp) = synced_temp(path, bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir);
    Ok(())
}

/// Like [`write_atomic`], but never replaces an existing file: if `path`
/// already exists the call fails with [`io::ErrorKind::AlreadyExists`] and
/// the existing contents are untouched. Safe against other processes racing
/// on the same path.
pub(crate) fn create_new_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let (dir, tmp) = synced_temp(path, bytes)?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    sync_dir(dir);
    Ok(())
}

fn synced_temp<'a>(path: &'a Path, bytes: &[u8]) -> io::Result<(&'a Path, NamedTempFile)> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok((dir, tmp))
}

/// Reads a whole file, mapping `NotFound` to `None`.
pub(crate) fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

// Persists the rename itself. Best effort: the file is already in place, so a
// failure here is reported but not returned.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    let result = fs::File::open(dir).and_then(|d| d.sync_all());
    if let Err(e) = result {
        warn!(path = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

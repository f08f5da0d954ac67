//! Path-checked file primitives.
//!
//! Every primitive validates its path before touching the file system: an empty path or a path
//! with an interior NUL byte is rejected with [`SortError::InvalidPath`] and leaves no side effect.
//! A path that does not resolve to an existing file is reported as [`SortError::NotFound`].

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

use crate::sort::SortError;

/// Opens an existing file for reading.
pub fn open(path: &Path) -> Result<fs::File, SortError> {
    validate(path)?;
    fs::File::open(path).map_err(|err| map_error(path, err))
}

/// Creates a file for writing, truncating it if it already exists.
pub fn create(path: &Path) -> Result<fs::File, SortError> {
    validate(path)?;
    fs::File::create(path).map_err(|err| map_error(path, err))
}

/// Removes a file.
pub fn unlink(path: &Path) -> Result<(), SortError> {
    validate(path)?;
    fs::remove_file(path).map_err(|err| map_error(path, err))
}

/// Copies file content verbatim. Returns the number of bytes copied.
pub fn copy(source: &Path, destination: &Path) -> Result<u64, SortError> {
    let mut reader = open(source)?;
    let mut writer = create(destination)?;

    return io::copy(&mut reader, &mut writer).map_err(SortError::IO);
}

fn validate(path: &Path) -> Result<(), SortError> {
    let raw = path.as_os_str();
    if raw.is_empty() || has_nul(raw) {
        return Err(SortError::InvalidPath(path.into()));
    }

    return Ok(());
}

#[cfg(unix)]
fn has_nul(raw: &OsStr) -> bool {
    use std::os::unix::ffi::OsStrExt;

    raw.as_bytes().contains(&0)
}

#[cfg(not(unix))]
fn has_nul(raw: &OsStr) -> bool {
    raw.to_str().map_or(false, |s| s.contains('\0'))
}

fn map_error(path: &Path, err: io::Error) -> SortError {
    match err.kind() {
        io::ErrorKind::NotFound => SortError::NotFound(path.into()),
        io::ErrorKind::InvalidInput => SortError::InvalidPath(path.into()),
        _ => SortError::IO(err),
    }
}

//! Temporary file store.

use std::path::{Path, PathBuf};

use log;

use crate::ids::WorkId;
use crate::sort::SortError;

/// Directory holding the temporary files of a sorter, named after their work IDs.
/// The directory and everything left in it are removed when the store is dropped.
pub struct TempStore {
    dir: tempfile::TempDir,
}

impl TempStore {
    /// Creates a fresh temporary directory.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory to create the store in. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    pub fn new(tmp_path: Option<&Path>) -> Result<Self, SortError> {
        let dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(SortError::TempDir)?;

        log::info!("using {} as a temporary directory", dir.path().display());

        return Ok(TempStore { dir });
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of the temporary file named by `id`.
    pub fn path_for(&self, id: WorkId) -> PathBuf {
        self.dir.path().join(format!("{}.out", id))
    }
}

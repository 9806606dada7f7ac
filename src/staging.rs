//! Staged output files
//!
//! Outputs are rendered into a temporary file next to their destination and
//! only renamed into place by [`StagedOutput::commit`]. Dropping an uncommitted
//! [`StagedOutput`] removes the temporary file, so a failed run leaves nothing
//! behind.

use crate::errors::{Result, SpatialStatsError};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A fully written temporary file waiting to be moved onto its destination
#[derive(Debug)]
pub struct StagedOutput {
    temp: TempPath,
    destination: PathBuf,
}

impl StagedOutput {
    /// Reserve a temporary file in the destination's directory.
    ///
    /// The temporary name keeps the destination's extension, since some
    /// writers pick their format from it.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::OutputWrite`] if the directory is missing or unwritable.
    pub fn create(destination: &Path) -> Result<Self> {
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let suffix = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(".spatialstats-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|source| SpatialStatsError::OutputWrite {
                path: destination.to_path_buf(),
                source,
            })?
            .into_temp_path();

        log::debug!(
            "Staging {} as {}",
            destination.display(),
            temp.display()
        );

        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
        })
    }

    /// Path to write the content to
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Rename the staged file onto its destination, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::OutputWrite`] if the rename fails.
    pub fn commit(self) -> Result<PathBuf> {
        let Self { temp, destination } = self;
        temp.persist(&destination)
            .map_err(|e| SpatialStatsError::OutputWrite {
                path: destination.clone(),
                source: e.error,
            })?;
        log::info!("Wrote {}", destination.display());
        Ok(destination)
    }
}

//! Calibration image manifest loading

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KolosalError, Result};

/// Ordered list of calibration image paths
///
/// After loading, the list only ever changes through
/// [`SampleShuffler`](super::SampleShuffler), which permutes the entries in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageList {
    paths: Vec<PathBuf>,
}

impl ImageList {
    /// Build a list from already known paths
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a manifest with one image path per line.
    ///
    /// Surrounding whitespace is trimmed and blank lines are ignored. An empty
    /// manifest is valid and yields an empty list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => KolosalError::ManifestNotFound {
                path: path.to_path_buf(),
            },
            _ => KolosalError::ManifestUnreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let mut paths = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| KolosalError::ManifestUnreadable {
                path: path.to_path_buf(),
                source: e,
            })?;
            let entry = line.trim();
            if !entry.is_empty() {
                paths.push(PathBuf::from(entry));
            }
        }

        debug!(manifest = %path.display(), images = paths.len(), "Loaded calibration manifest");
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths in their current order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Path at `index`
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    /// Number of full batches of `batch_size` the list can supply
    pub fn full_batches(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.paths.len() / batch_size
        }
    }

    pub(crate) fn paths_mut(&mut self) -> &mut [PathBuf] {
        &mut self.paths
    }
}

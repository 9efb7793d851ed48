//! Calibration table persistence
//!
//! The table is an opaque blob produced by the calibration engine. It is
//! stored verbatim so later runs can hand it straight back to the engine
//! and skip batch staging altogether.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{KolosalError, Result};

/// Reads and writes the calibration table file
#[derive(Debug, Clone)]
pub struct CalibrationCache {
    path: PathBuf,
    read_enabled: bool,
}

impl CalibrationCache {
    /// Bind the store to `path`; an empty path is rejected here rather than on first use.
    pub fn new(path: impl Into<PathBuf>, read_enabled: bool) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(KolosalError::ConfigError(
                "calibration table path is empty".to_string(),
            ));
        }
        Ok(Self { path, read_enabled })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether existing tables are handed back to the engine
    pub fn read_enabled(&self) -> bool {
        self.read_enabled
    }

    /// Read the whole table.
    ///
    /// Returns `None` when reading is disabled or the file is missing, empty or
    /// unreadable; the caller then falls back to live calibration.
    pub fn read(&self) -> Option<Vec<u8>> {
        if !self.read_enabled {
            debug!(path = %self.path.display(), "Calibration cache reads disabled");
            return None;
        }

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No calibration table on disk");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Calibration table unreadable, recalibrating");
                return None;
            }
        };

        let mut bytes = Vec::new();
        if let Err(e) = file.read_to_end(&mut bytes) {
            warn!(path = %self.path.display(), error = %e, "Calibration table unreadable, recalibrating");
            return None;
        }

        if bytes.is_empty() {
            debug!(path = %self.path.display(), "Calibration table is empty");
            return None;
        }

        info!(path = %self.path.display(), bytes = bytes.len(), "Loaded calibration table");
        Some(bytes)
    }

    /// Replace the table file with `table`.
    ///
    /// The bytes go to a temporary file next to the table and are renamed over
    /// it once synced, so a failed write leaves any previous table intact.
    pub fn write(&self, table: &[u8]) -> Result<()> {
        self.write_with(|file| file.write_all(table))?;
        info!(path = %self.path.display(), bytes = table.len(), "Wrote calibration table");
        Ok(())
    }

    fn write_with<F>(&self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let to_err = |source: std::io::Error| KolosalError::CacheWriteError {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(to_err)?;
        fill(tmp.as_file_mut()).map_err(to_err)?;
        tmp.as_file().sync_all().map_err(to_err)?;
        tmp.persist(&self.path).map_err(|e| to_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_rejected() {
        let err = CalibrationCache::new("", true).unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_is_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("absent.table"), true).unwrap();
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn test_read_prepopulated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.table");
        std::fs::write(&path, [0xDEu8, 0xAD, 0xBE, 0xEF]).unwrap();

        let cache = CalibrationCache::new(&path, true).unwrap();
        let bytes = cache.read().unwrap();
        assert_eq!(bytes, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn test_read_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.table");
        std::fs::write(&path, b"table").unwrap();

        let cache = CalibrationCache::new(&path, false).unwrap();
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn test_empty_file_is_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.table");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(CalibrationCache::new(&path, true).unwrap().read(), None);
    }

    #[test]
    fn test_directory_degrades_to_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path(), true).unwrap();
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("calib.table"), true).unwrap();

        for payload in [vec![0x7Fu8], (0..8192).map(|i| (i % 251) as u8).collect::<Vec<u8>>()] {
            cache.write(&payload).unwrap();
            assert_eq!(cache.read().unwrap(), payload);
        }
    }

    #[test]
    fn test_write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("calib.table"), true).unwrap();

        cache.write(b"a much longer first table").unwrap();
        cache.write(b"short").unwrap();
        assert_eq!(cache.read().unwrap(), b"short".to_vec());
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("no/such/dir/calib.table"), true).unwrap();

        let err = cache.write(b"table").unwrap_err();
        assert!(matches!(err, KolosalError::CacheWriteError { .. }));
    }

    #[test]
    fn test_failed_write_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("calib.table"), true).unwrap();
        cache.write(b"TRT-8601-EntropyCalibration2\ndata: 3c010204\n").unwrap();

        let err = cache
            .write_with(|file| {
                file.write_all(b"TRT-86")?;
                Err(std::io::Error::new(ErrorKind::Other, "no space left on device"))
            })
            .unwrap_err();
        assert!(matches!(err, KolosalError::CacheWriteError { .. }));

        assert_eq!(
            cache.read().unwrap(),
            b"TRT-8601-EntropyCalibration2\ndata: 3c010204\n".to_vec()
        );
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}

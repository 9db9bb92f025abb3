//! Durable storage of calibration records, one JSON file per routine.
//!
//! An unreadable or corrupt file is treated as absent so a long unattended
//! run falls back to re-calibrating instead of failing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::record::CalibrationRecord;
use crate::error::CalibrationError;

/// What was found on disk for a key.
#[derive(Debug)]
pub enum StoredCalibration {
    Found(CalibrationRecord),
    Missing,
    /// The file exists but could not be read or parsed.
    Unreadable(String),
}

/// Key-value store of calibration records under one directory.
#[derive(Clone, Debug)]
pub struct CalibrationStore {
    dir: PathBuf,
}

fn validate_key(key: &str) -> Result<(), CalibrationError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CalibrationError::InvalidKey(key.to_string()))
    }
}

impl CalibrationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Keys are limited to ASCII letters, digits, `-` and `_`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, CalibrationError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Looks up `key`, distinguishing a missing file from an unreadable one.
    pub fn inspect(&self, key: &str) -> StoredCalibration {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(e) => return StoredCalibration::Unreadable(e.to_string()),
        };
        if !path.is_file() {
            return StoredCalibration::Missing;
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => StoredCalibration::Found(record),
                Err(e) => StoredCalibration::Unreadable(format!(
                    "failed to parse {}: {}",
                    path.display(),
                    e
                )),
            },
            Err(e) => {
                StoredCalibration::Unreadable(format!("failed to read {}: {}", path.display(), e))
            }
        }
    }

    /// The stored record for `key`, or `None` if missing or unreadable.
    pub fn load(&self, key: &str) -> Option<CalibrationRecord> {
        match self.inspect(key) {
            StoredCalibration::Found(record) => Some(record),
            StoredCalibration::Missing | StoredCalibration::Unreadable(_) => None,
        }
    }

    /// Writes `record` under `key`, atomically replacing any previous file.
    pub fn save(&self, key: &str, record: &CalibrationRecord) -> Result<PathBuf, CalibrationError> {
        let path = self.path_for(key)?;
        let io_err = |source: std::io::Error| CalibrationError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(record)?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(path)
    }

    /// Deletes the record for `key`. Returns whether a file was removed.
    pub fn delete(&self, key: &str) -> Result<bool, CalibrationError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CalibrationError::Io { path, source }),
        }
    }
}

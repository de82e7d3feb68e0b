//! JSON file persistence for the registry.
//!
//! The file holds an array of `[hash, record]` pairs. Every save rewrites
//! the whole file through a temporary sibling and a rename, so a crash mid
//! write leaves the previous snapshot intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::errors::{LicenseError, LicenseResult};
use crate::license::LicenseRecord;

/// Flat-file store for `(hash, record)` pairs.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored pair, in file order.
    ///
    /// A missing file is an empty registry. A file that exists but cannot
    /// be read or parsed is an error.
    pub fn load(&self) -> LicenseResult<Vec<(String, LicenseRecord)>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "License file absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(path = %self.path.display(), "Failed to read license file: {e}");
                return Err(LicenseError::Storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            error!(path = %self.path.display(), "Failed to parse license file: {e}");
            LicenseError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    /// Overwrite the file with `entries`.
    pub fn save<'a, I>(&self, entries: I) -> LicenseResult<()>
    where
        I: IntoIterator<Item = (&'a String, &'a LicenseRecord)>,
    {
        let pairs: Vec<(&String, &LicenseRecord)> = entries.into_iter().collect();
        let json = serde_json::to_string_pretty(&pairs)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), count = pairs.len(), "License file written");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, e: std::io::Error) -> LicenseError {
        error!(path = %self.path.display(), "Failed to write license file: {e}");
        LicenseError::Storage(format!("failed to write {}: {e}", self.path.display()))
    }
}

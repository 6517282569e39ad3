//! The installation cache shared by the build and install phases.
//!
//! Layout:
//!
//! ```text
//! <cache>/pkg/              staged archive payload
//! <cache>/scripts/          generated launchers
//! <cache>/wheel-info.json   archive identity
//! <cache>/metadata.json     wheel metadata
//! ```
//!
//! The records are written last, `wheel-info.json` after `metadata.json`. A
//! build that stops early leaves no identity record behind, so a partial cache
//! is reported as missing rather than installed.

use crate::error::{InstallerError, Result};
use crate::metadata::PackageMetadata;
use crate::wheel_name::ArchiveIdentity;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;

/// Directory holding the staged payload.
pub const PAYLOAD_DIR: &str = "pkg";

/// Directory holding generated launchers.
pub const SCRIPTS_DIR: &str = "scripts";

/// Record holding the [`ArchiveIdentity`].
pub const WHEEL_INFO_RECORD: &str = "wheel-info.json";

/// Record holding the [`PackageMetadata`].
pub const METADATA_RECORD: &str = "metadata.json";

/// What a completed build left for the install phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedWheel {
    /// Identity parsed from the archive filename.
    pub identity: ArchiveIdentity,
    /// Metadata read from the archive.
    pub metadata: PackageMetadata,
}

/// A cache directory on disk.
#[derive(Debug, Clone)]
pub struct InstallationCache {
    root: Utf8PathBuf,
}

impl InstallationCache {
    /// Prepare `root` for a fresh build.
    ///
    /// Stale records, payload and launchers from an earlier build are removed
    /// and an empty payload directory is created.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be prepared.
    pub fn create(root: &Utf8Path) -> Result<Self> {
        let cache = Self {
            root: root.to_owned(),
        };
        for record in [WHEEL_INFO_RECORD, METADATA_RECORD] {
            remove_if_present(&root.join(record), false)?;
        }
        remove_if_present(&cache.payload_dir(), true)?;
        remove_if_present(&cache.scripts_dir(), true)?;

        let payload = cache.payload_dir();
        fs::create_dir_all(&payload).map_err(|e| InstallerError::io(&payload, e))?;
        debug!("prepared installation cache at {root}");
        Ok(cache)
    }

    /// Open an existing cache for installation.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingCache`] when `root` is not a
    /// directory.
    pub fn open(root: &Utf8Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(InstallerError::MissingCache {
                path: root.to_owned(),
            });
        }
        Ok(Self {
            root: root.to_owned(),
        })
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Staged payload directory.
    #[must_use]
    pub fn payload_dir(&self) -> Utf8PathBuf {
        self.root.join(PAYLOAD_DIR)
    }

    /// Generated launcher directory.
    #[must_use]
    pub fn scripts_dir(&self) -> Utf8PathBuf {
        self.root.join(SCRIPTS_DIR)
    }

    /// Persist the records that mark the build as complete.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::CacheRecord`] when a record cannot be
    /// serialized, or an I/O error when it cannot be written.
    pub fn save(&self, wheel: &CachedWheel) -> Result<()> {
        self.write_record(METADATA_RECORD, &wheel.metadata)?;
        self.write_record(WHEEL_INFO_RECORD, &wheel.identity)
    }

    /// Load the records written by [`InstallationCache::save`].
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingCache`] when a record is absent and
    /// [`InstallerError::CacheRecord`] when one cannot be parsed.
    pub fn load(&self) -> Result<CachedWheel> {
        Ok(CachedWheel {
            identity: self.read_record(WHEEL_INFO_RECORD)?,
            metadata: self.read_record(METADATA_RECORD)?,
        })
    }

    fn write_record<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.root.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|e| InstallerError::CacheRecord {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| InstallerError::io(&path, e))?;
        debug!("wrote cache record {path}");
        Ok(())
    }

    fn read_record<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.root.join(name);
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => InstallerError::MissingCache { path: path.clone() },
            _ => InstallerError::io(&path, e),
        })?;
        serde_json::from_str(&text).map_err(|e| InstallerError::CacheRecord {
            path,
            reason: e.to_string(),
        })
    }
}

fn remove_if_present(path: &Utf8Path, directory: bool) -> Result<()> {
    let result = if directory {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(InstallerError::io(path, e)),
        _ => Ok(()),
    }
}

//! Wheel filename parsing.
//!
//! The grammar is
//! `<distribution>-<version>[-<build_tag>]-<python_tag>-<abi_tag>-<platform_tag>.<ext>`.
//! The optional build tag is recognised by segment count alone.

use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity fields derived from a wheel filename.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::wheel_name::ArchiveIdentity;
///
/// let identity = ArchiveIdentity::parse("pkg-1.2.3-py3-none-any.whl")?;
/// assert_eq!(identity.distribution(), "pkg");
/// assert_eq!(identity.dist_info_dir(), "pkg-1.2.3.dist-info");
/// # Ok::<(), wheelwright_installer::error::InstallerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIdentity {
    distribution: String,
    version: String,
    build_tag: Option<String>,
    python_tag: String,
    abi_tag: String,
    platform_tag: String,
}

impl ArchiveIdentity {
    /// Parse a bare wheel filename.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidName`] when the filename has no
    /// extension, the wrong number of segments, or an empty segment.
    pub fn parse(filename: &str) -> Result<Self> {
        let invalid = |reason: &str| InstallerError::InvalidName {
            name: filename.to_owned(),
            reason: reason.to_owned(),
        };

        let (stem, extension) = filename
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing file extension"))?;
        if extension.is_empty() {
            return Err(invalid("missing file extension"));
        }

        let segments: Vec<&str> = stem.split('-').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty name segment"));
        }

        match segments.as_slice() {
            [distribution, version, python_tag, abi_tag, platform_tag] => Ok(Self {
                distribution: (*distribution).to_owned(),
                version: (*version).to_owned(),
                build_tag: None,
                python_tag: (*python_tag).to_owned(),
                abi_tag: (*abi_tag).to_owned(),
                platform_tag: (*platform_tag).to_owned(),
            }),
            [distribution, version, build_tag, python_tag, abi_tag, platform_tag] => Ok(Self {
                distribution: (*distribution).to_owned(),
                version: (*version).to_owned(),
                build_tag: Some((*build_tag).to_owned()),
                python_tag: (*python_tag).to_owned(),
                abi_tag: (*abi_tag).to_owned(),
                platform_tag: (*platform_tag).to_owned(),
            }),
            _ => Err(invalid("expected five or six hyphen-separated segments")),
        }
    }

    /// Parse the filename component of an archive path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidName`] when the path has no filename
    /// or the filename does not match the grammar.
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        let filename = path.file_name().ok_or_else(|| InstallerError::InvalidName {
            name: path.to_string(),
            reason: "path has no filename".to_owned(),
        })?;
        Self::parse(filename)
    }

    /// Distribution name segment.
    #[must_use]
    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// Version segment.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional build tag segment.
    #[must_use]
    pub fn build_tag(&self) -> Option<&str> {
        self.build_tag.as_deref()
    }

    /// Python tag segment.
    #[must_use]
    pub fn python_tag(&self) -> &str {
        &self.python_tag
    }

    /// ABI tag segment.
    #[must_use]
    pub fn abi_tag(&self) -> &str {
        &self.abi_tag
    }

    /// Platform tag segment.
    #[must_use]
    pub fn platform_tag(&self) -> &str {
        &self.platform_tag
    }

    /// The `<distribution>-<version>` prefix used for internal directories.
    #[must_use]
    pub fn package_prefix(&self) -> String {
        format!("{}-{}", self.distribution, self.version)
    }

    /// Name of the `.dist-info` directory inside the archive.
    #[must_use]
    pub fn dist_info_dir(&self) -> String {
        format!("{}.dist-info", self.package_prefix())
    }

    /// Name of the optional `.data` directory inside the archive.
    #[must_use]
    pub fn data_dir(&self) -> String {
        format!("{}.data", self.package_prefix())
    }
}

impl fmt::Display for ArchiveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.distribution, self.version)?;
        if let Some(build) = &self.build_tag {
            write!(f, "-{build}")?;
        }
        write!(f, "-{}-{}-{}", self.python_tag, self.abi_tag, self.platform_tag)
    }
}

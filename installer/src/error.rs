//! Error types for the wheel installer.
//!
//! Every variant is terminal for the phase that raised it. Variants carry the
//! path, role or requirement involved so the caller can render a useful
//! message without further context.

use crate::scheme::PathRole;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Kind of filesystem node, used when reporting merge conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A directory.
    Directory,
    /// A regular file (or anything that is not a directory).
    File,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::File => f.write_str("file"),
        }
    }
}

/// Errors that can occur while building or installing a wheel.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The archive filename does not follow the wheel naming grammar.
    #[error("invalid wheel name {name}: {reason}")]
    InvalidName {
        /// The rejected filename.
        name: String,
        /// Which part of the grammar was violated.
        reason: String,
    },

    /// The archive path does not exist.
    #[error("wheel archive not found at {path}")]
    ArchiveNotFound {
        /// Path that was expected to hold the archive.
        path: Utf8PathBuf,
    },

    /// The operating system refused access to a path.
    #[error("access denied: {path}")]
    AccessDenied {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
    },

    /// The archive container is malformed or truncated.
    #[error("corrupt wheel archive {path}: {reason}")]
    CorruptArchive {
        /// Path to the archive.
        path: Utf8PathBuf,
        /// Description of the container error.
        reason: String,
    },

    /// The `WHEEL` descriptor is absent from the `.dist-info` directory.
    #[error("metadata file not found at {path}")]
    MissingMetadataFile {
        /// Path where the descriptor was expected.
        path: Utf8PathBuf,
    },

    /// A required metadata key is missing or cannot be parsed.
    #[error("invalid wheel metadata {key}: {reason}")]
    InvalidMetadata {
        /// The offending metadata key.
        key: String,
        /// Description of the problem.
        reason: String,
    },

    /// The declared `Wheel-Version` exceeds what this installer supports.
    #[error("unsupported wheel version {declared}; newest supported is {supported}")]
    UnsupportedFormatVersion {
        /// The version declared by the archive.
        declared: String,
        /// The newest version this installer understands.
        supported: String,
    },

    /// The target interpreter does not satisfy `Requires-Python`.
    #[error("interpreter {interpreter} does not satisfy Requires-Python {constraint}")]
    IncompatibleInterpreter {
        /// The interpreter version that was checked.
        interpreter: String,
        /// The declared constraint.
        constraint: String,
    },

    /// A `Requires-Dist` entry is not satisfied by the environment.
    #[error("missing dependency: {requirement}")]
    MissingDependency {
        /// The unmet requirement, as declared.
        requirement: String,
    },

    /// A requirement or marker expression cannot be parsed.
    #[error("invalid requirement {requirement}: {reason}")]
    InvalidRequirement {
        /// The requirement text.
        requirement: String,
        /// Description of the parse error.
        reason: String,
    },

    /// An entry under `<pkg>.data/scripts` is not a regular file.
    #[error("invalid script {path}: not a regular file")]
    InvalidScript {
        /// Path to the offending entry.
        path: Utf8PathBuf,
    },

    /// The installation scheme has no path for a role.
    #[error("installation scheme has no path for {role}")]
    UnknownPathRole {
        /// The role that could not be resolved.
        role: PathRole,
    },

    /// A destination node exists with an incompatible type.
    #[error("cannot merge into {path}: expected a {expected}, found a {found}")]
    DestinationConflict {
        /// Path of the conflicting destination node.
        path: Utf8PathBuf,
        /// Node type the merge needed.
        expected: NodeKind,
        /// Node type already present.
        found: NodeKind,
    },

    /// The installation cache is missing or incomplete.
    #[error("missing installation cache at {path} (hint: build the cache first)")]
    MissingCache {
        /// Path of the cache directory or record.
        path: Utf8PathBuf,
    },

    /// A persisted cache record could not be read or written.
    #[error("cache record {path} is unusable: {reason}")]
    CacheRecord {
        /// Path to the record file.
        path: Utf8PathBuf,
        /// Description of the serialization failure.
        reason: String,
    },

    /// The target interpreter could not be queried.
    #[error("failed to query interpreter {program}: {reason}")]
    InterpreterQuery {
        /// The interpreter program that was run.
        program: String,
        /// Description of the failure.
        reason: String,
    },

    /// An optimization level outside the supported range.
    #[error("invalid optimization level {level}; expected 0, 1 or 2")]
    InvalidOptimizeLevel {
        /// The rejected level.
        level: u8,
    },

    /// A phase left the installation incomplete and warnings are fatal.
    #[error(
        "{phase} left the installation incomplete ({count} warning(s)); \
         pass -w to accept an incomplete installation"
    )]
    IncompleteInstallation {
        /// Phase that recorded the diagnostics.
        phase: &'static str,
        /// Number of incomplete-installation diagnostics.
        count: usize,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// Any other I/O failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Map an I/O error on `path`, turning permission failures into
    /// [`InstallerError::AccessDenied`].
    #[must_use]
    pub fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::AccessDenied {
                path: path.to_owned(),
            }
        } else {
            Self::Io {
                path: path.to_owned(),
                source,
            }
        }
    }
}

/// Convert a standard path into a UTF-8 path.
///
/// # Errors
///
/// Returns [`InstallerError::NonUtf8Path`] if the path is not valid UTF-8.
pub fn utf8_path(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|p| InstallerError::NonUtf8Path {
        path: p.display().to_string(),
    })
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;

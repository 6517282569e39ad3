//! Installation path resolution.
//!
//! The host interpreter's scheme maps each [`PathRole`] to an absolute
//! directory. [`resolve`] re-roots that directory under a destination root so
//! an installation can be staged into a sandbox instead of the live
//! filesystem.

use crate::error::{InstallerError, Result};
use crate::metadata::PackageMetadata;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Abstract installation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRole {
    /// Platform-independent library code.
    Purelib,
    /// Platform-specific library code.
    Platlib,
    /// Executable scripts.
    Scripts,
    /// C headers.
    Headers,
    /// Arbitrary data files.
    Data,
}

impl PathRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Purelib,
        Self::Platlib,
        Self::Scripts,
        Self::Headers,
        Self::Data,
    ];

    /// Lowercase role name, as used for `.data` subdirectories.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purelib => "purelib",
            Self::Platlib => "platlib",
            Self::Scripts => "scripts",
            Self::Headers => "headers",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown path role {0:?}")]
pub struct UnknownRoleName(pub String);

impl FromStr for PathRole {
    type Err = UnknownRoleName;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRoleName(s.to_owned()))
    }
}

/// Source of role-to-directory mappings.
pub trait PathScheme {
    /// Directory for `role`, if the scheme defines one.
    fn path(&self, role: PathRole) -> Option<&Utf8Path>;
}

/// A concrete scheme held in memory.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::scheme::{PathRole, PathScheme, SchemePaths};
///
/// let scheme = SchemePaths::new()
///     .with(PathRole::Purelib, "/usr/lib/python3/site-packages")
///     .with(PathRole::Scripts, "/usr/bin");
/// assert_eq!(scheme.path(PathRole::Scripts).map(|p| p.as_str()), Some("/usr/bin"));
/// assert!(scheme.path(PathRole::Headers).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemePaths {
    paths: BTreeMap<PathRole, Utf8PathBuf>,
}

impl SchemePaths {
    /// Create an empty scheme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the scheme with `role` mapped to `path`.
    #[must_use]
    pub fn with(mut self, role: PathRole, path: impl Into<Utf8PathBuf>) -> Self {
        self.insert(role, path);
        self
    }

    /// Map `role` to `path`, replacing any previous mapping.
    pub fn insert(&mut self, role: PathRole, path: impl Into<Utf8PathBuf>) {
        self.paths.insert(role, path.into());
    }

    /// Number of mapped roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Return true when no role is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl PathScheme for SchemePaths {
    fn path(&self, role: PathRole) -> Option<&Utf8Path> {
        self.paths.get(&role).map(Utf8PathBuf::as_path)
    }
}

/// Resolve `role` under `destdir`.
///
/// The scheme path loses its root (and any drive prefix) and is joined onto
/// `destdir`, so `/usr/lib/python3/site-packages` with destdir `/tmp/stage`
/// becomes `/tmp/stage/usr/lib/python3/site-packages`.
///
/// # Errors
///
/// Returns [`InstallerError::UnknownPathRole`] when the scheme has no path
/// for `role`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use wheelwright_installer::scheme::{resolve, PathRole, SchemePaths};
///
/// let scheme = SchemePaths::new().with(PathRole::Scripts, "/usr/local/bin");
/// let path = resolve(&scheme, Utf8Path::new("/tmp/stage"), PathRole::Scripts)?;
/// assert_eq!(path, "/tmp/stage/usr/local/bin");
/// # Ok::<(), wheelwright_installer::error::InstallerError>(())
/// ```
pub fn resolve(scheme: &dyn PathScheme, destdir: &Utf8Path, role: PathRole) -> Result<Utf8PathBuf> {
    let path = scheme
        .path(role)
        .ok_or(InstallerError::UnknownPathRole { role })?;
    let relative: Utf8PathBuf = path
        .components()
        .filter(|c| !matches!(c, Utf8Component::Prefix(_) | Utf8Component::RootDir))
        .collect();
    Ok(destdir.join(relative))
}

/// Role that receives the archive's top-level payload.
///
/// `Root-Is-Purelib: true` selects purelib; anything else selects platlib.
#[must_use]
pub fn root_role(metadata: &PackageMetadata) -> PathRole {
    if metadata.root_is_purelib() {
        PathRole::Purelib
    } else {
        PathRole::Platlib
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scheme() -> SchemePaths {
        SchemePaths::new()
            .with(PathRole::Purelib, "/usr/lib/python3.11/site-packages")
            .with(PathRole::Platlib, "/usr/lib64/python3.11/site-packages")
            .with(PathRole::Scripts, "/usr/bin")
    }

    #[rstest]
    #[case::purelib(PathRole::Purelib, "/stage/usr/lib/python3.11/site-packages")]
    #[case::platlib(PathRole::Platlib, "/stage/usr/lib64/python3.11/site-packages")]
    #[case::scripts(PathRole::Scripts, "/stage/usr/bin")]
    fn re_roots_scheme_paths(#[case] role: PathRole, #[case] expected: &str) {
        let path = resolve(&scheme(), Utf8Path::new("/stage"), role).expect("mapped role");
        assert_eq!(path, expected);
    }

    #[test]
    fn destdir_of_root_yields_the_live_path() {
        let path = resolve(&scheme(), Utf8Path::new("/"), PathRole::Scripts).expect("mapped");
        assert_eq!(path, "/usr/bin");
    }

    #[test]
    fn missing_role_is_reported() {
        let result = resolve(&scheme(), Utf8Path::new("/stage"), PathRole::Headers);
        assert!(matches!(
            result,
            Err(InstallerError::UnknownPathRole {
                role: PathRole::Headers
            })
        ));
    }

    #[rstest]
    #[case::purelib("Root-Is-Purelib: true\n", PathRole::Purelib)]
    #[case::platlib("Root-Is-Purelib: false\n", PathRole::Platlib)]
    #[case::odd_value("Root-Is-Purelib: yes\n", PathRole::Platlib)]
    fn root_role_follows_root_is_purelib(#[case] text: &str, #[case] expected: PathRole) {
        assert_eq!(root_role(&PackageMetadata::parse(text)), expected);
    }

    #[test]
    fn role_names_round_trip() {
        for role in PathRole::ALL {
            assert_eq!(role.as_str().parse::<PathRole>(), Ok(role));
        }
        assert!("include".parse::<PathRole>().is_err());
    }
}

//! Lookup of distributions already present in the target environment.

use super::version::{Version, VersionSpecifiers};
use crate::metadata::{METADATA_FILE, PackageMetadata};
use crate::scheme::{PathRole, PathScheme};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Answers whether the environment satisfies a single requirement.
///
/// Implementations decide how the environment is inspected; the verifier only
/// needs this narrow yes/no contract.
#[cfg_attr(test, mockall::automock)]
pub trait RequirementChecker {
    /// Return true when a distribution named `name` is installed, provides
    /// every extra in `extras`, and has a version accepted by `version_spec`.
    fn is_requirement_satisfied(
        &self,
        name: &str,
        extras: &[String],
        version_spec: &VersionSpecifiers,
    ) -> bool;
}

/// Normalize a distribution or extra name (PEP 503).
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::installed::normalize_name;
///
/// assert_eq!(normalize_name("Zope.Interface"), "zope-interface");
/// assert_eq!(normalize_name("typing__extensions"), "typing-extensions");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    normalized
}

/// One installed distribution, as read from its `.dist-info` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDistribution {
    name: String,
    version: Option<Version>,
    extras: Vec<String>,
}

impl InstalledDistribution {
    /// Create a record from already normalized parts.
    #[must_use]
    pub fn new(name: &str, version: Option<Version>, extras: &[&str]) -> Self {
        Self {
            name: normalize_name(name),
            version,
            extras: extras.iter().map(|e| normalize_name(e)).collect(),
        }
    }

    /// Normalized distribution name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installed version, when it parses as PEP 440.
    #[must_use]
    pub const fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    fn read(dist_info: &Utf8Path) -> Option<Self> {
        let stem = dist_info.file_name()?.strip_suffix(".dist-info")?;
        let (dir_name, dir_version) = stem.split_once('-').unwrap_or((stem, ""));

        let mut metadata = PackageMetadata::default();
        if let Ok(text) = fs::read_to_string(dist_info.join(METADATA_FILE)) {
            metadata.extend_with_core_metadata(&text);
        }
        let name = metadata.get("Name").unwrap_or(dir_name);
        let version = metadata
            .get("Version")
            .unwrap_or(dir_version)
            .parse()
            .ok();
        let extras = metadata
            .get_all("Provides-Extra")
            .map(normalize_name)
            .collect();

        Some(Self {
            name: normalize_name(name),
            version,
            extras,
        })
    }
}

/// Distributions found in the site directories of a scheme.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::installed::{
///     InstalledDistribution, InstalledDistributions, RequirementChecker,
/// };
///
/// let installed = InstalledDistributions::from_distributions(vec![
///     InstalledDistribution::new("six", "1.16.0".parse().ok(), &[]),
/// ]);
/// assert!(installed.is_requirement_satisfied("Six", &[], &">=1.10".parse()?));
/// # Ok::<(), wheelwright_installer::compat::error::ParseError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstalledDistributions {
    distributions: Vec<InstalledDistribution>,
}

impl InstalledDistributions {
    /// Create a lookup over a fixed set of distributions.
    #[must_use]
    pub fn from_distributions(distributions: Vec<InstalledDistribution>) -> Self {
        Self { distributions }
    }

    /// Scan the purelib and platlib directories of `scheme`.
    ///
    /// Returns `None` when neither directory can be read, meaning the
    /// environment cannot be introspected at all.
    #[must_use]
    pub fn discover(scheme: &dyn PathScheme) -> Option<Self> {
        let mut site_dirs: Vec<Utf8PathBuf> = Vec::new();
        for role in [PathRole::Purelib, PathRole::Platlib] {
            if let Some(path) = scheme.path(role) {
                if !site_dirs.iter().any(|p| p == path) {
                    site_dirs.push(path.to_owned());
                }
            }
        }
        Self::scan(&site_dirs)
    }

    /// Scan explicit site directories.
    ///
    /// Returns `None` when none of `site_dirs` can be read.
    #[must_use]
    pub fn scan(site_dirs: &[Utf8PathBuf]) -> Option<Self> {
        let mut distributions = Vec::new();
        let mut readable = false;
        for dir in site_dirs {
            let Ok(entries) = dir.read_dir_utf8() else {
                debug!("cannot read site directory {dir}");
                continue;
            };
            readable = true;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension() == Some("dist-info") && path.is_dir() {
                    distributions.extend(InstalledDistribution::read(path));
                }
            }
        }
        debug!("found {} installed distribution(s)", distributions.len());
        readable.then_some(Self { distributions })
    }

    /// Installed distributions, in discovery order.
    #[must_use]
    pub fn distributions(&self) -> &[InstalledDistribution] {
        &self.distributions
    }
}

impl RequirementChecker for InstalledDistributions {
    fn is_requirement_satisfied(
        &self,
        name: &str,
        extras: &[String],
        version_spec: &VersionSpecifiers,
    ) -> bool {
        let wanted = normalize_name(name);
        self.distributions.iter().any(|dist| {
            dist.name == wanted
                && extras
                    .iter()
                    .all(|extra| dist.extras.contains(&normalize_name(extra)))
                && match &dist.version {
                    Some(version) => version_spec.contains(version),
                    None => version_spec.is_empty(),
                }
        })
    }
}

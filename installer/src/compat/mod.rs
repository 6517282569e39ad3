//! Compatibility verification of a staged wheel.
//!
//! The format check always runs. Dependency verification is best-effort: it
//! needs a [`RequirementChecker`] for the target environment and degrades to a
//! [`DiagnosticKind::CompatibilityUnchecked`] advisory when none is available.

pub mod error;
pub mod installed;
pub mod marker;
pub mod requirement;
pub mod version;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{InstallerError, Result};
use crate::metadata::{PackageMetadata, WheelVersion};
use installed::RequirementChecker;
use log::debug;
use marker::MarkerEnvironment;
use requirement::Requirement;
use version::{Version, VersionSpecifiers};

/// Metadata key holding the interpreter constraint.
pub const REQUIRES_PYTHON_KEY: &str = "Requires-Python";

/// Metadata key holding one dependency; may repeat.
pub const REQUIRES_DIST_KEY: &str = "Requires-Dist";

/// Reject archives whose `Wheel-Version` is newer than
/// [`WheelVersion::SUPPORTED`].
///
/// # Errors
///
/// Returns [`InstallerError::UnsupportedFormatVersion`] for newer formats and
/// [`InstallerError::InvalidMetadata`] when the key is missing or malformed.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::verify_wheel_version;
/// use wheelwright_installer::metadata::PackageMetadata;
///
/// assert!(verify_wheel_version(&PackageMetadata::parse("Wheel-Version: 1.0\n")).is_ok());
/// assert!(verify_wheel_version(&PackageMetadata::parse("Wheel-Version: 2.0\n")).is_err());
/// ```
pub fn verify_wheel_version(metadata: &PackageMetadata) -> Result<()> {
    let declared = metadata.wheel_version()?;
    if declared > WheelVersion::SUPPORTED {
        return Err(InstallerError::UnsupportedFormatVersion {
            declared: declared.to_string(),
            supported: WheelVersion::SUPPORTED.to_string(),
        });
    }
    debug!("wheel format {declared} is supported");
    Ok(())
}

/// The target interpreter as seen by dependency verification.
#[derive(Debug, Clone, Copy)]
pub struct TargetEnvironment<'a> {
    /// Interpreter version checked against `Requires-Python`.
    pub python_version: &'a Version,
    /// Marker variables used to evaluate `Requires-Dist` markers.
    pub markers: &'a MarkerEnvironment,
}

/// Check `Requires-Python` and every `Requires-Dist` entry.
///
/// When `checker` is `None` the whole check is skipped and a
/// [`DiagnosticKind::CompatibilityUnchecked`] advisory is recorded.
///
/// # Errors
///
/// Returns [`InstallerError::IncompatibleInterpreter`] when the interpreter
/// version is rejected, [`InstallerError::MissingDependency`] for the first
/// unmet requirement and [`InstallerError::InvalidRequirement`] when a field
/// cannot be parsed.
pub fn verify_dependencies(
    metadata: &PackageMetadata,
    target: TargetEnvironment<'_>,
    checker: Option<&dyn RequirementChecker>,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let Some(checker) = checker else {
        diagnostics.push(
            DiagnosticKind::CompatibilityUnchecked,
            "the target environment cannot be inspected; dependencies were not verified",
        );
        return Ok(());
    };

    if let Some(constraint) = metadata.get(REQUIRES_PYTHON_KEY) {
        let specifiers: VersionSpecifiers =
            constraint.parse().map_err(|e| invalid(constraint, &e))?;
        if !specifiers.contains(target.python_version) {
            return Err(InstallerError::IncompatibleInterpreter {
                interpreter: target.python_version.to_string(),
                constraint: constraint.to_owned(),
            });
        }
    }

    for raw in metadata.get_all(REQUIRES_DIST_KEY) {
        let requirement: Requirement = raw.parse().map_err(|e| invalid(raw, &e))?;
        if let Some(marker) = requirement.marker() {
            if !marker.evaluate(target.markers) {
                debug!("skipping {raw}: marker does not apply");
                continue;
            }
        }
        if !checker.is_requirement_satisfied(
            requirement.name(),
            requirement.extras(),
            requirement.specifiers(),
        ) {
            return Err(InstallerError::MissingDependency {
                requirement: raw.to_owned(),
            });
        }
        debug!("requirement {raw} is satisfied");
    }
    Ok(())
}

fn invalid(requirement: &str, source: &error::ParseError) -> InstallerError {
    InstallerError::InvalidRequirement {
        requirement: requirement.to_owned(),
        reason: source.reason.clone(),
    }
}

//! Build and install phase orchestration.
//!
//! [`build`] turns a wheel archive into a populated installation cache and
//! [`install`] merges a cache into the destination tree. The phases share
//! nothing but the cache directory, so they can run at different times, under
//! different privileges, or against different destination roots.

use crate::cache::{CachedWheel, InstallationCache};
use crate::command::CommandExecutor;
use crate::compat::installed::RequirementChecker;
use crate::compat::{TargetEnvironment, verify_dependencies, verify_wheel_version};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::entry_points::read_scripts;
use crate::error::{InstallerError, Result, utf8_path};
use crate::extraction::{WheelExtractor, ZipExtractor};
use crate::interpreter::Interpreter;
use crate::merge::{MergeStats, merge_tree};
use crate::metadata::read_wheel_metadata;
use crate::precompile::{OptimizeLevel, Precompiler};
use crate::scheme::{PathRole, PathScheme, resolve, root_role};
use crate::scripts::{generate_launchers, rewrite_placeholder_shebangs};
use crate::wheel_name::ArchiveIdentity;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// What the build phase should do beyond extraction.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    /// Optimization levels to precompile; empty disables precompilation.
    pub optimize_levels: &'a [OptimizeLevel],
    /// Whether to check `Requires-Python` and `Requires-Dist`.
    pub verify_dependencies: bool,
}

/// Host collaborators used by the build phase.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// Target interpreter.
    pub interpreter: &'a Interpreter,
    /// Process spawner for precompilation.
    pub executor: &'a dyn CommandExecutor,
    /// Installed-distribution lookup; `None` when the environment cannot be
    /// inspected.
    pub requirements: Option<&'a dyn RequirementChecker>,
}

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Identity and metadata persisted in the cache.
    pub wheel: CachedWheel,
    /// Number of files extracted from the archive.
    pub extracted_files: usize,
    /// Optimization levels that compiled cleanly.
    pub compiled_levels: usize,
    /// Launchers generated from entry points.
    pub launchers: usize,
    /// Packaged scripts whose placeholder interpreter line was replaced.
    pub rewritten_scripts: usize,
}

/// Build the installation cache for `archive` in `cache_dir`.
///
/// # Errors
///
/// Returns the error of the first failing step; the cache is then left
/// without records and must be rebuilt.
pub fn build(
    archive: &Utf8Path,
    cache_dir: &Utf8Path,
    options: &BuildOptions<'_>,
    context: &BuildContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<BuildReport> {
    build_with(&ZipExtractor, archive, cache_dir, options, context, diagnostics)
}

/// Build the installation cache using an injected extractor.
///
/// Steps run strictly in order: extraction, metadata, compatibility,
/// precompilation, script generation, then the cache records.
///
/// # Errors
///
/// Returns the error of the first failing step.
pub fn build_with(
    extractor: &dyn WheelExtractor,
    archive: &Utf8Path,
    cache_dir: &Utf8Path,
    options: &BuildOptions<'_>,
    context: &BuildContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<BuildReport> {
    let identity = ArchiveIdentity::from_path(archive)?;
    debug!("building {identity} into {cache_dir}");

    let cache = InstallationCache::create(cache_dir)?;
    let payload = cache.payload_dir();
    let extracted = extractor.extract(archive, &payload)?;

    let dist_info = payload.join(identity.dist_info_dir());
    let metadata = read_wheel_metadata(&dist_info)?;

    verify_wheel_version(&metadata)?;
    if options.verify_dependencies {
        let target = TargetEnvironment {
            python_version: context.interpreter.version(),
            markers: context.interpreter.markers(),
        };
        verify_dependencies(&metadata, target, context.requirements, diagnostics)?;
    }

    let interpreter = context.interpreter.executable();
    let compiled_levels = Precompiler::new(context.executor, interpreter).compile(
        &payload,
        options.optimize_levels,
        diagnostics,
    );

    let entry_points = read_scripts(&dist_info, diagnostics)?;
    let launchers =
        generate_launchers(&entry_points, interpreter, &cache.scripts_dir(), diagnostics)?;
    let packaged_scripts = payload
        .join(identity.data_dir())
        .join(PathRole::Scripts.as_str());
    let rewritten_scripts = if packaged_scripts.is_dir() {
        rewrite_placeholder_shebangs(&packaged_scripts, interpreter)?
    } else {
        0
    };

    let wheel = CachedWheel {
        identity,
        metadata,
    };
    cache.save(&wheel)?;

    diagnostics.push(
        DiagnosticKind::TagsUnverified,
        format!(
            "tags {}-{}-{} were not checked against {}",
            wheel.identity.python_tag(),
            wheel.identity.abi_tag(),
            wheel.identity.platform_tag(),
            interpreter
        ),
    );

    Ok(BuildReport {
        wheel,
        extracted_files: extracted.len(),
        compiled_levels,
        launchers: launchers.len(),
        rewritten_scripts,
    })
}

/// Summary of a completed installation.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// The installed wheel.
    pub wheel: CachedWheel,
    /// Role that received the top-level payload.
    pub root_role: PathRole,
    /// Totals over every merge performed.
    pub merged: MergeStats,
}

struct MergeStep {
    source: Utf8PathBuf,
    target: Utf8PathBuf,
    ignore: Vec<String>,
}

/// Install the cache at `cache_dir` under `destdir`.
///
/// All destination paths are resolved before anything is copied, so an
/// unknown role leaves the destination untouched.
///
/// # Errors
///
/// Returns [`InstallerError::MissingCache`] when the cache is absent or
/// unfinished, [`InstallerError::UnknownPathRole`] when the scheme lacks a
/// needed role and [`InstallerError::DestinationConflict`] when a merge hits
/// an incompatible node.
pub fn install(
    cache_dir: &Utf8Path,
    destdir: &Utf8Path,
    scheme: &dyn PathScheme,
    diagnostics: &mut Diagnostics,
) -> Result<InstallReport> {
    let cache = InstallationCache::open(cache_dir)?;
    let wheel = cache.load()?;
    debug!("installing {} from {cache_dir} into {destdir}", wheel.identity);

    let payload = cache.payload_dir();
    let data_dir_name = wheel.identity.data_dir();
    let root_role = root_role(&wheel.metadata);

    let mut steps = vec![MergeStep {
        source: payload.clone(),
        target: resolve(scheme, destdir, root_role)?,
        ignore: vec![
            PathRole::Purelib.as_str().to_owned(),
            PathRole::Platlib.as_str().to_owned(),
            data_dir_name.clone(),
        ],
    }];

    for role in [PathRole::Purelib, PathRole::Platlib] {
        let source = payload.join(role.as_str());
        if source.is_dir() {
            steps.push(MergeStep {
                source,
                target: resolve(scheme, destdir, role)?,
                ignore: Vec::new(),
            });
        }
    }

    let data_dir = payload.join(&data_dir_name);
    if data_dir.is_dir() {
        for (name, source) in sorted_children(&data_dir)? {
            match name.parse::<PathRole>() {
                Ok(role @ (PathRole::Purelib | PathRole::Platlib | PathRole::Scripts))
                    if source.is_dir() =>
                {
                    steps.push(MergeStep {
                        source,
                        target: resolve(scheme, destdir, role)?,
                        ignore: Vec::new(),
                    });
                }
                _ => diagnostics.push(
                    DiagnosticKind::UnhandledDataCategory,
                    format!("{data_dir_name}/{name} has no installation mapping; not installed"),
                ),
            }
        }
    }

    let launchers = cache.scripts_dir();
    if launchers.is_dir() {
        steps.push(MergeStep {
            source: launchers,
            target: resolve(scheme, destdir, PathRole::Scripts)?,
            ignore: Vec::new(),
        });
    }

    let mut merged = MergeStats::default();
    for step in &steps {
        let ignore: Vec<&str> = step.ignore.iter().map(String::as_str).collect();
        merged += merge_tree(&step.source, &step.target, &ignore)?;
    }

    Ok(InstallReport {
        wheel,
        root_role,
        merged,
    })
}

fn sorted_children(dir: &Utf8Path) -> Result<Vec<(String, Utf8PathBuf)>> {
    let mut children = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| InstallerError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| InstallerError::io(dir, e))?;
        let path = utf8_path(entry.path())?;
        let name = path.file_name().unwrap_or_default().to_owned();
        children.push((name, path));
    }
    children.sort();
    Ok(children)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

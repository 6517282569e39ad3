//! CLI argument definitions for the wheel installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::error::Result;
use crate::precompile::OptimizeLevel;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

/// Install a Python wheel archive.
#[derive(Parser, Debug)]
#[command(name = "wheelwright-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install a Python wheel archive.\n\n",
    "Installation runs in two phases. The build phase extracts the wheel into a ",
    "cache directory, checks its metadata, precompiles its modules and generates ",
    "entry-point launchers. The install phase merges the cache into the ",
    "interpreter's installation scheme under the destination root.\n\n",
    "Both phases run by default. Use --cache to stop after the build and ",
    "--skip-build to install a cache built earlier.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install into the live environment:\n",
    "    $ wheelwright-installer pkg-1.0-py3-none-any.whl\n\n",
    "  Stage into a packaging root without bytecode:\n",
    "    $ wheelwright-installer pkg-1.0-py3-none-any.whl -d /tmp/root -o\n\n",
    "  Build now, install later:\n",
    "    $ wheelwright-installer pkg-1.0-py3-none-any.whl --cache\n",
    "    $ wheelwright-installer --skip-build -d /tmp/root\n\n",
    "Options taking several values (-o) consume the remaining arguments, so put ",
    "the wheel path first.",
))]
pub struct Cli {
    /// Wheel archive to install.
    #[arg(value_name = "WHEEL", required_unless_present = "skip_build")]
    pub wheel: Option<Utf8PathBuf>,

    /// Show debug progress output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optimization levels to precompile; pass -o alone to disable.
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        num_args = 0..,
        default_values_t = [0_u8, 1, 2],
        value_parser = clap::value_parser!(u8).range(0..=2)
    )]
    pub optimize: Vec<u8>,

    /// Destination root under which scheme paths are re-rooted.
    #[arg(short, long, value_name = "DIR", default_value = "/")]
    pub destdir: Utf8PathBuf,

    /// Check Requires-Python and Requires-Dist against the environment.
    #[arg(short = 't', long)]
    pub verify_dependencies: bool,

    /// Build the installation cache only.
    #[arg(short, long, conflicts_with = "skip_build")]
    pub cache: bool,

    /// Install from an existing cache without building.
    #[arg(short, long)]
    pub skip_build: bool,

    /// Do not fail when the installation is incomplete.
    #[arg(short = 'w', long)]
    pub ignore_incomplete_installation_warnings: bool,

    /// Installation cache directory.
    #[arg(long, value_name = "DIR", default_value = ".install-cache")]
    pub cache_dir: Utf8PathBuf,

    /// Target Python interpreter.
    #[arg(long, value_name = "PATH", default_value = "python3")]
    pub interpreter: String,
}

impl Cli {
    /// The wheel to build, or `None` when the build phase is skipped.
    ///
    /// Argument parsing requires a wheel unless `--skip-build` is given.
    #[must_use]
    pub fn build_archive(&self) -> Option<&Utf8Path> {
        if self.skip_build {
            None
        } else {
            self.wheel.as_deref()
        }
    }

    /// Whether the install phase runs.
    #[must_use]
    pub const fn runs_install(&self) -> bool {
        !self.cache
    }

    /// Whether incomplete-installation diagnostics fail the run.
    #[must_use]
    pub const fn strict(&self) -> bool {
        !self.ignore_incomplete_installation_warnings
    }

    /// Requested optimization levels.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InstallerError::InvalidOptimizeLevel`] for a
    /// level outside `0..=2`.
    pub fn optimize_levels(&self) -> Result<Vec<OptimizeLevel>> {
        self.optimize
            .iter()
            .map(|level| OptimizeLevel::try_from(*level))
            .collect()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

//! Bytecode precompilation of the staged payload.
//!
//! Compilation is an optimization pass. Failures are recorded as
//! [`DiagnosticKind::PrecompilationFailed`] and never abort a build.

use crate::command::CommandExecutor;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::InstallerError;
use camino::Utf8Path;
use log::debug;
use std::collections::BTreeSet;
use std::fmt;

/// A Python optimization level: 0, 1 (`-O`) or 2 (`-OO`).
///
/// # Examples
///
/// ```
/// use wheelwright_installer::precompile::OptimizeLevel;
///
/// assert!(OptimizeLevel::try_from(2).is_ok());
/// assert!(OptimizeLevel::try_from(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptimizeLevel(u8);

impl OptimizeLevel {
    /// Levels compiled when none are requested explicitly.
    pub const DEFAULTS: [Self; 3] = [Self(0), Self(1), Self(2)];

    /// Numeric level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    const fn flag(self) -> Option<&'static str> {
        match self.0 {
            0 => None,
            1 => Some("-O"),
            _ => Some("-OO"),
        }
    }
}

impl TryFrom<u8> for OptimizeLevel {
    type Error = InstallerError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if level <= 2 {
            Ok(Self(level))
        } else {
            Err(InstallerError::InvalidOptimizeLevel { level })
        }
    }
}

impl fmt::Display for OptimizeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runs `compileall` with the target interpreter.
pub struct Precompiler<'a> {
    executor: &'a dyn CommandExecutor,
    interpreter: &'a Utf8Path,
}

impl<'a> Precompiler<'a> {
    /// Create a precompiler that spawns `interpreter` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, interpreter: &'a Utf8Path) -> Self {
        Self {
            executor,
            interpreter,
        }
    }

    /// Compile every source file under `payload` once per level.
    ///
    /// Levels are deduplicated and run in ascending order. An empty set of
    /// levels is a no-op. Returns the number of levels that compiled cleanly.
    #[must_use]
    pub fn compile(
        &self,
        payload: &Utf8Path,
        levels: &[OptimizeLevel],
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let levels: BTreeSet<OptimizeLevel> = levels.iter().copied().collect();
        let mut compiled = 0;
        for level in levels {
            let mut args: Vec<&str> = level.flag().into_iter().collect();
            args.extend(["-m", "compileall", "-q", payload.as_str()]);

            match self.executor.run(self.interpreter.as_str(), &args) {
                Ok(output) if output.status.success() => {
                    debug!("compiled {payload} at optimization level {level}");
                    compiled += 1;
                }
                Ok(output) => diagnostics.push(
                    DiagnosticKind::PrecompilationFailed,
                    format!(
                        "compileall at level {level} exited with {}: {}",
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                ),
                Err(e) => diagnostics.push(
                    DiagnosticKind::PrecompilationFailed,
                    format!("could not run compileall at level {level}: {e}"),
                ),
            }
        }
        compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubExecutor;
    use rstest::rstest;

    const PAYLOAD: &str = "/cache/pkg";

    fn levels(raw: &[u8]) -> Vec<OptimizeLevel> {
        raw.iter()
            .map(|l| OptimizeLevel::try_from(*l).expect("valid level"))
            .collect()
    }

    #[test]
    fn runs_each_level_in_ascending_order() {
        let executor = StubExecutor::new()
            .expect_call("python3", &["-m", "compileall", "-q", PAYLOAD], 0)
            .expect_call("python3", &["-O", "-m", "compileall", "-q", PAYLOAD], 0)
            .expect_call("python3", &["-OO", "-m", "compileall", "-q", PAYLOAD], 0);
        let mut diagnostics = Diagnostics::new();

        let compiled = Precompiler::new(&executor, Utf8Path::new("python3")).compile(
            Utf8Path::new(PAYLOAD),
            &levels(&[2, 0, 1, 2]),
            &mut diagnostics,
        );

        assert_eq!(compiled, 3);
        assert!(diagnostics.is_empty());
        executor.assert_finished();
    }

    #[test]
    fn no_levels_is_a_no_op() {
        let executor = StubExecutor::new();
        let mut diagnostics = Diagnostics::new();

        let compiled = Precompiler::new(&executor, Utf8Path::new("python3")).compile(
            Utf8Path::new(PAYLOAD),
            &[],
            &mut diagnostics,
        );

        assert_eq!(compiled, 0);
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn failing_level_is_advisory() {
        let executor = StubExecutor::new()
            .respond("python3", 1, "")
            .respond("python3", 0, "");
        let mut diagnostics = Diagnostics::new();

        let compiled = Precompiler::new(&executor, Utf8Path::new("python3")).compile(
            Utf8Path::new(PAYLOAD),
            &levels(&[0, 1]),
            &mut diagnostics,
        );

        assert_eq!(compiled, 1);
        assert!(diagnostics.contains(DiagnosticKind::PrecompilationFailed));
        assert!(!diagnostics.has_incomplete_installation());
    }

    #[rstest]
    #[case(3)]
    #[case(255)]
    fn rejects_out_of_range_levels(#[case] level: u8) {
        assert!(matches!(
            OptimizeLevel::try_from(level),
            Err(InstallerError::InvalidOptimizeLevel { level: l }) if l == level
        ));
    }
}

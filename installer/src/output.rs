//! Terminal output for the installer CLI.
//!
//! Diagnostics and errors are written to stderr as single lines. When stderr
//! is a terminal the severity prefix is coloured. The module also provides the
//! small [`log::Log`] implementation the binary installs so that `debug!`
//! progress from the engine is visible with `--verbose`.

use crate::diagnostics::Diagnostic;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt::Display;
use std::io::{IsTerminal, Write};

const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Whether severity prefixes are coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    /// Emit ANSI escape sequences.
    Always,
    /// Emit plain text.
    Never,
}

impl Colour {
    /// Colour when stderr is attached to a terminal.
    #[must_use]
    pub fn for_stderr() -> Self {
        if std::io::stderr().is_terminal() {
            Self::Always
        } else {
            Self::Never
        }
    }

    fn paint(self, code: &str, label: &str) -> String {
        match self {
            Self::Always => format!("{code}{label}{RESET}"),
            Self::Never => label.to_owned(),
        }
    }
}

/// Render a diagnostic as `WARNING (<kind>) <message>`.
///
/// # Example
///
/// ```
/// use wheelwright_installer::diagnostics::{Diagnostic, DiagnosticKind};
/// use wheelwright_installer::output::{Colour, render_diagnostic};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::TagsUnverified,
///     message: "tags were not checked".to_owned(),
/// };
/// assert_eq!(
///     render_diagnostic(&diagnostic, Colour::Never),
///     "WARNING (TagsUnverified) tags were not checked"
/// );
/// ```
#[must_use]
pub fn render_diagnostic(diagnostic: &Diagnostic, colour: Colour) -> String {
    format!(
        "{} ({}) {}",
        colour.paint(YELLOW, "WARNING"),
        diagnostic.kind,
        diagnostic.message
    )
}

/// Render a fatal error as `ERROR <message>`.
#[must_use]
pub fn render_error(error: &impl Display, colour: Colour) -> String {
    format!("{} {error}", colour.paint(RED, "ERROR"))
}

/// Write every diagnostic to `stderr`, one per line.
pub fn report_diagnostics(stderr: &mut dyn Write, diagnostics: &[Diagnostic], colour: Colour) {
    for diagnostic in diagnostics {
        write_stderr_line(stderr, render_diagnostic(diagnostic, colour));
    }
}

/// Write a line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Logger that writes `level: message` lines to stderr.
#[derive(Debug)]
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let mut stderr = std::io::stderr().lock();
            write_stderr_line(
                &mut stderr,
                format_args!(
                    "{}: {}",
                    record.level().as_str().to_ascii_lowercase(),
                    record.args()
                ),
            );
        }
    }

    fn flush(&self) {
        if std::io::stderr().flush().is_err() {
            // Nothing sensible to do.
        }
    }
}

/// Level used for the given verbosity flag.
#[must_use]
pub const fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    }
}

/// Install [`StderrLogger`] as the global logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] when a logger was already installed.
pub fn init_logger(verbose: bool) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level_for(verbose));
    Ok(())
}

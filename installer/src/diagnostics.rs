//! Advisory diagnostics collected during a build or install run.
//!
//! The engine never prints warnings itself. Non-fatal conditions are pushed
//! into a [`Diagnostics`] sink owned by the caller, which decides how to render
//! them and whether any of them should fail the run.

use log::warn;
use std::fmt;

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Dependency verification was requested but could not be performed.
    CompatibilityUnchecked,
    /// A `<pkg>.data` child has no installation mapping and was not copied.
    UnhandledDataCategory,
    /// Launcher generation is not available on this platform.
    ScriptGenerationSkipped,
    /// An entry-point definition was malformed and no launcher was written.
    EntryPointSkipped,
    /// Bytecode compilation failed or could not be started.
    PrecompilationFailed,
    /// Python, ABI and platform tags were not checked for compatibility.
    TagsUnverified,
}

impl DiagnosticKind {
    /// Return true when the condition leaves the installation incomplete.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheelwright_installer::diagnostics::DiagnosticKind;
    ///
    /// assert!(DiagnosticKind::UnhandledDataCategory.is_incomplete_installation());
    /// assert!(!DiagnosticKind::TagsUnverified.is_incomplete_installation());
    /// ```
    #[must_use]
    pub const fn is_incomplete_installation(self) -> bool {
        matches!(
            self,
            Self::UnhandledDataCategory | Self::ScriptGenerationSkipped | Self::EntryPointSkipped
        )
    }

    /// Stable name used when rendering the diagnostic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompatibilityUnchecked => "CompatibilityUnchecked",
            Self::UnhandledDataCategory => "UnhandledDataCategory",
            Self::ScriptGenerationSkipped => "ScriptGenerationSkipped",
            Self::EntryPointSkipped => "EntryPointSkipped",
            Self::PrecompilationFailed => "PrecompilationFailed",
            Self::TagsUnverified => "TagsUnverified",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single advisory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What kind of condition occurred.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
}

/// Ordered collection of diagnostics for one or more phases.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and mirror it to the log.
    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!("{kind}: {message}");
        self.entries.push(Diagnostic { kind, message });
    }

    /// All recorded diagnostics, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Return true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return true when any entry has the given kind.
    #[must_use]
    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// Return true when any entry leaves the installation incomplete.
    #[must_use]
    pub fn has_incomplete_installation(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind.is_incomplete_installation())
    }

    /// Remove and return every recorded entry.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}

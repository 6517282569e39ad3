//! Error type shared by the version, requirement and marker parsers.

use thiserror::Error;

/// A version, specifier, requirement or marker string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {input:?}: {reason}")]
pub struct ParseError {
    /// The rejected input.
    pub input: String,
    /// Description of the violated rule.
    pub reason: String,
}

impl ParseError {
    /// Create a parse error for `input`.
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;

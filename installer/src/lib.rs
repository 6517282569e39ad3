//! Wheelwright installer library.
//!
//! This crate installs prebuilt Python wheel archives in two phases. The build
//! phase extracts an archive into an installation cache, checks its metadata,
//! precompiles bytecode and generates entry-point launchers. The install phase
//! merges that cache into an installation scheme under a destination root. It
//! is used by the `wheelwright-installer` CLI binary and can be consumed
//! programmatically by packaging tools.
//!
//! # Modules
//!
//! - [`cache`] - Installation cache layout and records
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - Process spawning abstraction
//! - [`compat`] - Wheel-Version, Requires-Python and Requires-Dist checks
//! - [`diagnostics`] - Advisory diagnostics sink
//! - [`entry_points`] - `entry_points.txt` parsing
//! - [`error`] - Semantic error types
//! - [`extraction`] - Wheel archive extraction
//! - [`interpreter`] - Target interpreter queries
//! - [`merge`] - Additive directory merging
//! - [`metadata`] - `WHEEL` and `METADATA` parsing
//! - [`output`] - Diagnostic rendering and stderr logging
//! - [`pipeline`] - Build and install phase orchestration
//! - [`precompile`] - Bytecode precompilation
//! - [`scheme`] - Installation scheme roles and path resolution
//! - [`scripts`] - Launcher generation and shebang rewriting
//! - [`wheel_name`] - Wheel file name parsing

pub mod cache;
pub mod cli;
pub mod command;
pub mod compat;
pub mod diagnostics;
pub mod entry_points;
pub mod error;
pub mod extraction;
pub mod interpreter;
pub mod merge;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod precompile;
pub mod scheme;
pub mod scripts;
pub mod wheel_name;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

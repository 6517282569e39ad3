//! Shared test utilities for the installer crate.

use crate::command::CommandExecutor;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::process::{ExitStatus, Output};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "python3").
    pub cmd: String,
    /// The arguments to match, or `None` to accept any arguments.
    pub args: Option<Vec<String>>,
    /// The output to return when this command is invoked.
    pub output: Output,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replays scripted responses in order, asserting that each invocation names
/// the expected command, and records every invocation for later inspection.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl StubExecutor {
    /// Creates a `StubExecutor` with no scripted calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next call to `cmd`, whatever its arguments.
    #[must_use]
    pub fn respond(self, cmd: &str, code: i32, stdout: &str) -> Self {
        self.push(cmd, None, code, stdout);
        self
    }

    /// Script the next call, which must be `cmd` with exactly `args`.
    #[must_use]
    pub fn expect_call(self, cmd: &str, args: &[&str], code: i32) -> Self {
        let args = args.iter().map(|a| (*a).to_owned()).collect();
        self.push(cmd, Some(args), code, "");
        self
    }

    fn push(&self, cmd: &str, args: Option<Vec<String>>, code: i32, stdout: &str) {
        self.expected.borrow_mut().push_back(ExpectedCall {
            cmd: cmd.to_owned(),
            args,
            output: Output {
                status: exit_status(code),
                stdout: stdout.as_bytes().to_vec(),
                stderr: if code == 0 {
                    Vec::new()
                } else {
                    b"scripted failure".to_vec()
                },
            },
        });
    }

    /// Every invocation so far, as `[cmd, args...]`.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut invocation = vec![cmd.to_owned()];
        invocation.extend(args.iter().map(|a| (*a).to_owned()));
        self.calls.borrow_mut().push(invocation);

        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .expect("unexpected command invocation");
        assert_eq!(call.cmd, cmd);
        if let Some(expected) = &call.args {
            assert_eq!(expected.as_slice(), args);
        }
        Ok(call.output)
    }
}

struct Entry {
    name: String,
    contents: Vec<u8>,
    mode: u32,
}

/// Writes synthetic wheel archives for tests.
///
/// The archive always contains `<dist>-<version>.dist-info/WHEEL` unless
/// [`WheelBuilder::without_wheel_file`] is used.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use wheelwright_installer::test_utils::WheelBuilder;
///
/// let archive = WheelBuilder::new("demo", "1.0")
///     .file("demo/__init__.py", "")
///     .data_file("scripts", "demo-tool", "#!python\nprint('hi')\n")
///     .write_to(Utf8Path::new("/tmp"))?;
/// assert!(archive.as_str().ends_with("demo-1.0-py3-none-any.whl"));
/// # Ok::<(), wheelwright_installer::error::InstallerError>(())
/// ```
pub struct WheelBuilder {
    distribution: String,
    version: String,
    wheel_version: String,
    root_is_purelib: String,
    wheel_override: Option<String>,
    include_wheel_file: bool,
    core_metadata: Option<String>,
    entry_points: Option<String>,
    entries: Vec<Entry>,
}

impl WheelBuilder {
    /// Start a pure-Python wheel for `distribution` at `version`.
    #[must_use]
    pub fn new(distribution: &str, version: &str) -> Self {
        Self {
            distribution: distribution.to_owned(),
            version: version.to_owned(),
            wheel_version: "1.0".to_owned(),
            root_is_purelib: "true".to_owned(),
            wheel_override: None,
            include_wheel_file: true,
            core_metadata: None,
            entry_points: None,
            entries: Vec::new(),
        }
    }

    /// `<dist>-<version>` prefix of the internal directories.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.distribution, self.version)
    }

    /// Archive filename.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-py3-none-any.whl", self.prefix())
    }

    /// Add a regular file at `path` inside the archive.
    #[must_use]
    pub fn file(self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entry(path, contents, 0o644)
    }

    /// Add a file carrying the given Unix permission bits.
    #[must_use]
    pub fn entry(mut self, path: &str, contents: impl AsRef<[u8]>, mode: u32) -> Self {
        self.entries.push(Entry {
            name: path.to_owned(),
            contents: contents.as_ref().to_vec(),
            mode,
        });
        self
    }

    /// Add a file under `<dist>-<version>.data/<category>/`.
    #[must_use]
    pub fn data_file(self, category: &str, path: &str, contents: impl AsRef<[u8]>) -> Self {
        let name = format!("{}.data/{category}/{path}", self.prefix());
        self.file(&name, contents)
    }

    /// Set the declared `Wheel-Version`.
    #[must_use]
    pub fn wheel_version(mut self, version: &str) -> Self {
        self.wheel_version = version.to_owned();
        self
    }

    /// Set the `Root-Is-Purelib` value.
    #[must_use]
    pub fn root_is_purelib(mut self, value: &str) -> Self {
        self.root_is_purelib = value.to_owned();
        self
    }

    /// Replace the whole `WHEEL` descriptor.
    #[must_use]
    pub fn wheel_metadata(mut self, text: &str) -> Self {
        self.wheel_override = Some(text.to_owned());
        self
    }

    /// Leave the `WHEEL` descriptor out of the archive.
    #[must_use]
    pub fn without_wheel_file(mut self) -> Self {
        self.include_wheel_file = false;
        self
    }

    /// Write a `METADATA` file.
    #[must_use]
    pub fn core_metadata(mut self, text: &str) -> Self {
        self.core_metadata = Some(text.to_owned());
        self
    }

    /// Write an `entry_points.txt` file.
    #[must_use]
    pub fn entry_points(mut self, text: &str) -> Self {
        self.entry_points = Some(text.to_owned());
        self
    }

    /// Write the archive into `dir` and return its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the archive cannot be written.
    pub fn write_to(self, dir: &Utf8Path) -> Result<Utf8PathBuf> {
        let path = dir.join(self.file_name());
        let file = std::fs::File::create(&path).map_err(|e| InstallerError::io(&path, e))?;
        let mut zip = ZipWriter::new(file);
        let zip_error = |e: zip::result::ZipError| InstallerError::io(&path, std::io::Error::other(e));

        let dist_info = format!("{}.dist-info", self.prefix());
        let mut entries = self.entries;
        if self.include_wheel_file {
            let wheel = self.wheel_override.unwrap_or_else(|| {
                format!(
                    "Wheel-Version: {}\nGenerator: wheelwright-tests\nRoot-Is-Purelib: {}\nTag: py3-none-any\n",
                    self.wheel_version, self.root_is_purelib
                )
            });
            entries.push(metadata_entry(&dist_info, "WHEEL", wheel));
        }
        if let Some(text) = self.core_metadata {
            entries.push(metadata_entry(&dist_info, "METADATA", text));
        }
        if let Some(text) = self.entry_points {
            entries.push(metadata_entry(&dist_info, "entry_points.txt", text));
        }

        for entry in entries {
            let options = SimpleFileOptions::default().unix_permissions(entry.mode);
            zip.start_file(entry.name, options).map_err(zip_error)?;
            zip.write_all(&entry.contents)
                .map_err(|e| InstallerError::io(&path, e))?;
        }
        zip.finish().map_err(zip_error)?;
        Ok(path)
    }
}

fn metadata_entry(dist_info: &str, name: &str, text: String) -> Entry {
    Entry {
        name: format!("{dist_info}/{name}"),
        contents: text.into_bytes(),
        mode: 0o644,
    }
}

/// A temporary directory addressed by a UTF-8 path.
pub struct TempRoot {
    _dir: tempfile::TempDir,
    path: Utf8PathBuf,
}

impl TempRoot {
    /// Create a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or its path is not UTF-8.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 temp path");
        Self { _dir: dir, path }
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Default for TempRoot {
    fn default() -> Self {
        Self::new()
    }
}

//! The target Python interpreter.
//!
//! An [`Interpreter`] is what the engine knows about the host environment:
//! the executable written into launcher shebangs, the version checked against
//! `Requires-Python`, the marker environment and the installation scheme.

use crate::command::CommandExecutor;
use crate::compat::marker::MarkerEnvironment;
use crate::compat::version::Version;
use crate::error::{InstallerError, Result};
use crate::scheme::{PathRole, SchemePaths};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;

const QUERY_SCRIPT: &str = r#"
import json, os, platform, sys, sysconfig
paths = sysconfig.get_paths()
impl = sys.implementation
iver = "%d.%d.%d" % impl.version[:3]
if impl.version.releaselevel != "final":
    iver += impl.version.releaselevel[0] + str(impl.version.serial)
print(json.dumps({
    "executable": sys.executable,
    "version": list(sys.version_info[:3]),
    "paths": {k: paths.get(k) for k in ("purelib", "platlib", "scripts", "include", "data")},
    "markers": {
        "os_name": os.name,
        "sys_platform": sys.platform,
        "platform_machine": platform.machine(),
        "platform_python_implementation": platform.python_implementation(),
        "platform_release": platform.release(),
        "platform_system": platform.system(),
        "platform_version": platform.version(),
        "python_version": ".".join(platform.python_version_tuple()[:2]),
        "python_full_version": platform.python_version(),
        "implementation_name": impl.name,
        "implementation_version": iver,
    },
}))
"#;

#[derive(Debug, Deserialize)]
struct InterpreterReport {
    executable: Utf8PathBuf,
    version: [u64; 3],
    paths: BTreeMap<String, Option<Utf8PathBuf>>,
    markers: MarkerEnvironment,
}

/// A resolved target interpreter.
#[derive(Debug, Clone)]
pub struct Interpreter {
    executable: Utf8PathBuf,
    version: Version,
    markers: MarkerEnvironment,
    scheme: SchemePaths,
}

impl Interpreter {
    /// Create an interpreter description from known parts.
    #[must_use]
    pub fn new(
        executable: impl Into<Utf8PathBuf>,
        version: Version,
        markers: MarkerEnvironment,
        scheme: SchemePaths,
    ) -> Self {
        Self {
            executable: executable.into(),
            version,
            markers,
            scheme,
        }
    }

    /// Query `program` for its executable path, version, markers and scheme.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] when `program` cannot be started and
    /// [`InstallerError::InterpreterQuery`] when it fails or prints an
    /// unexpected report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheelwright_installer::command::SystemCommandExecutor;
    /// use wheelwright_installer::interpreter::Interpreter;
    ///
    /// let python = Interpreter::query(&SystemCommandExecutor, "python3")?;
    /// println!("installing for {}", python.executable());
    /// # Ok::<(), wheelwright_installer::error::InstallerError>(())
    /// ```
    pub fn query(executor: &dyn CommandExecutor, program: &str) -> Result<Self> {
        let output = executor.run(program, &["-c", QUERY_SCRIPT])?;
        if !output.status.success() {
            return Err(InstallerError::InterpreterQuery {
                program: program.to_owned(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        let interpreter = Self::from_report(program, &output.stdout)?;
        debug!(
            "queried {program}: {} (Python {})",
            interpreter.executable, interpreter.version
        );
        Ok(interpreter)
    }

    fn from_report(program: &str, stdout: &[u8]) -> Result<Self> {
        let report: InterpreterReport =
            serde_json::from_slice(stdout).map_err(|e| InstallerError::InterpreterQuery {
                program: program.to_owned(),
                reason: format!("unexpected interpreter output: {e}"),
            })?;

        let mut scheme = SchemePaths::new();
        for (key, path) in report.paths {
            let role = match key.as_str() {
                "include" => PathRole::Headers,
                other => match other.parse() {
                    Ok(role) => role,
                    Err(_) => continue,
                },
            };
            if let Some(path) = path {
                scheme.insert(role, path);
            }
        }

        Ok(Self {
            executable: report.executable,
            version: Version::from_release(&report.version),
            markers: report.markers,
            scheme,
        })
    }

    /// Absolute path to the interpreter executable.
    #[must_use]
    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }

    /// Interpreter version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// Marker environment for `Requires-Dist` evaluation.
    #[must_use]
    pub const fn markers(&self) -> &MarkerEnvironment {
        &self.markers
    }

    /// Installation scheme of the live environment.
    #[must_use]
    pub const fn scheme(&self) -> &SchemePaths {
        &self.scheme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::PathScheme;
    use crate::test_utils::StubExecutor;

    const REPORT: &str = r#"{
        "executable": "/usr/bin/python3.11",
        "version": [3, 11, 4],
        "paths": {
            "purelib": "/usr/lib/python3.11/site-packages",
            "platlib": "/usr/lib64/python3.11/site-packages",
            "scripts": "/usr/bin",
            "include": "/usr/include/python3.11",
            "data": null
        },
        "markers": {"python_version": "3.11", "sys_platform": "linux"}
    }"#;

    #[test]
    fn query_reads_the_json_report() {
        let executor = StubExecutor::new().respond("python3", 0, REPORT);
        let python = Interpreter::query(&executor, "python3").expect("query succeeds");

        assert_eq!(python.executable(), "/usr/bin/python3.11");
        assert_eq!(python.version(), &Version::from_release(&[3, 11, 4]));
        assert_eq!(python.markers().get("sys_platform").map(String::as_str), Some("linux"));
        assert_eq!(
            python.scheme().path(PathRole::Headers),
            Some(Utf8Path::new("/usr/include/python3.11"))
        );
        assert!(python.scheme().path(PathRole::Data).is_none());
    }

    #[test]
    fn failing_interpreter_is_a_query_error() {
        let executor = StubExecutor::new().respond("python3", 1, "");
        let result = Interpreter::query(&executor, "python3");
        assert!(matches!(result, Err(InstallerError::InterpreterQuery { .. })));
    }

    #[test]
    fn garbage_output_is_a_query_error() {
        let executor = StubExecutor::new().respond("python3", 0, "Python 3.11.4\n");
        let result = Interpreter::query(&executor, "python3");
        assert!(matches!(
            result,
            Err(InstallerError::InterpreterQuery { ref reason, .. }) if reason.contains("unexpected")
        ));
    }
}

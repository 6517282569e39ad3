//! Test support utilities for installer behavioural tests.
//!
//! Provides the statically described interpreter shared by the scenarios and
//! helpers for building wheels into a temporary workspace.

use camino::{Utf8Path, Utf8PathBuf};
use wheelwright_installer::compat::marker::MarkerEnvironment;
use wheelwright_installer::compat::version::Version;
use wheelwright_installer::interpreter::Interpreter;
use wheelwright_installer::scheme::{PathRole, SchemePaths, resolve};

/// Interpreter path written into launchers and rewritten scripts.
pub const PYTHON: &str = "/usr/bin/python3";

/// A CPython 3.11 interpreter on Linux with a conventional `/usr` scheme.
pub fn interpreter() -> Interpreter {
    let markers: MarkerEnvironment = [
        ("python_version", "3.11"),
        ("python_full_version", "3.11.4"),
        ("sys_platform", "linux"),
        ("os_name", "posix"),
        ("implementation_name", "cpython"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();
    let scheme = SchemePaths::new()
        .with(PathRole::Purelib, "/usr/lib/python3.11/site-packages")
        .with(PathRole::Platlib, "/usr/lib64/python3.11/site-packages")
        .with(PathRole::Scripts, "/usr/bin")
        .with(PathRole::Headers, "/usr/include/python3.11")
        .with(PathRole::Data, "/usr");
    Interpreter::new(PYTHON, Version::from_release(&[3, 11, 4]), markers, scheme)
}

/// Where `role` lands under `destdir` for [`interpreter`].
#[allow(dead_code, reason = "not every behaviour suite inspects the destination")]
pub fn role_dir(destdir: &Utf8Path, role: PathRole) -> Utf8PathBuf {
    resolve(interpreter().scheme(), destdir, role).expect("role is mapped")
}

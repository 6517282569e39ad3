//! Launcher generation and placeholder shebang rewriting.
//!
//! Launchers are small Python programs that import an entry point's callable
//! and exit with its return value. They are written into the cache's scripts
//! directory during the build and later merged into the scheme's `scripts`
//! role path.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::entry_points::EntryPoint;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Longest interpreter path the kernel is trusted to accept in a `#!` line.
const MAX_SHEBANG_PATH: usize = 127;

/// Build the interpreter line for `interpreter` with optional `args`.
///
/// Paths containing whitespace or longer than the kernel limit are started
/// through a `/bin/sh` trampoline that Python reads as a string literal.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use wheelwright_installer::scripts::shebang;
///
/// assert_eq!(shebang(Utf8Path::new("/usr/bin/python3"), ""), "#!/usr/bin/python3\n");
/// assert!(shebang(Utf8Path::new("/opt/my env/python"), "").starts_with("#!/bin/sh\n"));
/// ```
#[must_use]
pub fn shebang(interpreter: &Utf8Path, args: &str) -> String {
    let path = interpreter.as_str();
    let args = args.trim();
    if path.contains(char::is_whitespace) || path.len() > MAX_SHEBANG_PATH {
        let args = if args.is_empty() {
            String::new()
        } else {
            format!(" {args}")
        };
        format!("#!/bin/sh\n'''exec' \"{path}\"{args} \"$0\" \"$@\"\n' '''\n")
    } else if args.is_empty() {
        format!("#!{path}\n")
    } else {
        format!("#!{path} {args}\n")
    }
}

/// Render the launcher body for `entry`.
#[must_use]
pub fn launcher_source(entry: &EntryPoint, interpreter: &Utf8Path) -> String {
    let import_name = entry
        .qualname
        .split_once('.')
        .map_or(entry.qualname.as_str(), |(first, _)| first);
    format!(
        concat!(
            "{shebang}",
            "# -*- coding: utf-8 -*-\n",
            "import re\n",
            "import sys\n",
            "from {module} import {import_name}\n",
            "if __name__ == \"__main__\":\n",
            "    sys.argv[0] = re.sub(r\"(-script\\.pyw|\\.exe)?$\", \"\", sys.argv[0])\n",
            "    sys.exit({qualname}())\n",
        ),
        shebang = shebang(interpreter, ""),
        module = entry.module,
        import_name = import_name,
        qualname = entry.qualname,
    )
}

/// Write one launcher per entry point into `scripts_dir`.
///
/// Returns the paths written. An empty `entries` slice writes nothing and
/// does not create `scripts_dir`.
///
/// # Errors
///
/// Returns an I/O error when the directory or a launcher cannot be written.
pub fn generate_launchers(
    entries: &[EntryPoint],
    interpreter: &Utf8Path,
    scripts_dir: &Utf8Path,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Utf8PathBuf>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    if !cfg!(unix) {
        diagnostics.push(
            DiagnosticKind::ScriptGenerationSkipped,
            format!(
                "launchers cannot be generated on this platform; skipped {} entry point(s)",
                entries.len()
            ),
        );
        return Ok(Vec::new());
    }

    fs::create_dir_all(scripts_dir).map_err(|e| InstallerError::io(scripts_dir, e))?;
    let mut written = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = scripts_dir.join(&entry.name);
        fs::write(&path, launcher_source(entry, interpreter))
            .map_err(|e| InstallerError::io(&path, e))?;
        make_executable(&path)?;
        debug!("generated launcher {path}");
        written.push(path);
    }
    Ok(written)
}

/// Replace `#!python` placeholder lines in packaged scripts.
///
/// Every entry of `scripts_dir` must be a regular file. Files whose first line
/// is `#!python` or `#!pythonw` (optionally followed by arguments) get the
/// target interpreter's line instead; all files are made executable. Returns
/// the number of files rewritten.
///
/// # Errors
///
/// Returns [`InstallerError::InvalidScript`] for an entry that is not a
/// regular file, or an I/O error when a script cannot be rewritten.
pub fn rewrite_placeholder_shebangs(scripts_dir: &Utf8Path, interpreter: &Utf8Path) -> Result<usize> {
    let entries = scripts_dir
        .read_dir_utf8()
        .map_err(|e| InstallerError::io(scripts_dir, e))?;
    let mut rewritten = 0;
    for entry in entries {
        let entry = entry.map_err(|e| InstallerError::io(scripts_dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| InstallerError::io(path, e))?;
        if !file_type.is_file() {
            return Err(InstallerError::InvalidScript {
                path: path.to_owned(),
            });
        }

        let contents = fs::read(path).map_err(|e| InstallerError::io(path, e))?;
        if let Some(updated) = replace_placeholder(&contents, interpreter) {
            fs::write(path, updated).map_err(|e| InstallerError::io(path, e))?;
            debug!("rewrote interpreter line of {path}");
            rewritten += 1;
        }
        make_executable(path)?;
    }
    Ok(rewritten)
}

fn replace_placeholder(contents: &[u8], interpreter: &Utf8Path) -> Option<Vec<u8>> {
    let line_end = contents
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(contents.len());
    let (first_line, rest) = contents.split_at(line_end);
    let first_line = first_line.strip_suffix(b"\r").unwrap_or(first_line);

    let after = first_line
        .strip_prefix(b"#!pythonw")
        .or_else(|| first_line.strip_prefix(b"#!python"))?;
    if !after.is_empty() && !after.starts_with(b" ") && !after.starts_with(b"\t") {
        return None;
    }

    let args = String::from_utf8_lossy(after);
    let mut updated = shebang(interpreter, &args).into_bytes();
    // `rest` still holds the newline that ended the placeholder line.
    updated.extend_from_slice(rest.strip_prefix(b"\n").unwrap_or(rest));
    Some(updated)
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| InstallerError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}

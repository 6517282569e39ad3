//! Parsing `entry_points.txt` launcher declarations.
//!
//! Only the `console_scripts` and `gui_scripts` groups produce launchers.
//! Other groups (plugin registrations and the like) are ignored.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use std::fs;
use std::io::ErrorKind;

/// Name of the entry-points descriptor inside `.dist-info`.
pub const ENTRY_POINTS_FILE: &str = "entry_points.txt";

/// Which launcher group an entry point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptGroup {
    /// `[console_scripts]`.
    Console,
    /// `[gui_scripts]`.
    Gui,
}

impl ScriptGroup {
    fn from_section(section: &str) -> Option<Self> {
        match section {
            "console_scripts" => Some(Self::Console),
            "gui_scripts" => Some(Self::Gui),
            _ => None,
        }
    }
}

/// A launcher declaration such as `tool = pkg.cli:main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Launcher filename.
    pub name: String,
    /// Module imported by the launcher.
    pub module: String,
    /// Dotted attribute path of the callable within `module`.
    pub qualname: String,
    /// Declaring group.
    pub group: ScriptGroup,
}

impl EntryPoint {
    fn parse(name: &str, value: &str, group: ScriptGroup) -> Option<Self> {
        let target = match value.split_once('[') {
            Some((target, _extras)) => target,
            None => value,
        };
        let (module, qualname) = target.split_once(':')?;
        let (module, qualname) = (module.trim(), qualname.trim());
        if !is_launcher_name(name) || module.is_empty() || qualname.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            module: module.to_owned(),
            qualname: qualname.to_owned(),
            group,
        })
    }
}

/// A launcher name must be a single plain file name inside the scripts
/// directory.
fn is_launcher_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

/// Extract launcher declarations from entry-points text.
///
/// Malformed declarations in a launcher group are skipped and recorded as
/// [`DiagnosticKind::EntryPointSkipped`].
///
/// # Examples
///
/// ```
/// use wheelwright_installer::diagnostics::Diagnostics;
/// use wheelwright_installer::entry_points::parse_scripts;
///
/// let mut diagnostics = Diagnostics::new();
/// let scripts = parse_scripts("[console_scripts]\ntool = pkg.cli:main\n", &mut diagnostics);
/// assert_eq!(scripts[0].module, "pkg.cli");
/// assert_eq!(scripts[0].qualname, "main");
/// ```
pub fn parse_scripts(text: &str, diagnostics: &mut Diagnostics) -> Vec<EntryPoint> {
    let mut group = None;
    let mut scripts = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(['#', ';']) {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            group = ScriptGroup::from_section(section.trim());
            continue;
        }
        let Some(group) = group else {
            continue;
        };
        let parsed = line
            .split_once('=')
            .and_then(|(name, value)| EntryPoint::parse(name.trim(), value.trim(), group));
        match parsed {
            Some(entry) => scripts.push(entry),
            None => diagnostics.push(
                DiagnosticKind::EntryPointSkipped,
                format!("malformed entry point {line:?}; no launcher written"),
            ),
        }
    }
    scripts
}

/// Read launcher declarations from `<dist_info>/entry_points.txt`.
///
/// A missing descriptor yields no launchers.
///
/// # Errors
///
/// Returns an I/O error when the descriptor exists but cannot be read.
pub fn read_scripts(dist_info: &Utf8Path, diagnostics: &mut Diagnostics) -> Result<Vec<EntryPoint>> {
    let path = dist_info.join(ENTRY_POINTS_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(parse_scripts(&text, diagnostics)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(InstallerError::io(&path, e)),
    }
}

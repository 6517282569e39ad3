//! Additive directory merging.
//!
//! [`merge_tree`] copies a source tree over a destination tree. Existing
//! destination content is never removed: directories are reused, files at
//! the same relative path are overwritten, and everything else is left
//! alone. Merging the same source twice yields the same destination.

use crate::error::{InstallerError, NodeKind, Result, utf8_path};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use walkdir::WalkDir;

/// Counts of what a merge touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Files copied into the destination.
    pub files: usize,
    /// Directories visited (created or reused).
    pub directories: usize,
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.directories += other.directories;
    }
}

/// Merge `src` into `dst`, skipping top-level entries named in `ignore`.
///
/// # Errors
///
/// Returns [`InstallerError::DestinationConflict`] when a destination node
/// exists with the wrong type (a file where a directory is needed or the
/// reverse), and an I/O error when a node cannot be read or written.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use wheelwright_installer::merge::merge_tree;
///
/// let stats = merge_tree(
///     Utf8Path::new(".install-cache/pkg"),
///     Utf8Path::new("/usr/lib/python3/site-packages"),
///     &["purelib", "platlib"],
/// )?;
/// assert!(stats.files > 0);
/// # Ok::<(), wheelwright_installer::error::InstallerError>(())
/// ```
pub fn merge_tree(src: &Utf8Path, dst: &Utf8Path, ignore: &[&str]) -> Result<MergeStats> {
    ensure_directory(dst)?;
    let mut stats = MergeStats::default();

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() != 1
                || entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !ignore.contains(&name))
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let source = utf8_path(entry.path().to_path_buf())?;
        let relative = source.strip_prefix(src).unwrap_or(&source);
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_directory(&target)?;
            stats.directories += 1;
        } else {
            copy_file(&source, &target)?;
            stats.files += 1;
        }
    }

    debug!(
        "merged {src} into {dst}: {} file(s), {} director(ies)",
        stats.files, stats.directories
    );
    Ok(stats)
}

fn ensure_directory(path: &Utf8Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(InstallerError::DestinationConflict {
            path: path.to_owned(),
            expected: NodeKind::Directory,
            found: NodeKind::File,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| InstallerError::io(path, e))
        }
        Err(e) => Err(InstallerError::io(path, e)),
    }
}

fn copy_file(source: &Utf8Path, target: &Utf8Path) -> Result<()> {
    match fs::metadata(target) {
        Ok(meta) if meta.is_dir() => {
            return Err(InstallerError::DestinationConflict {
                path: target.to_owned(),
                expected: NodeKind::File,
                found: NodeKind::Directory,
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(InstallerError::io(target, e)),
    }
    fs::copy(source, target).map_err(|e| InstallerError::io(target, e))?;
    Ok(())
}

fn walk_error(root: &Utf8Path, error: walkdir::Error) -> InstallerError {
    let path = error
        .path()
        .and_then(|p| Utf8PathBuf::from_path_buf(p.to_path_buf()).ok())
        .unwrap_or_else(|| root.to_owned());
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    InstallerError::io(&path, source)
}

//! Wheel archive extraction into the staging cache.
//!
//! Wheels are zip containers. Every entry is validated before it is written so
//! that no entry can escape the staging directory.

use crate::error::{InstallerError, Result, utf8_path};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;
use zip::ZipArchive;
use zip::result::ZipError;

/// Trait for extracting wheel archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::extraction::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, staging_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait WheelExtractor {
    /// Extract every entry of `archive` into `dest_dir`, creating it if absent.
    ///
    /// Returns the relative paths of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::ArchiveNotFound`] if the archive does not
    /// exist, [`InstallerError::AccessDenied`] on permission failures and
    /// [`InstallerError::CorruptArchive`] for malformed container data or
    /// entries that would escape `dest_dir`.
    fn extract(&self, archive: &Utf8Path, dest_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>>;
}

/// Default extractor backed by the `zip` crate.
pub struct ZipExtractor;

impl WheelExtractor for ZipExtractor {
    fn extract(&self, archive: &Utf8Path, dest_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let file = fs::File::open(archive).map_err(|e| open_error(archive, e))?;
        let mut zip = ZipArchive::new(file).map_err(|e| container_error(archive, e))?;

        fs::create_dir_all(dest_dir).map_err(|e| InstallerError::io(dest_dir, e))?;

        let mut extracted = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| container_error(archive, e))?;

            let relative = entry
                .enclosed_name()
                .ok_or_else(|| InstallerError::CorruptArchive {
                    path: archive.to_owned(),
                    reason: format!("entry {} escapes the extraction root", entry.name()),
                })?;
            let relative = utf8_path(relative)?;
            let target = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| InstallerError::io(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
            }
            let mut output =
                fs::File::create(&target).map_err(|e| InstallerError::io(&target, e))?;
            io::copy(&mut entry, &mut output).map_err(|e| InstallerError::CorruptArchive {
                path: archive.to_owned(),
                reason: format!("failed to read entry {relative}: {e}"),
            })?;

            restore_mode(&target, entry.unix_mode())?;
            extracted.push(relative);
        }

        debug!("extracted {} file(s) from {archive}", extracted.len());
        Ok(extracted)
    }
}

#[cfg(unix)]
fn restore_mode(path: &Utf8Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    // The owner keeps read and write access so later phases can rewrite and merge.
    fs::set_permissions(path, fs::Permissions::from_mode((mode & 0o777) | 0o600))
        .map_err(|e| InstallerError::io(path, e))
}

#[cfg(not(unix))]
fn restore_mode(_path: &Utf8Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

fn open_error(archive: &Utf8Path, source: io::Error) -> InstallerError {
    if source.kind() == io::ErrorKind::NotFound {
        InstallerError::ArchiveNotFound {
            path: archive.to_owned(),
        }
    } else {
        InstallerError::io(archive, source)
    }
}

fn container_error(archive: &Utf8Path, source: ZipError) -> InstallerError {
    match source {
        ZipError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            InstallerError::AccessDenied {
                path: archive.to_owned(),
            }
        }
        other => InstallerError::CorruptArchive {
            path: archive.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::WheelBuilder;
    use rstest::rstest;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
        (temp, root)
    }

    #[test]
    fn extracts_nested_entries() {
        let (_temp, root) = temp_root();
        let archive = WheelBuilder::new("pkg", "1.0")
            .file("pkg/__init__.py", "VALUE = 1\n")
            .file("pkg/sub/mod.py", "")
            .write_to(&root)
            .expect("write wheel");

        let staging = root.join("staging");
        let files = ZipExtractor.extract(&archive, &staging).expect("extract");

        assert!(files.contains(&Utf8PathBuf::from("pkg/sub/mod.py")));
        assert!(staging.join("pkg-1.0.dist-info/WHEEL").is_file());
        let contents = fs::read_to_string(staging.join("pkg/__init__.py")).expect("read");
        assert_eq!(contents, "VALUE = 1\n");
    }

    #[test]
    fn missing_archive_is_reported() {
        let (_temp, root) = temp_root();
        let result = ZipExtractor.extract(&root.join("absent.whl"), &root.join("out"));
        assert!(matches!(result, Err(InstallerError::ArchiveNotFound { .. })));
    }

    #[test]
    fn garbage_container_is_corrupt() {
        let (_temp, root) = temp_root();
        let archive = root.join("broken-1.0-py3-none-any.whl");
        fs::write(&archive, b"definitely not a zip file").expect("write");

        let result = ZipExtractor.extract(&archive, &root.join("out"));
        assert!(matches!(result, Err(InstallerError::CorruptArchive { .. })));
        assert!(!root.join("out").exists(), "nothing should be staged");
    }

    #[test]
    fn truncated_container_is_corrupt() {
        let (_temp, root) = temp_root();
        let archive = WheelBuilder::new("pkg", "1.0")
            .file("pkg/__init__.py", "x = 1\n")
            .write_to(&root)
            .expect("write wheel");
        let bytes = fs::read(&archive).expect("read");
        let half = bytes.get(..bytes.len() / 2).expect("slice");
        fs::write(&archive, half).expect("truncate");

        let result = ZipExtractor.extract(&archive, &root.join("out"));
        assert!(matches!(result, Err(InstallerError::CorruptArchive { .. })));
    }

    #[test]
    fn rejects_entries_escaping_the_root() {
        let (_temp, root) = temp_root();
        let archive = WheelBuilder::new("pkg", "1.0")
            .file("../evil.py", "")
            .write_to(&root)
            .expect("write wheel");

        let result = ZipExtractor.extract(&archive, &root.join("out"));
        assert!(matches!(result, Err(InstallerError::CorruptArchive { .. })));
        assert!(!root.join("evil.py").exists());
    }

    #[cfg(unix)]
    #[rstest]
    #[case::read_only(0o444, 0o644)]
    #[case::no_access(0o000, 0o600)]
    #[case::executable(0o755, 0o755)]
    fn stored_modes_keep_the_file_writable(#[case] stored: u32, #[case] expected: u32) {
        use std::os::unix::fs::PermissionsExt;

        let (_temp, root) = temp_root();
        let archive = WheelBuilder::new("pkg", "1.0")
            .entry("pkg/locked.py", "x = 1\n", stored)
            .write_to(&root)
            .expect("write wheel");

        let staging = root.join("staging");
        ZipExtractor.extract(&archive, &staging).expect("extract");

        let target = staging.join("pkg/locked.py");
        let mode = fs::metadata(&target).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, expected);
        fs::write(&target, "x = 2\n").expect("file stays writable");
    }
}

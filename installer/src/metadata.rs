//! Reading the self-describing metadata of a wheel.
//!
//! The `WHEEL` descriptor inside `<pkg>.dist-info` is a list of `key: value`
//! lines. Lines without a colon are ignored. When a `METADATA` file is present
//! its header block is appended so dependency fields (`Requires-Python`,
//! `Requires-Dist`) can be looked up from a single mapping.

use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;

/// Name of the wheel descriptor file.
pub const WHEEL_FILE: &str = "WHEEL";

/// Name of the core metadata file.
pub const METADATA_FILE: &str = "METADATA";

/// Key holding the wheel format version.
pub const WHEEL_VERSION_KEY: &str = "Wheel-Version";

/// Key deciding whether root payload is pure or platform-specific.
pub const ROOT_IS_PURELIB_KEY: &str = "Root-Is-Purelib";

/// Ordered `key: value` entries read from a wheel's metadata.
///
/// Keys may repeat (`Requires-Dist`); [`PackageMetadata::get`] returns the
/// first occurrence and [`PackageMetadata::get_all`] every occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    entries: Vec<(String, String)>,
}

impl PackageMetadata {
    /// Parse descriptor text, one `key: value` pair per line.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheelwright_installer::metadata::PackageMetadata;
    ///
    /// let metadata = PackageMetadata::parse("Wheel-Version: 1.0\nnonsense\nTag: py3-none-any\n");
    /// assert_eq!(metadata.get("Wheel-Version"), Some("1.0"));
    /// assert_eq!(metadata.len(), 2);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .collect();
        Self { entries }
    }

    /// Append the header block of a `METADATA` file.
    ///
    /// Headers end at the first blank line. Continuation lines (starting with
    /// whitespace) belong to free-text fields and are skipped.
    pub fn extend_with_core_metadata(&mut self, text: &str) {
        let headers = text
            .lines()
            .take_while(|line| !line.trim().is_empty())
            .filter(|line| !line.starts_with(char::is_whitespace))
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()));
        self.entries.extend(headers);
    }

    /// First value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `key`, in file order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true when no entry was read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the declared `Wheel-Version`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::InvalidMetadata`] when the key is absent or
    /// its value is not a `major.minor` pair.
    pub fn wheel_version(&self) -> Result<WheelVersion> {
        let raw = self
            .get(WHEEL_VERSION_KEY)
            .ok_or_else(|| missing_key(WHEEL_VERSION_KEY))?;
        raw.parse()
    }

    /// Return true when `Root-Is-Purelib` is exactly `true`.
    ///
    /// Any other value, including an absent key, selects platlib.
    #[must_use]
    pub fn root_is_purelib(&self) -> bool {
        self.get(ROOT_IS_PURELIB_KEY) == Some("true")
    }
}

fn missing_key(key: &str) -> InstallerError {
    InstallerError::InvalidMetadata {
        key: key.to_owned(),
        reason: "required key is missing".to_owned(),
    }
}

/// A wheel format version as a `(major, minor)` pair.
///
/// Ordering is component-wise, so `1.10` is newer than `1.9`.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::metadata::WheelVersion;
///
/// let declared: WheelVersion = "1.0".parse()?;
/// assert!(declared <= WheelVersion::SUPPORTED);
/// # Ok::<(), wheelwright_installer::error::InstallerError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WheelVersion {
    major: u32,
    minor: u32,
}

impl WheelVersion {
    /// The newest wheel format this installer understands.
    pub const SUPPORTED: Self = Self { major: 1, minor: 0 };

    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Major component.
    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }
}

impl std::str::FromStr for WheelVersion {
    type Err = InstallerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || InstallerError::InvalidMetadata {
            key: WHEEL_VERSION_KEY.to_owned(),
            reason: format!("{s:?} is not a major.minor version"),
        };
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for WheelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Read the metadata of the `.dist-info` directory at `dist_info`.
///
/// # Errors
///
/// Returns [`InstallerError::MissingMetadataFile`] when `WHEEL` is absent and
/// [`InstallerError::AccessDenied`] when it cannot be opened for permission
/// reasons.
pub fn read_wheel_metadata(dist_info: &Utf8Path) -> Result<PackageMetadata> {
    let wheel_path = dist_info.join(WHEEL_FILE);
    let text = fs::read_to_string(&wheel_path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => InstallerError::MissingMetadataFile {
            path: wheel_path.clone(),
        },
        _ => InstallerError::io(&wheel_path, e),
    })?;
    let mut metadata = PackageMetadata::parse(&text);

    let core_path = dist_info.join(METADATA_FILE);
    match fs::read_to_string(&core_path) {
        Ok(core) => metadata.extend_with_core_metadata(&core),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("no {METADATA_FILE} in {dist_info}");
        }
        Err(e) => return Err(InstallerError::io(&core_path, e)),
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn splits_on_the_first_colon_only() {
        let metadata = PackageMetadata::parse("Generator: tool: 1.2\n");
        assert_eq!(metadata.get("Generator"), Some("tool: 1.2"));
    }

    #[test]
    fn keeps_repeated_keys_in_order() {
        let metadata = PackageMetadata::parse("Tag: py2-none-any\nTag: py3-none-any\n");
        let tags: Vec<_> = metadata.get_all("Tag").collect();
        assert_eq!(tags, ["py2-none-any", "py3-none-any"]);
        assert_eq!(metadata.get("Tag"), Some("py2-none-any"));
    }

    #[test]
    fn core_metadata_headers_stop_at_blank_line() {
        let mut metadata = PackageMetadata::parse("Wheel-Version: 1.0\n");
        metadata.extend_with_core_metadata(concat!(
            "Metadata-Version: 2.1\n",
            "Requires-Dist: attrs (>=20)\n",
            "License: MIT\n",
            "        continued: text\n",
            "Requires-Python: >=3.8\n",
            "\n",
            "Requires-Dist: not-a-header\n",
        ));
        let requires: Vec<_> = metadata.get_all("Requires-Dist").collect();
        assert_eq!(requires, ["attrs (>=20)"]);
        assert_eq!(metadata.get("Requires-Python"), Some(">=3.8"));
        assert_eq!(metadata.get("continued"), None);
    }

    #[rstest]
    #[case::supported("1.0", true)]
    #[case::older("0.9", true)]
    #[case::newer_minor("1.1", false)]
    #[case::newer_major("2.0", false)]
    fn compares_against_supported_ceiling(#[case] raw: &str, #[case] accepted: bool) {
        let version: WheelVersion = raw.parse().expect("valid version");
        assert_eq!(version <= WheelVersion::SUPPORTED, accepted);
    }

    #[test]
    fn compares_components_numerically() {
        let nine: WheelVersion = "1.9".parse().expect("valid");
        let ten: WheelVersion = "1.10".parse().expect("valid");
        assert!(ten > nine);
    }

    #[rstest]
    #[case::words("one.zero")]
    #[case::single("1")]
    #[case::triple("1.0.0")]
    #[case::empty("")]
    fn rejects_unparsable_wheel_versions(#[case] raw: &str) {
        let result: Result<WheelVersion> = raw.parse();
        assert!(matches!(result, Err(InstallerError::InvalidMetadata { .. })));
    }

    #[rstest]
    #[case::true_value("Root-Is-Purelib: true\n", true)]
    #[case::false_value("Root-Is-Purelib: false\n", false)]
    #[case::capitalised("Root-Is-Purelib: True\n", false)]
    #[case::absent("Wheel-Version: 1.0\n", false)]
    fn root_is_purelib_requires_literal_true(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(PackageMetadata::parse(text).root_is_purelib(), expected);
    }

    #[test]
    fn missing_wheel_file_is_reported() {
        let temp = TempDir::new().expect("temp dir");
        let dist_info = Utf8PathBuf::try_from(temp.path().join("pkg-1.0.dist-info")).expect("UTF-8");
        std::fs::create_dir_all(&dist_info).expect("mkdir");

        let result = read_wheel_metadata(&dist_info);
        assert!(matches!(result, Err(InstallerError::MissingMetadataFile { .. })));
    }

    #[test]
    fn reads_wheel_then_core_metadata() {
        let temp = TempDir::new().expect("temp dir");
        let dist_info = Utf8PathBuf::try_from(temp.path().join("pkg-1.0.dist-info")).expect("UTF-8");
        std::fs::create_dir_all(&dist_info).expect("mkdir");
        std::fs::write(dist_info.join("WHEEL"), "Wheel-Version: 1.0\nRoot-Is-Purelib: true\n")
            .expect("write WHEEL");
        std::fs::write(dist_info.join("METADATA"), "Name: pkg\nRequires-Dist: six\n")
            .expect("write METADATA");

        let metadata = read_wheel_metadata(&dist_info).expect("read");
        assert_eq!(metadata.wheel_version().expect("version"), WheelVersion::new(1, 0));
        assert!(metadata.root_is_purelib());
        assert_eq!(metadata.get_all("Requires-Dist").collect::<Vec<_>>(), ["six"]);
    }
}

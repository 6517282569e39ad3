//! PEP 508 dependency specifications as found in `Requires-Dist`.

use super::error::{ParseError, Result};
use super::marker::Marker;
use super::version::VersionSpecifiers;
use std::fmt;
use std::str::FromStr;

/// A parsed `Requires-Dist` entry.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::requirement::Requirement;
///
/// let req: Requirement = r#"requests[socks] (>=2.8) ; python_version >= "3""#.parse()?;
/// assert_eq!(req.name(), "requests");
/// assert_eq!(req.extras(), ["socks"]);
/// assert!(req.marker().is_some());
/// # Ok::<(), wheelwright_installer::compat::error::ParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    raw: String,
    name: String,
    extras: Vec<String>,
    specifiers: VersionSpecifiers,
    url: Option<String>,
    marker: Option<Marker>,
}

impl Requirement {
    /// Distribution name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested extras.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// Version constraints; empty for URL requirements.
    #[must_use]
    pub const fn specifiers(&self) -> &VersionSpecifiers {
        &self.specifiers
    }

    /// Direct reference, for `name @ url` requirements.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Environment marker guarding the requirement.
    #[must_use]
    pub const fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }
}

fn split_marker(input: &str) -> Result<(&str, Option<Marker>)> {
    match input.split_once(';') {
        Some((body, marker)) => Ok((body, Some(marker.parse()?))),
        None => Ok((input, None)),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl FromStr for Requirement {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self> {
        let (body, marker) = split_marker(input)?;
        let body = body.trim();

        let name_end = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
        let (name, rest) = body.split_at(name_end);
        if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ParseError::new(input, "missing distribution name"));
        }
        let mut rest = rest.trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (list, tail) = after
                .split_once(']')
                .ok_or_else(|| ParseError::new(input, "unterminated extras list"))?;
            extras = list
                .split(',')
                .map(str::trim)
                .filter(|extra| !extra.is_empty())
                .map(str::to_owned)
                .collect();
            rest = tail.trim_start();
        }

        let mut url = None;
        let specifiers = if let Some(reference) = rest.strip_prefix('@') {
            let reference = reference.trim();
            if reference.is_empty() {
                return Err(ParseError::new(input, "missing URL after @"));
            }
            url = Some(reference.to_owned());
            VersionSpecifiers::default()
        } else {
            let spec = match rest.strip_prefix('(') {
                Some(inner) => inner
                    .strip_suffix(')')
                    .ok_or_else(|| ParseError::new(input, "unbalanced parentheses"))?,
                None => rest,
            };
            spec.parse()?
        };

        Ok(Self {
            raw: input.trim().to_owned(),
            name: name.to_owned(),
            extras,
            specifiers,
            url,
            marker,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

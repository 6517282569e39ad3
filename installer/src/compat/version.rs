//! PEP 440 versions and version specifiers.
//!
//! Covers the forms found in `Requires-Python` and `Requires-Dist`: epochs,
//! release segments, pre/post/dev releases and local labels, compared with
//! PEP 440 ordering. Pre-release exclusion rules for `<`/`>` are not applied.

use super::error::{ParseError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Pre-release phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    /// `a`, `alpha`.
    Alpha,
    /// `b`, `beta`.
    Beta,
    /// `rc`, `c`, `pre`, `preview`.
    ReleaseCandidate,
}

impl PreKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::ReleaseCandidate => "rc",
        }
    }
}

/// A parsed PEP 440 version.
///
/// Equality follows ordering, so `1.0` equals `1.0.0`.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::version::Version;
///
/// let rc: Version = "2.0rc1".parse()?;
/// let final_release: Version = "2.0".parse()?;
/// assert!(rc < final_release);
/// # Ok::<(), wheelwright_installer::compat::error::ParseError>(())
/// ```
#[derive(Debug, Clone, Eq)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

impl Version {
    /// Build a final release from its numeric components.
    #[must_use]
    pub fn from_release(release: &[u64]) -> Self {
        Self {
            epoch: 0,
            release: release.to_vec(),
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    /// Release segment, e.g. `[3, 11, 4]`.
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Return true for pre-releases and development releases.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// The version with any local label removed.
    #[must_use]
    pub fn public(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    fn trimmed_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1);
        self.release.get(..len).unwrap_or_default()
    }

    /// Same epoch and release, ignoring pre, post, dev and local parts.
    fn same_base(&self, other: &Self) -> bool {
        self.epoch == other.epoch && self.trimmed_release() == other.trimmed_release()
    }

    fn release_prefix_matches(&self, prefix: &[u64], epoch: u64) -> bool {
        self.epoch == epoch
            && prefix
                .iter()
                .enumerate()
                .all(|(i, n)| self.release.get(i).copied().unwrap_or(0) == *n)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |v: &Self| {
            let pre = match (v.pre, v.post, v.dev) {
                (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
                (None, None, Some(_)) => PreKey::DevOnly,
                _ => PreKey::Final,
            };
            let dev = v.dev.map_or(DevKey::None, DevKey::Dev);
            (pre, v.post, dev)
        };
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| key(self).cmp(&key(other)))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn eat_separator(&mut self) -> bool {
        match self.rest.strip_prefix(['-', '_', '.']) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn eat_word(&mut self, words: &[&'static str]) -> Option<&'static str> {
        let word = words.iter().find(|w| self.rest.starts_with(**w))?;
        self.rest = self.rest.get(word.len()..).unwrap_or_default();
        Some(word)
    }

    fn eat_number(&mut self) -> Option<u64> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (digits, rest) = self.rest.split_at(end);
        self.rest = rest;
        digits.parse().ok()
    }

    fn starts_with_digit(&self) -> bool {
        self.rest.starts_with(|c: char| c.is_ascii_digit())
    }

    fn checkpoint(&self) -> &'a str {
        self.rest
    }

    fn restore(&mut self, checkpoint: &'a str) {
        self.rest = checkpoint;
    }
}

fn parse_pre(cursor: &mut Cursor<'_>) -> Option<(PreKind, u64)> {
    let checkpoint = cursor.checkpoint();
    cursor.eat_separator();
    let Some(word) = cursor.eat_word(&["alpha", "a", "beta", "b", "preview", "pre", "rc", "c"])
    else {
        cursor.restore(checkpoint);
        return None;
    };
    let kind = match word {
        "alpha" | "a" => PreKind::Alpha,
        "beta" | "b" => PreKind::Beta,
        _ => PreKind::ReleaseCandidate,
    };
    cursor.eat_separator();
    Some((kind, cursor.eat_number().unwrap_or(0)))
}

fn parse_post(cursor: &mut Cursor<'_>) -> Option<u64> {
    let checkpoint = cursor.checkpoint();
    if let Some(rest) = cursor.rest.strip_prefix('-') {
        cursor.rest = rest;
        if cursor.starts_with_digit() {
            return cursor.eat_number();
        }
        cursor.restore(checkpoint);
    }
    cursor.eat_separator();
    if cursor.eat_word(&["post", "rev", "r"]).is_none() {
        cursor.restore(checkpoint);
        return None;
    }
    cursor.eat_separator();
    Some(cursor.eat_number().unwrap_or(0))
}

fn parse_dev(cursor: &mut Cursor<'_>) -> Option<u64> {
    let checkpoint = cursor.checkpoint();
    cursor.eat_separator();
    if cursor.eat_word(&["dev"]).is_none() {
        cursor.restore(checkpoint);
        return None;
    }
    cursor.eat_separator();
    Some(cursor.eat_number().unwrap_or(0))
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self> {
        let normalized = input.trim().to_ascii_lowercase();
        let normalized = normalized.strip_prefix('v').unwrap_or(&normalized);
        let (public, local) = match normalized.split_once('+') {
            Some((public, local)) if !local.is_empty() => (public, Some(local.replace(['-', '_'], "."))),
            Some(_) => return Err(ParseError::new(input, "empty local version label")),
            None => (normalized, None),
        };
        let (epoch, rest) = match public.split_once('!') {
            Some((epoch, rest)) => (
                epoch
                    .parse()
                    .map_err(|_| ParseError::new(input, "invalid epoch"))?,
                rest,
            ),
            None => (0, public),
        };

        let mut cursor = Cursor { rest };
        let mut release = vec![
            cursor
                .eat_number()
                .ok_or_else(|| ParseError::new(input, "version must start with a number"))?,
        ];
        while let Some(next) = cursor.rest.strip_prefix('.') {
            if !next.starts_with(|c: char| c.is_ascii_digit()) {
                break;
            }
            cursor.rest = next;
            if let Some(n) = cursor.eat_number() {
                release.push(n);
            }
        }

        let pre = parse_pre(&mut cursor);
        let post = parse_post(&mut cursor);
        let dev = parse_dev(&mut cursor);
        if !cursor.rest.is_empty() {
            return Err(ParseError::new(
                input,
                format!("unexpected trailing text {:?}", cursor.rest),
            ));
        }

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{n}", kind.label())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// Comparison operator of a version specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `~=`
    Compatible,
    /// `===`
    ArbitraryEqual,
}

impl Operator {
    /// Operator spellings, longest first so prefixes match greedily.
    const SPELLINGS: [(&'static str, Self); 8] = [
        ("===", Self::ArbitraryEqual),
        ("~=", Self::Compatible),
        ("==", Self::Equal),
        ("!=", Self::NotEqual),
        ("<=", Self::LessEqual),
        (">=", Self::GreaterEqual),
        ("<", Self::Less),
        (">", Self::Greater),
    ];

    /// Textual form of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Compatible => "~=",
            Self::ArbitraryEqual => "===",
        }
    }

    /// Split a leading operator off `text`.
    pub(crate) fn split_prefix(text: &str) -> Option<(Self, &str)> {
        Self::SPELLINGS
            .iter()
            .find_map(|(spelling, op)| text.strip_prefix(spelling).map(|rest| (*op, rest)))
    }
}

/// A single version constraint such as `>=3.8` or `==1.4.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    operator: Operator,
    raw: String,
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    /// The comparison operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Return true when `version` satisfies this constraint.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        let Some(spec) = &self.version else {
            return version.to_string().eq_ignore_ascii_case(&self.raw);
        };
        let candidate = if spec.local.is_some() {
            version.clone()
        } else {
            version.public()
        };
        match self.operator {
            Operator::Equal if self.wildcard => {
                candidate.release_prefix_matches(&spec.release, spec.epoch)
            }
            Operator::NotEqual if self.wildcard => {
                !candidate.release_prefix_matches(&spec.release, spec.epoch)
            }
            Operator::Equal => candidate == *spec,
            Operator::NotEqual => candidate != *spec,
            Operator::LessEqual => candidate <= *spec,
            Operator::GreaterEqual => candidate >= *spec,
            Operator::Less => {
                candidate < *spec
                    && (spec.is_prerelease()
                        || !candidate.is_prerelease()
                        || !candidate.same_base(spec))
            }
            Operator::Greater => {
                candidate > *spec
                    && (spec.post.is_some() || candidate.post.is_none() || !candidate.same_base(spec))
            }
            Operator::Compatible => {
                let prefix = spec
                    .release
                    .get(..spec.release.len().saturating_sub(1))
                    .unwrap_or_default();
                candidate >= *spec && candidate.release_prefix_matches(prefix, spec.epoch)
            }
            Operator::ArbitraryEqual => version.to_string().eq_ignore_ascii_case(&self.raw),
        }
    }
}

impl FromStr for Specifier {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self> {
        let text = input.trim();
        let (operator, rest) = Operator::split_prefix(text)
            .ok_or_else(|| ParseError::new(input, "missing comparison operator"))?;
        let raw = rest.trim();
        if raw.is_empty() {
            return Err(ParseError::new(input, "missing version after operator"));
        }

        if operator == Operator::ArbitraryEqual {
            return Ok(Self {
                operator,
                raw: raw.to_owned(),
                version: None,
                wildcard: false,
            });
        }

        let (version_text, wildcard) = match raw.strip_suffix(".*") {
            Some(prefix) if matches!(operator, Operator::Equal | Operator::NotEqual) => {
                (prefix, true)
            }
            Some(_) => {
                return Err(ParseError::new(
                    input,
                    "wildcards are only allowed with == and !=",
                ));
            }
            None => (raw, false),
        };
        let version: Version = version_text.parse()?;
        if operator == Operator::Compatible && version.release.len() < 2 {
            return Err(ParseError::new(
                input,
                "~= needs at least two release components",
            ));
        }

        Ok(Self {
            operator,
            raw: raw.to_owned(),
            version: Some(version),
            wildcard,
        })
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.raw)
    }
}

/// A comma-separated conjunction of specifiers.
///
/// An empty set matches every version.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::version::{Version, VersionSpecifiers};
///
/// let spec: VersionSpecifiers = ">=3.8, !=3.9.0, <4".parse()?;
/// assert!(spec.contains(&"3.11.4".parse::<Version>()?));
/// assert!(!spec.contains(&"3.9.0".parse::<Version>()?));
/// # Ok::<(), wheelwright_installer::compat::error::ParseError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSpecifiers(Vec<Specifier>);

impl VersionSpecifiers {
    /// Return true when every specifier accepts `version`.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().all(|spec| spec.contains(version))
    }

    /// Return true when there are no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The individual specifiers.
    #[must_use]
    pub fn specifiers(&self) -> &[Specifier] {
        &self.0
    }
}

impl FromStr for VersionSpecifiers {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        input
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for VersionSpecifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Specifier::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

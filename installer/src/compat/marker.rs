//! PEP 508 environment markers.
//!
//! A marker is parsed once into a [`Marker`] tree and evaluated against the
//! interpreter's marker environment. Variables missing from the environment
//! evaluate to the empty string, which is also how `extra` behaves since no
//! extras are ever requested for the archive being installed.

use super::error::{ParseError, Result};
use super::version::{Specifier, Version};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Marker variable values keyed by name (`python_version`, `sys_platform`, ...).
pub type MarkerEnvironment = BTreeMap<String, String>;

/// Comparison operator inside a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
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
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl MarkerOperator {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Compatible => "~=",
            Self::ArbitraryEqual => "===",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "<=" => Self::LessEqual,
            ">=" => Self::GreaterEqual,
            "<" => Self::Less,
            ">" => Self::Greater,
            "~=" => Self::Compatible,
            "===" => Self::ArbitraryEqual,
            _ => return None,
        })
    }
}

/// One side of a marker comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    /// An environment variable such as `python_version`.
    Variable(String),
    /// A quoted string literal.
    Literal(String),
}

impl MarkerValue {
    fn resolve<'a>(&'a self, env: &'a MarkerEnvironment) -> &'a str {
        match self {
            Self::Variable(name) => env.get(name).map_or("", String::as_str),
            Self::Literal(value) => value,
        }
    }
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => f.write_str(name),
            Self::Literal(value) => write!(f, "\"{value}\""),
        }
    }
}

/// A parsed marker expression.
///
/// # Examples
///
/// ```
/// use wheelwright_installer::compat::marker::{Marker, MarkerEnvironment};
///
/// let marker: Marker = r#"python_version >= "3.8" and os_name == "posix""#.parse()?;
/// let env = MarkerEnvironment::from([
///     ("python_version".to_owned(), "3.11".to_owned()),
///     ("os_name".to_owned(), "posix".to_owned()),
/// ]);
/// assert!(marker.evaluate(&env));
/// # Ok::<(), wheelwright_installer::compat::error::ParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Both sides must hold.
    And(Box<Marker>, Box<Marker>),
    /// Either side must hold.
    Or(Box<Marker>, Box<Marker>),
    /// A single comparison.
    Compare {
        /// Left operand.
        left: MarkerValue,
        /// Operator.
        op: MarkerOperator,
        /// Right operand.
        right: MarkerValue,
    },
}

impl Marker {
    /// Evaluate the expression against `env`.
    #[must_use]
    pub fn evaluate(&self, env: &MarkerEnvironment) -> bool {
        match self {
            Self::And(lhs, rhs) => lhs.evaluate(env) && rhs.evaluate(env),
            Self::Or(lhs, rhs) => lhs.evaluate(env) || rhs.evaluate(env),
            Self::Compare { left, op, right } => {
                compare(left.resolve(env), *op, right.resolve(env))
            }
        }
    }
}

fn compare(left: &str, op: MarkerOperator, right: &str) -> bool {
    match op {
        MarkerOperator::In => return right.contains(left),
        MarkerOperator::NotIn => return !right.contains(left),
        MarkerOperator::ArbitraryEqual => return left == right,
        _ => {}
    }

    let as_versions = left.parse::<Version>().ok().zip(
        format!("{}{right}", op.as_str())
            .parse::<Specifier>()
            .ok(),
    );
    if let Some((version, specifier)) = as_versions {
        return specifier.contains(&version);
    }

    match op {
        MarkerOperator::Equal => left == right,
        MarkerOperator::NotEqual => left != right,
        MarkerOperator::LessEqual => left <= right,
        MarkerOperator::GreaterEqual => left >= right,
        MarkerOperator::Less => left < right,
        MarkerOperator::Greater => left > right,
        // Compatible release has no string meaning.
        _ => false,
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(lhs, rhs) => write!(f, "({lhs} and {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} or {rhs})"),
            Self::Compare { left, op, right } => write!(f, "{left} {} {right}", op.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Literal(String),
    Word(String),
    Symbol(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '\'' | '"' => {
                let mut literal = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == c {
                        closed = true;
                        break;
                    }
                    literal.push(next);
                }
                if !closed {
                    return Err(ParseError::new(input, "unterminated string literal"));
                }
                tokens.push(Token::Literal(literal));
            }
            '<' | '>' | '=' | '!' | '~' => {
                let mut symbol = String::from(c);
                while let Some((_, next)) = chars.next_if(|&(_, n)| matches!(n, '<' | '>' | '=' | '!' | '~')) {
                    symbol.push(next);
                }
                tokens.push(Token::Symbol(symbol));
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((idx, next)) =
                    chars.next_if(|&(_, n)| n.is_ascii_alphanumeric() || matches!(n, '_' | '.'))
                {
                    end = idx + next.len_utf8();
                }
                tokens.push(Token::Word(input.get(start..end).unwrap_or_default().to_owned()));
            }
            other => {
                return Err(ParseError::new(
                    input,
                    format!("unexpected character {other:?}"),
                ));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.input, reason)
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn or_expr(&mut self) -> Result<Marker> {
        let mut expr = self.and_expr()?;
        while self.peek_word("or") {
            self.advance();
            expr = Marker::Or(Box::new(expr), Box::new(self.and_expr()?));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Marker> {
        let mut expr = self.atom()?;
        while self.peek_word("and") {
            self.advance();
            expr = Marker::And(Box::new(expr), Box::new(self.atom()?));
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Marker> {
        if self.peek() == Some(&Token::Open) {
            self.advance();
            let expr = self.or_expr()?;
            if self.advance() != Some(Token::Close) {
                return Err(self.error("missing closing parenthesis"));
            }
            return Ok(expr);
        }
        let left = self.value()?;
        let op = self.operator()?;
        let right = self.value()?;
        Ok(Marker::Compare { left, op, right })
    }

    fn value(&mut self) -> Result<MarkerValue> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(MarkerValue::Literal(value)),
            Some(Token::Word(name)) if !matches!(name.as_str(), "and" | "or" | "not" | "in") => {
                Ok(MarkerValue::Variable(name))
            }
            _ => Err(self.error("expected a marker variable or quoted string")),
        }
    }

    fn operator(&mut self) -> Result<MarkerOperator> {
        match self.advance() {
            Some(Token::Symbol(symbol)) => MarkerOperator::from_symbol(&symbol)
                .ok_or_else(|| self.error(format!("unknown operator {symbol:?}"))),
            Some(Token::Word(word)) if word == "in" => Ok(MarkerOperator::In),
            Some(Token::Word(word)) if word == "not" => {
                if self.peek_word("in") {
                    self.advance();
                    Ok(MarkerOperator::NotIn)
                } else {
                    Err(self.error("expected `in` after `not`"))
                }
            }
            _ => Err(self.error("expected a comparison operator")),
        }
    }
}

impl FromStr for Marker {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ParseError::new(input, "empty marker"));
        }
        let mut parser = Parser {
            input,
            tokens,
            position: 0,
        };
        let marker = parser.or_expr()?;
        if parser.peek().is_some() {
            return Err(parser.error("unexpected trailing tokens"));
        }
        Ok(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn linux_py311() -> MarkerEnvironment {
        [
            ("python_version", "3.11"),
            ("python_full_version", "3.11.4"),
            ("os_name", "posix"),
            ("sys_platform", "linux"),
            ("platform_machine", "x86_64"),
            ("implementation_name", "cpython"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    #[rstest]
    #[case(r#"python_version >= "3.8""#, true)]
    #[case(r#"python_version < "3.8""#, false)]
    #[case(r#""3.8" <= python_version"#, true)]
    #[case(r#"python_full_version == "3.11.*""#, true)]
    #[case(r#"sys_platform == "win32""#, false)]
    #[case(r#"sys_platform != "win32""#, true)]
    #[case(r#"sys_platform == "win32" or os_name == "posix""#, true)]
    #[case(r#"sys_platform == "linux" and python_version < "3""#, false)]
    #[case(r#"(sys_platform == "win32" or sys_platform == "linux") and python_version >= "3.10""#, true)]
    #[case(r#"platform_machine in "x86_64 aarch64""#, true)]
    #[case(r#"platform_machine not in "x86_64 aarch64""#, false)]
    #[case(r#"extra == "test""#, false)]
    #[case(r#"'cpython' == implementation_name"#, true)]
    fn evaluates_against_environment(
        linux_py311: MarkerEnvironment,
        #[case] text: &str,
        #[case] expected: bool,
    ) {
        let marker: Marker = text.parse().expect("valid marker");
        assert_eq!(marker.evaluate(&linux_py311), expected, "{text}");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let marker: Marker = r#"os_name == "nt" and sys_platform == "win32" or os_name == "posix""#
            .parse()
            .expect("valid");
        assert!(matches!(marker, Marker::Or(..)));
    }

    #[rstest]
    #[case::empty("")]
    #[case::unterminated(r#"os_name == "posix"#)]
    #[case::missing_operator(r#"os_name "posix""#)]
    #[case::unknown_operator(r#"os_name <> "posix""#)]
    #[case::dangling_not(r#"os_name not "posix""#)]
    #[case::unbalanced(r#"(os_name == "posix""#)]
    #[case::trailing(r#"os_name == "posix" os_name"#)]
    fn rejects_malformed_markers(#[case] text: &str) {
        assert!(text.parse::<Marker>().is_err(), "{text} should be rejected");
    }
}

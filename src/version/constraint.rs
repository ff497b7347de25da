//! Range constraint expressions
//!
//! Supported syntax:
//! - `1.2.3`, `=1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0, narrower for 0.x)
//! - `~1.2.3` - patch upgrades only (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `*` - wildcards
//! - `1.0.0 - 2.0.0` - inclusive hyphen range
//!
//! Comparators separated by whitespace are ANDed; groups separated by `||`
//! are ORed. An empty string parses to [`Constraint::Unconstrained`], which
//! matches nothing.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::version::error::ParseError;
use crate::version::semver::{parse_version, parse_version_lenient};

/// Collapses `>= 1.0` into `>=1.0` so operators and versions tokenize together.
static OPERATOR_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|>|<|=|\^|~)\s+").expect("operator regex is valid"));

static HYPHEN_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").expect("hyphen regex is valid"));

/// A parsed range constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Blank constraint: the legacy "unversioned" state. Matches nothing.
    Unconstrained,
    Range(RangeExpr),
}

/// Boolean expression over comparators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeExpr {
    Comparator(Comparator),
    /// Space-separated comparators, all must hold
    All(Vec<RangeExpr>),
    /// `||`-separated groups, any may hold
    Any(Vec<RangeExpr>),
}

/// A single primitive comparator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    Exact(Version),
    Greater(Version),
    GreaterEq(Version),
    Less(Version),
    LessEq(Version),
    /// ^1.2.3 means >=1.2.3 <2.0.0 (or special cases for 0.x)
    Caret(Version),
    /// ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    /// `*` matches every version
    Wildcard,
    /// 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
    /// 1.0.0 - 2.0.0 means >=1.0.0 <=2.0.0
    Hyphen { from: Version, to: Version },
}

impl Constraint {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let range = input.trim();
        if range.is_empty() {
            return Ok(Constraint::Unconstrained);
        }

        let groups = range
            .split("||")
            .map(|group| parse_group(input, group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Constraint::Range(collapse(groups, RangeExpr::Any)))
    }

    /// Whether this is the blank "unversioned/legacy" constraint
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Constraint::Unconstrained)
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Constraint::Unconstrained => false,
            Constraint::Range(expr) => expr.matches(version),
        }
    }
}

impl FromStr for Constraint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::parse(s)
    }
}

impl RangeExpr {
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            RangeExpr::Comparator(comparator) => comparator.matches(version),
            RangeExpr::All(exprs) => exprs.iter().all(|e| e.matches(version)),
            RangeExpr::Any(exprs) => exprs.iter().any(|e| e.matches(version)),
        }
    }
}

impl Comparator {
    fn parse(token: &str) -> Result<Self, ParseError> {
        let version = |rest: &str| parse_version(rest).map_err(|_| invalid_operand(token));

        if let Some(rest) = token.strip_prefix(">=") {
            version(rest).map(Comparator::GreaterEq)
        } else if let Some(rest) = token.strip_prefix('>') {
            version(rest).map(Comparator::Greater)
        } else if let Some(rest) = token.strip_prefix("<=") {
            version(rest).map(Comparator::LessEq)
        } else if let Some(rest) = token.strip_prefix('<') {
            version(rest).map(Comparator::Less)
        } else if let Some(rest) = token.strip_prefix('=') {
            version(rest).map(Comparator::Exact)
        } else if let Some(rest) = token.strip_prefix('^') {
            version(rest).map(Comparator::Caret)
        } else if let Some(rest) = token.strip_prefix('~') {
            version(rest).map(Comparator::Tilde)
        } else if matches!(token, "*" | "x" | "X") {
            Ok(Comparator::Wildcard)
        } else if let Some(wildcard) = parse_wildcard(token) {
            Ok(wildcard)
        } else {
            version(token).map(Comparator::Exact)
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::Greater(v) => version > v,
            Comparator::GreaterEq(v) => version >= v,
            Comparator::Less(v) => version < v,
            Comparator::LessEq(v) => version <= v,
            Comparator::Caret(v) => {
                if version < v {
                    return false;
                }
                // ^1.2.3 -> >=1.2.3 <2.0.0
                // ^0.2.3 -> >=0.2.3 <0.3.0
                // ^0.0.3 -> >=0.0.3 <0.0.4
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            Comparator::Tilde(v) => {
                version >= v && version.major == v.major && version.minor == v.minor
            }
            Comparator::Wildcard => true,
            Comparator::WildcardMajor(major) => version.major == *major,
            Comparator::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
            Comparator::Hyphen { from, to } => version >= from && version <= to,
        }
    }
}

fn parse_group(input: &str, group: &str) -> Result<RangeExpr, ParseError> {
    let group = group.trim();
    if group.is_empty() {
        return Err(ParseError::constraint(input, "empty alternative"));
    }

    if let Some(caps) = HYPHEN_RANGE.captures(group) {
        let from = parse_version(&caps[1]).map_err(|_| invalid_operand(&caps[1]))?;
        let to = parse_version(&caps[2]).map_err(|_| invalid_operand(&caps[2]))?;
        return Ok(RangeExpr::Comparator(Comparator::Hyphen { from, to }));
    }

    let normalized = OPERATOR_SPACING.replace_all(group, "$1");
    let comparators = normalized
        .split_whitespace()
        .map(|token| Comparator::parse(token).map(RangeExpr::Comparator))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| match e {
            ParseError::InvalidConstraint { reason, .. } => ParseError::constraint(input, reason),
            other => other,
        })?;

    Ok(collapse(comparators, RangeExpr::All))
}

/// Parse wildcard patterns like "1.x", "1.2.x" or "1.*"
fn parse_wildcard(token: &str) -> Option<Comparator> {
    let is_wild = |s: &str| s.eq_ignore_ascii_case("x") || s == "*";
    let parts: Vec<&str> = token.split('.').collect();

    match parts.as_slice() {
        [major, x] if is_wild(x) => major.parse::<u64>().ok().map(Comparator::WildcardMajor),
        [major, x, y] if is_wild(x) && is_wild(y) => {
            major.parse::<u64>().ok().map(Comparator::WildcardMajor)
        }
        [major, minor, x] if is_wild(x) => {
            let major = major.parse::<u64>().ok()?;
            let minor = minor.parse::<u64>().ok()?;
            Some(Comparator::WildcardMinor(major, minor))
        }
        _ => None,
    }
}

fn invalid_operand(token: &str) -> ParseError {
    ParseError::constraint(token, format!("invalid comparator {token:?}"))
}

fn collapse(mut exprs: Vec<RangeExpr>, wrap: fn(Vec<RangeExpr>) -> RangeExpr) -> RangeExpr {
    if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        wrap(exprs)
    }
}

/// Parse a constraint string
pub fn parse_constraint(input: &str) -> Result<Constraint, ParseError> {
    Constraint::parse(input)
}

/// Evaluate a parsed constraint against a version
pub fn matches(constraint: &Constraint, version: &Version) -> bool {
    constraint.matches(version)
}

/// Evaluate raw strings, failing closed: anything malformed matches nothing.
pub fn matches_str(constraint: &str, version: &str) -> bool {
    let Ok(constraint) = Constraint::parse(constraint) else {
        return false;
    };
    parse_version_lenient(version).is_some_and(|v| constraint.matches(&v))
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Unconstrained => Ok(()),
            Constraint::Range(expr) => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for RangeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, exprs: &[RangeExpr], sep: &str| {
            for (i, expr) in exprs.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{expr}")?;
            }
            Ok(())
        };

        match self {
            RangeExpr::Comparator(c) => write!(f, "{c}"),
            RangeExpr::All(exprs) => join(f, exprs, " "),
            RangeExpr::Any(exprs) => join(f, exprs, " || "),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Exact(v) => write!(f, "={v}"),
            Comparator::Greater(v) => write!(f, ">{v}"),
            Comparator::GreaterEq(v) => write!(f, ">={v}"),
            Comparator::Less(v) => write!(f, "<{v}"),
            Comparator::LessEq(v) => write!(f, "<={v}"),
            Comparator::Caret(v) => write!(f, "^{v}"),
            Comparator::Tilde(v) => write!(f, "~{v}"),
            Comparator::Wildcard => f.write_str("*"),
            Comparator::WildcardMajor(major) => write!(f, "{major}.x"),
            Comparator::WildcardMinor(major, minor) => write!(f, "{major}.{minor}.x"),
            Comparator::Hyphen { from, to } => write!(f, "{from} - {to}"),
        }
    }
}

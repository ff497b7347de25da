//! SemVer matching layer
//!
//! Turns raw version and range-constraint strings into comparable values.
//! Everything here is pure; malformed input surfaces as [`error::ParseError`]
//! and callers that resolve batches treat it as "matches nothing".
//!
//! # Modules
//!
//! - [`semver`]: Lenient version parsing (partial versions, `v` prefix)
//! - [`constraint`]: Range expression AST, parser, and evaluation
//! - [`error`]: Parse error types

pub mod constraint;
pub mod error;
pub mod semver;

pub use constraint::{Comparator, Constraint, RangeExpr, matches, matches_str, parse_constraint};
pub use error::ParseError;
pub use self::semver::parse_version;

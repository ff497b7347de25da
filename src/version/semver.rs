use semver::Version;

use crate::version::error::ParseError;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.20" by padding with zeros, and
/// tolerates a leading `v`. Pre-release and build suffixes are kept and
/// attached after padding, so "1.20-pre1" becomes "1.20.0-pre1".
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3-beta.1" -> Version(1, 2, 3, pre = "beta.1")
pub fn parse_version(version: &str) -> Result<Version, ParseError> {
    let trimmed = version.trim();
    let invalid = || ParseError::InvalidVersion {
        input: version.to_string(),
    };

    let unprefixed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if unprefixed.is_empty() {
        return Err(invalid());
    }

    let (core, suffix) = match unprefixed.find(['-', '+']) {
        Some(idx) => unprefixed.split_at(idx),
        None => (unprefixed, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], suffix),
        2 => format!("{}.{}.0{}", parts[0], parts[1], suffix),
        _ => unprefixed.to_string(),
    };

    Version::parse(&normalized).map_err(|_| invalid())
}

/// Parse a version, returning None instead of an error.
///
/// Used where malformed data must fail closed rather than abort a batch.
pub fn parse_version_lenient(version: &str) -> Option<Version> {
    parse_version(version).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cmp::Ordering;

    #[rstest]
    #[case("1", "1.0.0")]
    #[case("1.20", "1.20.0")]
    #[case("1.2.3", "1.2.3")]
    #[case("v1.2.3", "1.2.3")]
    #[case(" 1.2.3 ", "1.2.3")]
    #[case("1.20-pre1", "1.20.0-pre1")]
    #[case("1-rc.1+build.5", "1.0.0-rc.1+build.5")]
    #[case("1.2.3-beta.1", "1.2.3-beta.1")]
    fn parse_version_normalizes_partial_versions(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            parse_version(input).unwrap(),
            Version::parse(expected).unwrap()
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("v")]
    #[case("abc")]
    #[case("1.2.3.4")]
    #[case("1..2")]
    #[case("01.2.3")]
    fn parse_version_rejects_malformed_input(#[case] input: &str) {
        assert_eq!(
            parse_version(input),
            Err(ParseError::InvalidVersion {
                input: input.to_string()
            })
        );
    }

    #[rstest]
    #[case("1.0.0", "1.0.1", Ordering::Less)]
    #[case("1.10.0", "1.9.0", Ordering::Greater)]
    #[case("2.0.0", "10.0.0", Ordering::Less)]
    #[case("1.0.0-alpha", "1.0.0", Ordering::Less)]
    #[case("1.0.0-alpha", "1.0.0-beta", Ordering::Less)]
    #[case("1.2", "1.2.0", Ordering::Equal)]
    fn parsed_versions_order_numerically_with_prerelease_first(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        let a = parse_version(a).unwrap();
        let b = parse_version(b).unwrap();
        assert_eq!(a.cmp(&b), expected);
    }

    #[test]
    fn parse_version_lenient_returns_none_for_garbage() {
        assert_eq!(parse_version_lenient("not-a-version"), None);
        assert_eq!(parse_version_lenient("1.2"), Some(Version::new(1, 2, 0)));
    }
}

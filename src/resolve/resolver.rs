//! Compatibility resolution
//!
//! Pure filters: keep every candidate whose version satisfies a constraint.
//! Visibility (disabled releases) is not considered here.

use tracing::{debug, warn};

use crate::catalog::types::{PlatformVersion, Release, Requirement};
use crate::version::constraint::Constraint;
use crate::version::semver::parse_version;

/// Platform versions the release's platform constraint accepts
pub fn resolve_platform<'a>(
    release: &Release,
    candidates: &'a [PlatformVersion],
) -> Vec<&'a PlatformVersion> {
    let Some(constraint) = parse_or_warn(&release.platform_constraint, || {
        format!("release {}", release.id)
    }) else {
        return Vec::new();
    };

    filter_candidates(&constraint, candidates, |p| p.version.as_str())
}

/// Releases of the requirement's target artifact that satisfy its constraint
///
/// Candidates belonging to any other artifact are ignored.
pub fn resolve_requirement<'a>(
    requirement: &Requirement,
    candidates: &'a [Release],
) -> Vec<&'a Release> {
    let Some(constraint) = parse_or_warn(&requirement.constraint, || {
        format!("requirement {}", requirement.id)
    }) else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|r| r.artifact_id == requirement.target_artifact_id)
        .filter(|r| satisfies(&constraint, &r.version))
        .collect()
}

fn filter_candidates<'a, T>(
    constraint: &Constraint,
    candidates: &'a [T],
    version_of: impl Fn(&T) -> &str,
) -> Vec<&'a T> {
    candidates
        .iter()
        .filter(|c| satisfies(constraint, version_of(c)))
        .collect()
}

fn satisfies(constraint: &Constraint, version: &str) -> bool {
    match parse_version(version) {
        Ok(v) => constraint.matches(&v),
        Err(e) => {
            debug!("Skipping candidate: {}", e);
            false
        }
    }
}

/// Parse a stored constraint. Malformed input is logged and yields None,
/// which resolves to an empty set.
fn parse_or_warn(input: &str, owner: impl FnOnce() -> String) -> Option<Constraint> {
    match Constraint::parse(input) {
        Ok(constraint) => Some(constraint),
        Err(e) => {
            warn!("Malformed constraint on {}: {}", owner(), e);
            None
        }
    }
}

/// Highest version among releases; unparseable versions rank lowest,
/// ties go to the higher release id.
pub fn highest_release<'a>(releases: impl IntoIterator<Item = &'a Release>) -> Option<&'a Release> {
    releases
        .into_iter()
        .map(|r| (parse_version(&r.version).ok(), r))
        .max_by(|(a, ra), (b, rb)| a.cmp(b).then(ra.id.cmp(&rb.id)))
        .map(|(_, r)| r)
}

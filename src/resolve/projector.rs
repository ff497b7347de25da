//! Latest-match projection over resolved requirement matches

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::catalog::error::StoreError;
use crate::catalog::storer::{CompatStorer, ResolvedMatch};
use crate::catalog::types::{ArtifactId, Release, ReleaseId, RequirementId};
use crate::resolve::resolver::highest_release;

/// Collapse matches to the highest-version release per target artifact.
///
/// Output is ordered by target artifact id. A release appearing in several
/// rows is counted once.
pub fn latest_per_artifact(matches: impl IntoIterator<Item = ResolvedMatch>) -> Vec<Release> {
    let mut seen: HashSet<ReleaseId> = HashSet::new();
    let mut by_artifact: IndexMap<ArtifactId, Vec<Release>> = IndexMap::new();

    for resolved in matches {
        if seen.insert(resolved.release.id) {
            by_artifact
                .entry(resolved.target_artifact_id)
                .or_default()
                .push(resolved.release);
        }
    }
    by_artifact.sort_keys();

    by_artifact
        .values()
        .filter_map(|releases| highest_release(releases).cloned())
        .collect()
}

pub struct Projector<'s, S: CompatStorer> {
    store: &'s S,
}

impl<'s, S: CompatStorer> Projector<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// One release per artifact the given release depends on
    pub fn latest_for_release(&self, release_id: ReleaseId) -> Result<Vec<Release>, StoreError> {
        Ok(latest_per_artifact(
            self.store.resolved_matches_of_release(release_id)?,
        ))
    }

    /// The newest release satisfying one requirement
    pub fn latest_for_requirement(
        &self,
        requirement_id: RequirementId,
    ) -> Result<Option<Release>, StoreError> {
        let matches = self.store.resolved_matches(requirement_id)?;
        Ok(highest_release(&matches).cloned())
    }
}

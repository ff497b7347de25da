//! Persists resolver output as derived rows
//!
//! Every operation recomputes one owner's full set and hands it to the
//! store for an atomic replace. Nothing here touches source rows.

use tracing::{debug, info};

use crate::catalog::error::StoreError;
use crate::catalog::storer::CompatStorer;
use crate::catalog::types::{PlatformVersion, PlatformVersionId, ReleaseId, RequirementId};
use crate::resolve::resolver::{resolve_platform, resolve_requirement};

/// Counters for one materialization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    /// Releases whose platform compatibility was recomputed
    pub releases: usize,
    /// Requirements whose matches were recomputed
    pub requirements: usize,
    /// Owners whose stored row set actually changed
    pub changed: usize,
}

impl MaterializeStats {
    pub fn merge(&mut self, other: MaterializeStats) {
        self.releases += other.releases;
        self.requirements += other.requirements;
        self.changed += other.changed;
    }
}

/// Difference between stored derived rows and a fresh recomputation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Platform {
        release_id: ReleaseId,
        missing: Vec<i64>,
        stale: Vec<i64>,
    },
    Requirement {
        requirement_id: RequirementId,
        missing: Vec<i64>,
        stale: Vec<i64>,
    },
}

pub struct Materializer<'s, S: CompatStorer> {
    store: &'s S,
}

impl<'s, S: CompatStorer> Materializer<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Recompute platform compatibility for one release against all platform versions
    pub fn materialize_platform(&self, release_id: ReleaseId) -> Result<bool, StoreError> {
        let platform_versions = self.store.list_platform_versions()?;
        self.materialize_platform_with(release_id, &platform_versions)
    }

    /// Recompute platform compatibility using an already loaded candidate list
    pub fn materialize_platform_with(
        &self,
        release_id: ReleaseId,
        platform_versions: &[PlatformVersion],
    ) -> Result<bool, StoreError> {
        let ids = self.expected_platform(release_id, platform_versions)?;
        let changed = self.store.replace_platform_compat(release_id, &ids)?;

        debug!(
            "Materialized release {}: {} platform versions{}",
            release_id,
            ids.len(),
            if changed { "" } else { " (unchanged)" }
        );
        Ok(changed)
    }

    /// Recompute the resolved matches of one requirement
    pub fn materialize_requirement(&self, requirement_id: RequirementId) -> Result<bool, StoreError> {
        let ids = self.expected_matches(requirement_id)?;
        let changed = self
            .store
            .replace_requirement_matches(requirement_id, &ids)?;

        debug!(
            "Materialized requirement {}: {} matching releases{}",
            requirement_id,
            ids.len(),
            if changed { "" } else { " (unchanged)" }
        );
        Ok(changed)
    }

    /// Fan-out after a platform version changed: every release is rechecked
    pub fn materialize_platform_version(
        &self,
        platform_version_id: PlatformVersionId,
    ) -> Result<MaterializeStats, StoreError> {
        debug!(
            "Platform version {} changed, rechecking all releases",
            platform_version_id
        );
        let release_ids = self.store.list_release_ids()?;
        self.materialize_releases(&release_ids)
    }

    /// Recompute platform compatibility for a set of releases, loading candidates once
    pub fn materialize_releases(
        &self,
        release_ids: &[ReleaseId],
    ) -> Result<MaterializeStats, StoreError> {
        let platform_versions = self.store.list_platform_versions()?;
        let mut stats = MaterializeStats::default();
        for &release_id in release_ids {
            stats.releases += 1;
            if self.materialize_platform_with(release_id, &platform_versions)? {
                stats.changed += 1;
            }
        }
        Ok(stats)
    }

    /// Recompute every derived row
    pub fn materialize_all(&self) -> Result<MaterializeStats, StoreError> {
        let purged = self.store.purge_orphans()?;

        let mut stats = self.materialize_releases(&self.store.list_release_ids()?)?;
        for requirement_id in self.store.list_requirement_ids()? {
            stats.requirements += 1;
            if self.materialize_requirement(requirement_id)? {
                stats.changed += 1;
            }
        }

        info!(
            "Rebuilt derived rows for {} releases and {} requirements ({} changed, {} orphans purged)",
            stats.releases, stats.requirements, stats.changed, purged
        );
        Ok(stats)
    }

    /// Compare stored derived rows with a fresh recomputation without writing
    pub fn verify(&self) -> Result<Vec<Drift>, StoreError> {
        let platform_versions = self.store.list_platform_versions()?;
        let mut drift = Vec::new();

        for release_id in self.store.list_release_ids()? {
            let expected = ids_of(self.expected_platform(release_id, &platform_versions)?);
            let stored = self
                .store
                .resolved_platform_versions(release_id)?
                .into_iter()
                .map(|p| p.id.0)
                .collect();
            if let Some((missing, stale)) = diff(expected, stored) {
                drift.push(Drift::Platform {
                    release_id,
                    missing,
                    stale,
                });
            }
        }

        for requirement_id in self.store.list_requirement_ids()? {
            let expected = ids_of(self.expected_matches(requirement_id)?);
            let stored = self
                .store
                .resolved_matches(requirement_id)?
                .into_iter()
                .map(|r| r.id.0)
                .collect();
            if let Some((missing, stale)) = diff(expected, stored) {
                drift.push(Drift::Requirement {
                    requirement_id,
                    missing,
                    stale,
                });
            }
        }

        Ok(drift)
    }

    fn expected_platform(
        &self,
        release_id: ReleaseId,
        platform_versions: &[PlatformVersion],
    ) -> Result<Vec<PlatformVersionId>, StoreError> {
        // A missing release resolves to nothing, which clears its rows
        let Some(release) = self.store.get_release(release_id)? else {
            return Ok(Vec::new());
        };
        Ok(resolve_platform(&release, platform_versions)
            .into_iter()
            .map(|p| p.id)
            .collect())
    }

    fn expected_matches(&self, requirement_id: RequirementId) -> Result<Vec<ReleaseId>, StoreError> {
        let Some(requirement) = self.store.get_requirement(requirement_id)? else {
            return Ok(Vec::new());
        };
        let candidates = self
            .store
            .releases_of_artifact(requirement.target_artifact_id)?;
        Ok(resolve_requirement(&requirement, &candidates)
            .into_iter()
            .map(|r| r.id)
            .collect())
    }
}

fn ids_of<T: Into<i64>>(ids: Vec<T>) -> Vec<i64> {
    ids.into_iter().map(Into::into).collect()
}

/// Returns (missing, stale) when the sorted sets differ
fn diff(mut expected: Vec<i64>, mut stored: Vec<i64>) -> Option<(Vec<i64>, Vec<i64>)> {
    expected.sort_unstable();
    expected.dedup();
    stored.sort_unstable();
    stored.dedup();
    if expected == stored {
        return None;
    }
    let missing = expected
        .iter()
        .filter(|id| stored.binary_search(id).is_err())
        .copied()
        .collect();
    let stale = stored
        .iter()
        .filter(|id| expected.binary_search(id).is_err())
        .copied()
        .collect();
    Some((missing, stale))
}

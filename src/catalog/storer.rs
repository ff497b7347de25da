//! Storage abstraction consumed by the resolution engine

#[cfg(test)]
use mockall::automock;

use crate::catalog::error::StoreError;
use crate::catalog::types::{
    ArtifactId, PlatformVersion, PlatformVersionId, Release, ReleaseId, Requirement, RequirementId,
};

/// A resolved requirement match joined with its requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub requirement_id: RequirementId,
    pub target_artifact_id: ArtifactId,
    pub release: Release,
}

/// Trait for reading catalog state and maintaining the derived relations
///
/// Source rows (releases, requirements, platform versions) are only read
/// through this trait. The two derived relations are only ever replaced
/// wholesale per owner, inside one transaction.
#[cfg_attr(test, automock)]
pub trait CompatStorer: Send + Sync + 'static {
    fn get_release(&self, id: ReleaseId) -> Result<Option<Release>, StoreError>;

    fn get_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, StoreError>;

    /// All release ids, ascending
    fn list_release_ids(&self) -> Result<Vec<ReleaseId>, StoreError>;

    /// All requirement ids, ascending
    fn list_requirement_ids(&self) -> Result<Vec<RequirementId>, StoreError>;

    fn list_platform_versions(&self) -> Result<Vec<PlatformVersion>, StoreError>;

    fn releases_of_artifact(&self, artifact_id: ArtifactId) -> Result<Vec<Release>, StoreError>;

    /// Requirements whose target is the given artifact
    fn requirements_targeting(
        &self,
        artifact_id: ArtifactId,
    ) -> Result<Vec<RequirementId>, StoreError>;

    /// Requirements that currently hold a resolved match row for the release
    fn requirements_matching_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<RequirementId>, StoreError>;

    /// Artifacts that some release of `artifact_id` declares a requirement on
    fn dependency_targets(&self, artifact_id: ArtifactId) -> Result<Vec<ArtifactId>, StoreError>;

    /// Atomically replace the platform compatibility rows of one release.
    ///
    /// Returns false when the stored set already equals `platform_version_ids`.
    fn replace_platform_compat(
        &self,
        release_id: ReleaseId,
        platform_version_ids: &[PlatformVersionId],
    ) -> Result<bool, StoreError>;

    /// Atomically replace the resolved match rows of one requirement.
    ///
    /// Returns false when the stored set already equals `release_ids`.
    fn replace_requirement_matches(
        &self,
        requirement_id: RequirementId,
        release_ids: &[ReleaseId],
    ) -> Result<bool, StoreError>;

    /// Remove derived rows pointing at entities that no longer exist
    fn purge_orphans(&self) -> Result<usize, StoreError>;

    fn resolved_platform_versions(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<PlatformVersion>, StoreError>;

    fn resolved_matches(&self, requirement_id: RequirementId) -> Result<Vec<Release>, StoreError>;

    /// Resolved matches for every requirement of the release
    fn resolved_matches_of_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<ResolvedMatch>, StoreError>;

    /// Releases holding at least one resolved match into the artifact
    fn dependants_of(&self, artifact_id: ArtifactId) -> Result<Vec<Release>, StoreError>;

    /// Releases whose platform constraint is blank
    fn unconstrained_releases(&self) -> Result<Vec<Release>, StoreError>;
}

//! In-process facade used by publishing and listing collaborators
//!
//! Write hooks (`on_*`) are called after the collaborator has committed a
//! source-row write. Called on [`Engine`] directly they resolve at once.
//! Called on a [`UnitOfWork`] they follow the configured propagation mode
//! and are flushed by [`UnitOfWork::commit`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::error::StoreError;
use crate::catalog::snapshot::CatalogSnapshot;
use crate::catalog::store::Store;
use crate::catalog::storer::CompatStorer;
use crate::catalog::types::{
    ArtifactId, NewRelease, PlatformVersion, PlatformVersionId, Release, ReleaseId,
    Requirement, RequirementId,
};
use crate::config::{CyclePolicy, EngineConfig, PropagationMode};
use crate::resolve::cycle::CycleDetector;
use crate::resolve::error::{CycleDetected, EngineError};
use crate::resolve::materializer::{Drift, MaterializeStats, Materializer};
use crate::resolve::projector::Projector;
use crate::resolve::propagator::{ChangeEvent, FlushReport, Propagator, PropagatorState};

pub struct Engine<S: CompatStorer> {
    store: Arc<S>,
    config: EngineConfig,
}

/// Counts of source rows written by a snapshot import.
/// `requirements` counts rows created or changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub artifacts: usize,
    pub releases: usize,
    pub requirements: usize,
    pub platform_versions: usize,
    pub flush: FlushReport,
}

impl<S: CompatStorer> Engine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a unit of work using the configured propagation mode
    pub fn begin(&self) -> UnitOfWork<S> {
        self.begin_with(self.config.propagation.mode)
    }

    pub fn begin_with(&self, mode: PropagationMode) -> UnitOfWork<S> {
        UnitOfWork {
            propagator: Propagator::new(Arc::clone(&self.store), mode),
        }
    }

    /// Resolve the effects of one committed write right away
    pub fn emit(&self, event: ChangeEvent) -> Result<FlushReport, EngineError> {
        let mut propagator = Propagator::new(Arc::clone(&self.store), PropagationMode::Immediate);
        Ok(propagator.handle(event)?.unwrap_or_default())
    }

    // =========================================================================
    // Write hooks
    // =========================================================================

    /// A release was created (no previous values) or updated
    pub fn on_release_written(
        &self,
        release_id: ReleaseId,
        previous_constraint: Option<&str>,
        previous_version: Option<&str>,
    ) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::ReleaseWritten {
            release_id,
            previous_constraint: previous_constraint.map(str::to_string),
            previous_version: previous_version.map(str::to_string),
        })
    }

    /// A release was deleted. Its match rows are recomputed; use
    /// [`Engine::delete_release`] to also recheck every requirement on its artifact.
    pub fn on_release_deleted(&self, release_id: ReleaseId) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::release_deleted(release_id, None))
    }

    pub fn on_requirement_written(
        &self,
        requirement_id: RequirementId,
    ) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::RequirementWritten { requirement_id })
    }

    pub fn on_requirement_deleted(
        &self,
        requirement_id: RequirementId,
    ) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::RequirementDeleted { requirement_id })
    }

    pub fn on_platform_version_written(
        &self,
        platform_version_id: PlatformVersionId,
    ) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::PlatformVersionWritten {
            platform_version_id,
        })
    }

    pub fn on_platform_version_deleted(
        &self,
        platform_version_id: PlatformVersionId,
    ) -> Result<FlushReport, EngineError> {
        self.emit(ChangeEvent::PlatformVersionDeleted {
            platform_version_id,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn resolved_platform_versions_for(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<PlatformVersion>, EngineError> {
        Ok(self.store.resolved_platform_versions(release_id)?)
    }

    pub fn resolved_matches_for(
        &self,
        requirement_id: RequirementId,
    ) -> Result<Vec<Release>, EngineError> {
        Ok(self.store.resolved_matches(requirement_id)?)
    }

    /// Newest matching release per artifact the release depends on
    pub fn latest_resolved_matches_for(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<Release>, EngineError> {
        Ok(Projector::new(self.store.as_ref()).latest_for_release(release_id)?)
    }

    pub fn latest_resolved_match_for_requirement(
        &self,
        requirement_id: RequirementId,
    ) -> Result<Option<Release>, EngineError> {
        Ok(Projector::new(self.store.as_ref()).latest_for_requirement(requirement_id)?)
    }

    /// Would a requirement from `source_release_id` on `target_artifact_id` close a cycle?
    pub fn would_create_cycle(
        &self,
        source_release_id: ReleaseId,
        target_artifact_id: ArtifactId,
    ) -> Result<bool, EngineError> {
        Ok(self
            .find_cycle(source_release_id, target_artifact_id)?
            .is_some())
    }

    pub fn find_cycle(
        &self,
        source_release_id: ReleaseId,
        target_artifact_id: ArtifactId,
    ) -> Result<Option<CycleDetected>, EngineError> {
        let release = self
            .store
            .get_release(source_release_id)?
            .ok_or(EngineError::ReleaseNotFound(source_release_id))?;
        Ok(CycleDetector::new(self.store.as_ref())
            .find_cycle(release.artifact_id, target_artifact_id)?)
    }

    pub fn dependants_of(&self, artifact_id: ArtifactId) -> Result<Vec<Release>, EngineError> {
        Ok(self.store.dependants_of(artifact_id)?)
    }

    pub fn unconstrained_releases(&self) -> Result<Vec<Release>, EngineError> {
        Ok(self.store.unconstrained_releases()?)
    }

    // =========================================================================
    // Batch operations
    // =========================================================================

    /// Recompute every derived row
    pub fn materialize_all(&self) -> Result<MaterializeStats, EngineError> {
        Ok(Materializer::new(self.store.as_ref()).materialize_all()?)
    }

    /// Report derived sets that differ from a fresh recomputation
    pub fn verify(&self) -> Result<Vec<Drift>, EngineError> {
        Ok(Materializer::new(self.store.as_ref()).verify()?)
    }

    fn check_cycle(
        &self,
        source: ArtifactId,
        target: ArtifactId,
    ) -> Result<(), EngineError> {
        let Some(cycle) = CycleDetector::new(self.store.as_ref()).find_cycle(source, target)? else {
            return Ok(());
        };

        match self.config.cycles.mode {
            CyclePolicy::Enforce => {
                warn!("Rejected requirement: {}", cycle);
                Err(cycle.into())
            }
            CyclePolicy::Advisory => {
                warn!("Accepting requirement despite cycle: {}", cycle);
                Ok(())
            }
        }
    }
}

impl Engine<Store> {
    /// Open the configured database and build an engine over it
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let db_path = config.db_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::from)?;
        }
        let store = Store::new(&db_path)?;
        Ok(Self::new(Arc::new(store), config))
    }

    /// Persist a new requirement after checking it does not close a cycle
    pub fn add_requirement(
        &self,
        release_id: ReleaseId,
        target_artifact_id: ArtifactId,
        constraint: &str,
    ) -> Result<RequirementId, EngineError> {
        let release = self
            .store
            .get_release(release_id)?
            .ok_or(EngineError::ReleaseNotFound(release_id))?;
        self.check_cycle(release.artifact_id, target_artifact_id)?;

        let requirement_id =
            self.store
                .create_requirement(release_id, target_artifact_id, constraint)?;
        self.on_requirement_written(requirement_id)?;
        Ok(requirement_id)
    }

    /// Change a requirement's target or constraint after the same cycle check
    pub fn update_requirement(
        &self,
        requirement_id: RequirementId,
        target_artifact_id: ArtifactId,
        constraint: &str,
    ) -> Result<(), EngineError> {
        let requirement = self
            .store
            .get_requirement(requirement_id)?
            .ok_or(EngineError::RequirementNotFound(requirement_id))?;
        let release = self
            .store
            .get_release(requirement.release_id)?
            .ok_or(EngineError::ReleaseNotFound(requirement.release_id))?;

        if requirement.target_artifact_id != target_artifact_id {
            self.check_cycle(release.artifact_id, target_artifact_id)?;
        }

        self.store
            .update_requirement(requirement_id, target_artifact_id, constraint)?;
        self.on_requirement_written(requirement_id)?;
        Ok(())
    }

    /// Delete a release and resolve everything that depended on it
    pub fn delete_release(&self, release_id: ReleaseId) -> Result<FlushReport, EngineError> {
        let release = self
            .store
            .get_release(release_id)?
            .ok_or(EngineError::ReleaseNotFound(release_id))?;
        self.store.delete_release(release_id)?;
        self.emit(ChangeEvent::release_deleted(
            release_id,
            Some(release.artifact_id),
        ))
    }

    /// Load a snapshot's source rows and resolve them in one unit of work.
    ///
    /// Existing artifacts, releases and platform versions are reused by
    /// slug/version, and a release's requirement on a target it already
    /// declares is updated in place. Requirements pass the cycle check like
    /// any other write. When the import stops early, whatever was already
    /// written is still resolved before the error is returned.
    pub fn import_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<ImportReport, EngineError> {
        info!(
            "Importing snapshot: {} artifacts, {} releases, {} platform versions",
            snapshot.artifacts.len(),
            snapshot.release_count(),
            snapshot.platform_versions.len()
        );

        let mut unit = self.begin();
        let mut report = ImportReport::default();

        let written = self.write_snapshot(&mut unit, snapshot, &mut report);
        let flushed = unit.commit();
        if let Err(e) = written {
            warn!("Snapshot import stopped early: {}", e);
            return Err(e);
        }
        report.flush = flushed?;

        info!(
            "Imported {} artifacts, {} releases, {} requirements, {} platform versions ({} derived sets changed)",
            report.artifacts,
            report.releases,
            report.requirements,
            report.platform_versions,
            report.flush.stats.changed
        );
        Ok(report)
    }

    fn write_snapshot(
        &self,
        unit: &mut UnitOfWork<Store>,
        snapshot: &CatalogSnapshot,
        report: &mut ImportReport,
    ) -> Result<(), EngineError> {
        for version in &snapshot.platform_versions {
            if self.store.find_platform_version(version)?.is_some() {
                continue;
            }
            let id = self.store.create_platform_version(version)?;
            unit.on_platform_version_written(id)?;
            report.platform_versions += 1;
        }

        // Artifacts first so requirements can refer to any slug in the snapshot
        for artifact in &snapshot.artifacts {
            if self.store.find_artifact(&artifact.slug)?.is_none() {
                self.store.create_artifact(&artifact.slug)?;
                report.artifacts += 1;
            }
        }

        for artifact in &snapshot.artifacts {
            let artifact_id = self
                .store
                .find_artifact(&artifact.slug)?
                .ok_or_else(|| EngineError::UnknownArtifact(artifact.slug.clone()))?;
            let existing = self.store.releases_of_artifact(artifact_id)?;

            for release in &artifact.releases {
                let release_id = match existing.iter().find(|r| r.version == release.version) {
                    Some(current) => {
                        self.store.update_release(
                            current.id,
                            &release.version,
                            &release.platform_constraint,
                        )?;
                        unit.on_release_written(
                            current.id,
                            Some(current.platform_constraint.as_str()),
                            Some(current.version.as_str()),
                        )?;
                        current.id
                    }
                    None => {
                        let id = self.store.create_release(&NewRelease::new(
                            artifact_id,
                            release.version.as_str(),
                            release.platform_constraint.as_str(),
                        ))?;
                        unit.on_release_written(id, None, None)?;
                        report.releases += 1;
                        id
                    }
                };
                self.store.set_release_disabled(release_id, release.disabled)?;

                let mut declared = self.store.requirements_of_release(release_id)?;
                for requirement in &release.requirements {
                    let target = self
                        .store
                        .find_artifact(&requirement.artifact)?
                        .ok_or_else(|| EngineError::UnknownArtifact(requirement.artifact.clone()))?;

                    // Each declared row is claimed by at most one snapshot entry
                    let same_target = |d: &Requirement| d.target_artifact_id == target;
                    let claimed = declared
                        .iter()
                        .position(|d| same_target(d) && d.constraint == requirement.constraint)
                        .or_else(|| declared.iter().position(same_target))
                        .map(|i| declared.swap_remove(i));

                    match claimed {
                        Some(current) if current.constraint == requirement.constraint => {}
                        Some(current) => {
                            self.store
                                .update_requirement(current.id, target, &requirement.constraint)?;
                            unit.on_requirement_written(current.id)?;
                            report.requirements += 1;
                        }
                        None => {
                            self.check_cycle(artifact_id, target)?;
                            let id = self.store.create_requirement(
                                release_id,
                                target,
                                &requirement.constraint,
                            )?;
                            unit.on_requirement_written(id)?;
                            report.requirements += 1;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Scoped collection of write events, resolved on [`UnitOfWork::commit`]
pub struct UnitOfWork<S: CompatStorer> {
    propagator: Propagator<S>,
}

impl<S: CompatStorer> UnitOfWork<S> {
    pub fn state(&self) -> PropagatorState {
        self.propagator.state()
    }

    /// Record one committed write; resolved on commit unless the mode is immediate
    pub fn emit(&mut self, event: ChangeEvent) -> Result<(), EngineError> {
        self.propagator.handle(event)?;
        Ok(())
    }

    pub fn on_release_written(
        &mut self,
        release_id: ReleaseId,
        previous_constraint: Option<&str>,
        previous_version: Option<&str>,
    ) -> Result<(), EngineError> {
        self.emit(ChangeEvent::ReleaseWritten {
            release_id,
            previous_constraint: previous_constraint.map(str::to_string),
            previous_version: previous_version.map(str::to_string),
        })
    }

    pub fn on_release_deleted(&mut self, release_id: ReleaseId) -> Result<(), EngineError> {
        self.emit(ChangeEvent::release_deleted(release_id, None))
    }

    pub fn on_requirement_written(
        &mut self,
        requirement_id: RequirementId,
    ) -> Result<(), EngineError> {
        self.emit(ChangeEvent::RequirementWritten { requirement_id })
    }

    pub fn on_requirement_deleted(
        &mut self,
        requirement_id: RequirementId,
    ) -> Result<(), EngineError> {
        self.emit(ChangeEvent::RequirementDeleted { requirement_id })
    }

    pub fn on_platform_version_written(
        &mut self,
        platform_version_id: PlatformVersionId,
    ) -> Result<(), EngineError> {
        self.emit(ChangeEvent::PlatformVersionWritten {
            platform_version_id,
        })
    }

    pub fn on_platform_version_deleted(
        &mut self,
        platform_version_id: PlatformVersionId,
    ) -> Result<(), EngineError> {
        self.emit(ChangeEvent::PlatformVersionDeleted {
            platform_version_id,
        })
    }

    /// Resolve everything recorded so far
    pub fn commit(mut self) -> Result<FlushReport, EngineError> {
        Ok(self.propagator.flush()?)
    }
}

impl<S: CompatStorer> Drop for UnitOfWork<S> {
    fn drop(&mut self) {
        if self.propagator.has_pending() {
            warn!("Unit of work dropped with unresolved changes; derived rows may be stale");
        }
    }
}

//! Change propagation
//!
//! Collaborators emit a [`ChangeEvent`] after committing a write. The
//! propagator turns events into recomputation targets and runs the
//! materializer over them.
//!
//! ```text
//!   idle ──event──▶ pending ──flush──▶ resolving ──▶ idle
//!                    ▲   │
//!                    └───┘ more events
//! ```
//!
//! In [`PropagationMode::Immediate`] every event flushes at once. In
//! [`PropagationMode::Deferred`] targets accumulate until [`Propagator::flush`]
//! and each target is materialized once no matter how many events named it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::error::StoreError;
use crate::catalog::storer::CompatStorer;
use crate::catalog::types::{ArtifactId, PlatformVersionId, ReleaseId, RequirementId};
use crate::config::PropagationMode;
use crate::resolve::materializer::{MaterializeStats, Materializer};

/// A committed write to one of the triggering entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Release created (no previous values) or updated
    ReleaseWritten {
        release_id: ReleaseId,
        previous_constraint: Option<String>,
        previous_version: Option<String>,
    },
    /// Release removed. `artifact_id` is the owner it had, when the emitter still knew it.
    ReleaseDeleted {
        release_id: ReleaseId,
        artifact_id: Option<ArtifactId>,
    },
    RequirementWritten {
        requirement_id: RequirementId,
    },
    RequirementDeleted {
        requirement_id: RequirementId,
    },
    PlatformVersionWritten {
        platform_version_id: PlatformVersionId,
    },
    PlatformVersionDeleted {
        platform_version_id: PlatformVersionId,
    },
}

impl ChangeEvent {
    pub fn release_created(release_id: ReleaseId) -> Self {
        ChangeEvent::ReleaseWritten {
            release_id,
            previous_constraint: None,
            previous_version: None,
        }
    }

    pub fn release_deleted(release_id: ReleaseId, artifact_id: Option<ArtifactId>) -> Self {
        ChangeEvent::ReleaseDeleted {
            release_id,
            artifact_id,
        }
    }

    pub fn release_updated(
        release_id: ReleaseId,
        previous_constraint: &str,
        previous_version: &str,
    ) -> Self {
        ChangeEvent::ReleaseWritten {
            release_id,
            previous_constraint: Some(previous_constraint.to_string()),
            previous_version: Some(previous_version.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorState {
    Idle,
    Pending,
    Resolving,
}

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub stats: MaterializeStats,
    /// Orphaned derived rows removed after deletions
    pub purged: usize,
}

#[derive(Debug, Default)]
struct PendingWork {
    releases: BTreeSet<ReleaseId>,
    requirements: BTreeSet<RequirementId>,
    /// A platform version changed, so every release needs rechecking
    all_releases: bool,
    /// A deletion happened, so orphaned rows may exist
    purge: bool,
}

impl PendingWork {
    fn is_empty(&self) -> bool {
        self.releases.is_empty() && self.requirements.is_empty() && !self.all_releases && !self.purge
    }
}

/// Per-unit-of-work resolution scheduler
pub struct Propagator<S: CompatStorer> {
    store: Arc<S>,
    mode: PropagationMode,
    state: PropagatorState,
    pending: PendingWork,
}

impl<S: CompatStorer> Propagator<S> {
    pub fn new(store: Arc<S>, mode: PropagationMode) -> Self {
        Self {
            store,
            mode,
            state: PropagatorState::Idle,
            pending: PendingWork::default(),
        }
    }

    pub fn state(&self) -> PropagatorState {
        self.state
    }

    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record an event. Returns the flush report when the event was resolved immediately.
    pub fn handle(&mut self, event: ChangeEvent) -> Result<Option<FlushReport>, StoreError> {
        self.record(event)?;
        match self.mode {
            PropagationMode::Immediate => self.flush().map(Some),
            PropagationMode::Deferred => Ok(None),
        }
    }

    fn record(&mut self, event: ChangeEvent) -> Result<(), StoreError> {
        debug!("Recording {:?}", event);

        match event {
            ChangeEvent::ReleaseWritten {
                release_id,
                previous_constraint,
                previous_version,
            } => {
                let Some(release) = self.store.get_release(release_id)? else {
                    // Gone before we saw it; treat as a deletion
                    return self.record(ChangeEvent::release_deleted(release_id, None));
                };

                let constraint_changed = previous_constraint
                    .is_none_or(|previous| previous != release.platform_constraint);
                let version_changed =
                    previous_version.is_none_or(|previous| previous != release.version);

                if constraint_changed {
                    self.pending.releases.insert(release_id);
                }
                if version_changed {
                    self.pending
                        .requirements
                        .extend(self.store.requirements_targeting(release.artifact_id)?);
                }
                if !constraint_changed && !version_changed {
                    debug!("Release {} unchanged, nothing to resolve", release_id);
                }
            }
            ChangeEvent::ReleaseDeleted {
                release_id,
                artifact_id,
            } => {
                self.pending.releases.insert(release_id);
                // Match rows still name the release until the purge runs
                self.pending
                    .requirements
                    .extend(self.store.requirements_matching_release(release_id)?);
                if let Some(artifact_id) = artifact_id {
                    self.pending
                        .requirements
                        .extend(self.store.requirements_targeting(artifact_id)?);
                }
                self.pending.purge = true;
            }
            ChangeEvent::RequirementWritten { requirement_id }
            | ChangeEvent::RequirementDeleted { requirement_id } => {
                self.pending.requirements.insert(requirement_id);
            }
            ChangeEvent::PlatformVersionWritten { .. } => {
                self.pending.all_releases = true;
            }
            ChangeEvent::PlatformVersionDeleted { .. } => {
                self.pending.all_releases = true;
                self.pending.purge = true;
            }
        }

        if self.has_pending() {
            self.state = PropagatorState::Pending;
        }
        Ok(())
    }

    /// Materialize every recorded target once and return to idle.
    ///
    /// On failure the recorded work is kept so the flush can be retried.
    pub fn flush(&mut self) -> Result<FlushReport, StoreError> {
        if self.pending.is_empty() {
            self.state = PropagatorState::Idle;
            return Ok(FlushReport::default());
        }

        self.state = PropagatorState::Resolving;
        let pending = std::mem::take(&mut self.pending);

        match self.resolve(&pending) {
            Ok(report) => {
                self.state = PropagatorState::Idle;
                debug!(
                    "Flushed {} releases and {} requirements ({} changed, {} purged)",
                    report.stats.releases,
                    report.stats.requirements,
                    report.stats.changed,
                    report.purged
                );
                Ok(report)
            }
            Err(e) => {
                self.pending = pending;
                self.state = PropagatorState::Pending;
                Err(e)
            }
        }
    }

    fn resolve(&self, pending: &PendingWork) -> Result<FlushReport, StoreError> {
        let materializer = Materializer::new(self.store.as_ref());
        let mut report = FlushReport::default();

        if pending.purge {
            report.purged = self.store.purge_orphans()?;
        }

        let mut releases = pending.releases.clone();
        if pending.all_releases {
            releases.extend(self.store.list_release_ids()?);
        }
        if !releases.is_empty() {
            let releases: Vec<ReleaseId> = releases.into_iter().collect();
            report.stats.merge(materializer.materialize_releases(&releases)?);
        }

        for &requirement_id in &pending.requirements {
            report.stats.requirements += 1;
            if materializer.materialize_requirement(requirement_id)? {
                report.stats.changed += 1;
            }
        }

        Ok(report)
    }
}

use std::fmt;

use thiserror::Error;

use crate::catalog::error::StoreError;
use crate::catalog::types::{ArtifactId, ReleaseId, RequirementId};

/// A requirement would close a dependency loop.
///
/// `path` starts and ends at the artifact owning the candidate requirement,
/// e.g. `[a, b, c, a]` for a → b → c → a.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    pub path: Vec<ArtifactId>,
}

impl fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dependency cycle detected: ")?;
        for (i, id) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleDetected {}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cycle(#[from] CycleDetected),

    #[error("Release not found: {0}")]
    ReleaseNotFound(ReleaseId),

    #[error("Requirement not found: {0}")]
    RequirementNotFound(RequirementId),

    #[error("Unknown artifact slug in snapshot: {0}")]
    UnknownArtifact(String),
}

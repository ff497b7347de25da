//! Catalog entity types

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identity of a publishable mod
    ArtifactId
);
entity_id!(
    /// Identity of one release of an artifact
    ReleaseId
);
entity_id!(PlatformVersionId);
entity_id!(RequirementId);

/// A publishable unit owning zero or more releases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// Human-facing identifier (e.g., "sodium", "fabric-api")
    pub slug: String,
}

/// One published version of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub artifact_id: ArtifactId,
    /// Semantic version, unique per artifact
    pub version: String,
    /// Range constraint against platform versions; blank means legacy/unversioned
    pub platform_constraint: String,
    /// Hidden from listings. Resolution ignores this flag.
    pub disabled: bool,
}

/// A version of the target runtime that releases declare compatibility with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformVersion {
    pub id: PlatformVersionId,
    pub version: String,
}

/// A release's dependency on another artifact within a version range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    /// The dependant release
    pub release_id: ReleaseId,
    pub target_artifact_id: ArtifactId,
    pub constraint: String,
}

/// Fields for a release that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub artifact_id: ArtifactId,
    pub version: String,
    pub platform_constraint: String,
}

impl NewRelease {
    pub fn new(
        artifact_id: ArtifactId,
        version: impl Into<String>,
        platform_constraint: impl Into<String>,
    ) -> Self {
        Self {
            artifact_id,
            version: version.into(),
            platform_constraint: platform_constraint.into(),
        }
    }
}

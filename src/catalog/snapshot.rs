//! JSON catalog snapshots
//!
//! A snapshot describes source rows only. Derived rows are always
//! recomputed after an import.
//!
//! ```json
//! {
//!   "platformVersions": ["1.20.0", "1.20.1"],
//!   "artifacts": [
//!     {
//!       "slug": "sodium",
//!       "releases": [
//!         {
//!           "version": "0.5.0",
//!           "platformConstraint": "~1.20",
//!           "requirements": [{ "artifact": "fabric-api", "constraint": "^1.0" }]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::error::StoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub platform_versions: Vec<String>,
    pub artifacts: Vec<ArtifactSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtifactSnapshot {
    pub slug: String,
    pub releases: Vec<ReleaseSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReleaseSnapshot {
    pub version: String,
    pub platform_constraint: String,
    pub disabled: bool,
    pub requirements: Vec<RequirementSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequirementSnapshot {
    /// Slug of the target artifact
    pub artifact: String,
    pub constraint: String,
}

impl CatalogSnapshot {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn release_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.releases.len()).sum()
    }
}

//! Catalog fixtures for engine integration tests

#![allow(dead_code)]

use rusqlite::Connection;
use tempfile::TempDir;

use modcompat::catalog::store::Store;
use modcompat::catalog::types::{
    ArtifactId, NewRelease, PlatformVersionId, ReleaseId, RequirementId,
};
use modcompat::config::EngineConfig;
use modcompat::engine::Engine;

/// Derived rows as stored, ordered by primary key
#[derive(Debug, PartialEq, Eq)]
pub struct DerivedRows {
    pub platform_compat: Vec<(i64, i64)>,
    pub requirement_matches: Vec<(i64, i64)>,
}

/// An engine over a throwaway database with write helpers that fire the hooks
pub struct TestCatalog {
    _temp_dir: TempDir,
    pub engine: Engine<Store>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(mut config: EngineConfig) -> Self {
        let temp_dir = TempDir::new().unwrap();
        config.store.path = Some(temp_dir.path().join("catalog.db"));
        let engine = Engine::open(config).unwrap();
        Self {
            _temp_dir: temp_dir,
            engine,
        }
    }

    pub fn store(&self) -> &Store {
        self.engine.store()
    }

    pub fn platform(&self, version: &str) -> PlatformVersionId {
        let id = self.store().create_platform_version(version).unwrap();
        self.engine.on_platform_version_written(id).unwrap();
        id
    }

    pub fn artifact(&self, slug: &str) -> ArtifactId {
        self.store().create_artifact(slug).unwrap()
    }

    pub fn release(&self, artifact: ArtifactId, version: &str, constraint: &str) -> ReleaseId {
        let id = self
            .store()
            .create_release(&NewRelease::new(artifact, version, constraint))
            .unwrap();
        self.engine.on_release_written(id, None, None).unwrap();
        id
    }

    pub fn releases(&self, artifact: ArtifactId, versions: &[&str]) -> Vec<ReleaseId> {
        versions
            .iter()
            .map(|v| self.release(artifact, v, ""))
            .collect()
    }

    pub fn require(
        &self,
        release: ReleaseId,
        target: ArtifactId,
        constraint: &str,
    ) -> RequirementId {
        self.engine
            .add_requirement(release, target, constraint)
            .unwrap()
    }

    pub fn platform_versions_of(&self, release: ReleaseId) -> Vec<String> {
        self.engine
            .resolved_platform_versions_for(release)
            .unwrap()
            .into_iter()
            .map(|p| p.version)
            .collect()
    }

    pub fn matches_of(&self, requirement: RequirementId) -> Vec<String> {
        self.engine
            .resolved_matches_for(requirement)
            .unwrap()
            .into_iter()
            .map(|r| r.version)
            .collect()
    }

    /// Read both derived tables straight from the database file
    pub fn derived_rows(&self) -> DerivedRows {
        let path = self.engine.config().db_path();
        let conn = Connection::open(path).unwrap();
        DerivedRows {
            platform_compat: pairs(
                &conn,
                "SELECT release_id, platform_version_id FROM release_platform_compat ORDER BY 1, 2",
            ),
            requirement_matches: pairs(
                &conn,
                "SELECT requirement_id, release_id FROM requirement_matches ORDER BY 1, 2",
            ),
        }
    }
}

fn pairs(conn: &Connection, sql: &str) -> Vec<(i64, i64)> {
    let mut stmt = conn.prepare(sql).unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

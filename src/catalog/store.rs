use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::catalog::error::StoreError;
use crate::catalog::storer::{CompatStorer, ResolvedMatch};
use crate::catalog::types::{
    Artifact, ArtifactId, NewRelease, PlatformVersion, PlatformVersionId, Release, ReleaseId,
    Requirement, RequirementId,
};

/// Layout version recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

const RELEASE_COLUMNS: &str = "r.id, r.artifact_id, r.version, r.platform_constraint, r.disabled";

/// Characters treated as blank when checking for an unconstrained release
const BLANK_CHARS: &str = "' ' || char(9) || char(10) || char(13)";

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing catalog database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        debug!("Database connection established");

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Catalog store initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artifact_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                platform_constraint TEXT NOT NULL DEFAULT '',
                disabled INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (artifact_id) REFERENCES artifacts(id) ON DELETE CASCADE,
                UNIQUE(artifact_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_releases_artifact ON releases(artifact_id);

            CREATE TABLE IF NOT EXISTS platform_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                release_id INTEGER NOT NULL,
                target_artifact_id INTEGER NOT NULL,
                version_constraint TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (release_id) REFERENCES releases(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_requirements_release ON requirements(release_id);
            CREATE INDEX IF NOT EXISTS idx_requirements_target ON requirements(target_artifact_id);

            CREATE TABLE IF NOT EXISTS release_platform_compat (
                release_id INTEGER NOT NULL,
                platform_version_id INTEGER NOT NULL,
                PRIMARY KEY (release_id, platform_version_id)
            ) WITHOUT ROWID;

            CREATE INDEX IF NOT EXISTS idx_compat_platform_version
                ON release_platform_compat(platform_version_id);

            CREATE TABLE IF NOT EXISTS requirement_matches (
                requirement_id INTEGER NOT NULL,
                release_id INTEGER NOT NULL,
                PRIMARY KEY (requirement_id, release_id)
            ) WITHOUT ROWID;

            CREATE INDEX IF NOT EXISTS idx_matches_release ON requirement_matches(release_id);
            "#,
        )?;

        Self::check_schema_version(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Stamp a fresh database and refuse one written by a newer layout
    fn check_schema_version(conn: &Connection) -> Result<(), StoreError> {
        let found: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if found > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        if found < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            debug!("Updated schema version to v{}", SCHEMA_VERSION);
        }

        Ok(())
    }

    fn release_from_row(row: &Row<'_>) -> rusqlite::Result<Release> {
        Ok(Release {
            id: ReleaseId(row.get(0)?),
            artifact_id: ArtifactId(row.get(1)?),
            version: row.get(2)?,
            platform_constraint: row.get(3)?,
            disabled: row.get(4)?,
        })
    }

    fn query_releases(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Release>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let releases = stmt
            .query_map(params, Self::release_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(releases)
    }

    /// Replace every row owned by `owner` in a derived table.
    ///
    /// Runs as one IMMEDIATE transaction so readers see either the old or
    /// the new set. Rows are written in ascending order so repeated runs
    /// produce identical tables.
    fn replace_rows(
        &self,
        table: &'static str,
        owner_column: &'static str,
        member_column: &'static str,
        owner: i64,
        members: &[i64],
    ) -> Result<bool, StoreError> {
        let mut wanted = members.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = Self::member_ids(&tx, table, owner_column, member_column, owner)?;
        if existing == wanted {
            return Ok(false);
        }

        tx.execute(
            &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
            [owner],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} ({owner_column}, {member_column}) VALUES (?1, ?2)"
            ))?;
            for member in &wanted {
                stmt.execute((owner, member))?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn member_ids(
        tx: &Transaction<'_>,
        table: &'static str,
        owner_column: &'static str,
        member_column: &'static str,
        owner: i64,
    ) -> Result<Vec<i64>, StoreError> {
        let mut stmt = tx.prepare(&format!(
            "SELECT {member_column} FROM {table} WHERE {owner_column} = ?1 ORDER BY {member_column}"
        ))?;
        let ids = stmt
            .query_map([owner], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    // =========================================================================
    // Source rows (written by publishing workflows and ingestion jobs)
    // =========================================================================

    pub fn create_artifact(&self, slug: &str) -> Result<ArtifactId, StoreError> {
        let conn = self.lock_conn()?;
        conn.execute("INSERT INTO artifacts (slug) VALUES (?1)", [slug])?;
        Ok(ArtifactId(conn.last_insert_rowid()))
    }

    pub fn get_artifact(&self, id: ArtifactId) -> Result<Option<Artifact>, StoreError> {
        let conn = self.lock_conn()?;
        let artifact = conn
            .query_row(
                "SELECT id, slug FROM artifacts WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(Artifact {
                        id: ArtifactId(row.get(0)?),
                        slug: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(artifact)
    }

    pub fn find_artifact(&self, slug: &str) -> Result<Option<ArtifactId>, StoreError> {
        let conn = self.lock_conn()?;
        let id = conn
            .query_row("SELECT id FROM artifacts WHERE slug = ?1", [slug], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id.map(ArtifactId))
    }

    pub fn create_release(&self, release: &NewRelease) -> Result<ReleaseId, StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO releases (artifact_id, version, platform_constraint) VALUES (?1, ?2, ?3)",
            (
                release.artifact_id.0,
                &release.version,
                &release.platform_constraint,
            ),
        )?;
        Ok(ReleaseId(conn.last_insert_rowid()))
    }

    /// Update version and platform constraint. Returns false if the release does not exist.
    pub fn update_release(
        &self,
        id: ReleaseId,
        version: &str,
        platform_constraint: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE releases SET version = ?1, platform_constraint = ?2 WHERE id = ?3",
            (version, platform_constraint, id.0),
        )?;
        Ok(rows > 0)
    }

    pub fn set_release_disabled(&self, id: ReleaseId, disabled: bool) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE releases SET disabled = ?1 WHERE id = ?2",
            (disabled, id.0),
        )?;
        Ok(rows > 0)
    }

    /// Delete a release. Its own requirements are removed with it.
    pub fn delete_release(&self, id: ReleaseId) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM releases WHERE id = ?1", [id.0])?;
        Ok(rows > 0)
    }

    pub fn create_platform_version(&self, version: &str) -> Result<PlatformVersionId, StoreError> {
        let conn = self.lock_conn()?;
        conn.execute("INSERT INTO platform_versions (version) VALUES (?1)", [version])?;
        Ok(PlatformVersionId(conn.last_insert_rowid()))
    }

    pub fn update_platform_version(
        &self,
        id: PlatformVersionId,
        version: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE platform_versions SET version = ?1 WHERE id = ?2",
            (version, id.0),
        )?;
        Ok(rows > 0)
    }

    pub fn delete_platform_version(&self, id: PlatformVersionId) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM platform_versions WHERE id = ?1", [id.0])?;
        Ok(rows > 0)
    }

    pub fn find_platform_version(
        &self,
        version: &str,
    ) -> Result<Option<PlatformVersionId>, StoreError> {
        let conn = self.lock_conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM platform_versions WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(PlatformVersionId))
    }

    pub fn create_requirement(
        &self,
        release_id: ReleaseId,
        target_artifact_id: ArtifactId,
        constraint: &str,
    ) -> Result<RequirementId, StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO requirements (release_id, target_artifact_id, version_constraint) VALUES (?1, ?2, ?3)",
            (release_id.0, target_artifact_id.0, constraint),
        )?;
        Ok(RequirementId(conn.last_insert_rowid()))
    }

    pub fn update_requirement(
        &self,
        id: RequirementId,
        target_artifact_id: ArtifactId,
        constraint: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE requirements SET target_artifact_id = ?1, version_constraint = ?2 WHERE id = ?3",
            (target_artifact_id.0, constraint, id.0),
        )?;
        Ok(rows > 0)
    }

    pub fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM requirements WHERE id = ?1", [id.0])?;
        Ok(rows > 0)
    }

    pub fn requirements_of_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<Requirement>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, release_id, target_artifact_id, version_constraint FROM requirements WHERE release_id = ?1 ORDER BY id",
        )?;
        let requirements = stmt
            .query_map([release_id.0], |row| {
                Ok(Requirement {
                    id: RequirementId(row.get(0)?),
                    release_id: ReleaseId(row.get(1)?),
                    target_artifact_id: ArtifactId(row.get(2)?),
                    constraint: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requirements)
    }
}

impl CompatStorer for Store {
    fn get_release(&self, id: ReleaseId) -> Result<Option<Release>, StoreError> {
        let conn = self.lock_conn()?;
        let release = conn
            .query_row(
                &format!("SELECT {RELEASE_COLUMNS} FROM releases r WHERE r.id = ?1"),
                [id.0],
                Self::release_from_row,
            )
            .optional()?;
        Ok(release)
    }

    fn get_requirement(&self, id: RequirementId) -> Result<Option<Requirement>, StoreError> {
        let conn = self.lock_conn()?;
        let requirement = conn
            .query_row(
                "SELECT id, release_id, target_artifact_id, version_constraint FROM requirements WHERE id = ?1",
                [id.0],
                |row| {
                    Ok(Requirement {
                        id: RequirementId(row.get(0)?),
                        release_id: ReleaseId(row.get(1)?),
                        target_artifact_id: ArtifactId(row.get(2)?),
                        constraint: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(requirement)
    }

    fn list_release_ids(&self) -> Result<Vec<ReleaseId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM releases ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0).map(ReleaseId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn list_requirement_ids(&self) -> Result<Vec<RequirementId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM requirements ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0).map(RequirementId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn list_platform_versions(&self) -> Result<Vec<PlatformVersion>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id, version FROM platform_versions ORDER BY id")?;
        let versions = stmt
            .query_map([], |row| {
                Ok(PlatformVersion {
                    id: PlatformVersionId(row.get(0)?),
                    version: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    fn releases_of_artifact(&self, artifact_id: ArtifactId) -> Result<Vec<Release>, StoreError> {
        let conn = self.lock_conn()?;
        Self::query_releases(
            &conn,
            &format!("SELECT {RELEASE_COLUMNS} FROM releases r WHERE r.artifact_id = ?1 ORDER BY r.id"),
            [artifact_id.0],
        )
    }

    fn requirements_targeting(
        &self,
        artifact_id: ArtifactId,
    ) -> Result<Vec<RequirementId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT id FROM requirements WHERE target_artifact_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([artifact_id.0], |row| row.get(0).map(RequirementId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn requirements_matching_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<RequirementId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT requirement_id FROM requirement_matches WHERE release_id = ?1 ORDER BY requirement_id",
        )?;
        let ids = stmt
            .query_map([release_id.0], |row| row.get(0).map(RequirementId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn dependency_targets(&self, artifact_id: ArtifactId) -> Result<Vec<ArtifactId>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT q.target_artifact_id FROM requirements q
            JOIN releases r ON q.release_id = r.id
            WHERE r.artifact_id = ?1
            ORDER BY q.target_artifact_id
            "#,
        )?;
        let ids = stmt
            .query_map([artifact_id.0], |row| row.get(0).map(ArtifactId))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn replace_platform_compat(
        &self,
        release_id: ReleaseId,
        platform_version_ids: &[PlatformVersionId],
    ) -> Result<bool, StoreError> {
        let members: Vec<i64> = platform_version_ids.iter().map(|id| id.0).collect();
        self.replace_rows(
            "release_platform_compat",
            "release_id",
            "platform_version_id",
            release_id.0,
            &members,
        )
    }

    fn replace_requirement_matches(
        &self,
        requirement_id: RequirementId,
        release_ids: &[ReleaseId],
    ) -> Result<bool, StoreError> {
        let members: Vec<i64> = release_ids.iter().map(|id| id.0).collect();
        self.replace_rows(
            "requirement_matches",
            "requirement_id",
            "release_id",
            requirement_id.0,
            &members,
        )
    }

    fn purge_orphans(&self) -> Result<usize, StoreError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let compat = tx.execute(
            r#"
            DELETE FROM release_platform_compat
            WHERE release_id NOT IN (SELECT id FROM releases)
               OR platform_version_id NOT IN (SELECT id FROM platform_versions)
            "#,
            [],
        )?;
        let matches = tx.execute(
            r#"
            DELETE FROM requirement_matches
            WHERE requirement_id NOT IN (SELECT id FROM requirements)
               OR release_id NOT IN (SELECT id FROM releases)
            "#,
            [],
        )?;

        tx.commit()?;

        if compat + matches > 0 {
            debug!(
                "Purged {} orphaned compat rows and {} orphaned match rows",
                compat, matches
            );
        }
        Ok(compat + matches)
    }

    fn resolved_platform_versions(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<PlatformVersion>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.version FROM platform_versions p
            JOIN release_platform_compat c ON c.platform_version_id = p.id
            WHERE c.release_id = ?1
            ORDER BY p.id
            "#,
        )?;
        let versions = stmt
            .query_map([release_id.0], |row| {
                Ok(PlatformVersion {
                    id: PlatformVersionId(row.get(0)?),
                    version: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    fn resolved_matches(&self, requirement_id: RequirementId) -> Result<Vec<Release>, StoreError> {
        let conn = self.lock_conn()?;
        Self::query_releases(
            &conn,
            &format!(
                r#"
                SELECT {RELEASE_COLUMNS} FROM releases r
                JOIN requirement_matches m ON m.release_id = r.id
                WHERE m.requirement_id = ?1
                ORDER BY r.id
                "#
            ),
            [requirement_id.0],
        )
    }

    fn resolved_matches_of_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<ResolvedMatch>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT q.id, q.target_artifact_id, {RELEASE_COLUMNS} FROM requirements q
            JOIN requirement_matches m ON m.requirement_id = q.id
            JOIN releases r ON r.id = m.release_id
            WHERE q.release_id = ?1
            ORDER BY q.id, r.id
            "#
        ))?;
        let matches = stmt
            .query_map([release_id.0], |row| {
                Ok(ResolvedMatch {
                    requirement_id: RequirementId(row.get(0)?),
                    target_artifact_id: ArtifactId(row.get(1)?),
                    release: Release {
                        id: ReleaseId(row.get(2)?),
                        artifact_id: ArtifactId(row.get(3)?),
                        version: row.get(4)?,
                        platform_constraint: row.get(5)?,
                        disabled: row.get(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    fn dependants_of(&self, artifact_id: ArtifactId) -> Result<Vec<Release>, StoreError> {
        let conn = self.lock_conn()?;
        Self::query_releases(
            &conn,
            &format!(
                r#"
                SELECT DISTINCT {RELEASE_COLUMNS} FROM releases r
                JOIN requirements q ON q.release_id = r.id
                JOIN requirement_matches m ON m.requirement_id = q.id
                WHERE q.target_artifact_id = ?1
                ORDER BY r.id
                "#
            ),
            [artifact_id.0],
        )
    }

    fn unconstrained_releases(&self) -> Result<Vec<Release>, StoreError> {
        let conn = self.lock_conn()?;
        Self::query_releases(
            &conn,
            &format!(
                "SELECT {RELEASE_COLUMNS} FROM releases r WHERE trim(r.platform_constraint, {BLANK_CHARS}) = '' ORDER BY r.id"
            ),
            [],
        )
    }
}

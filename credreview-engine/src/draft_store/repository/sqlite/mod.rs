//! SQLite implementation of `DraftRepository`.
//!
//! This provides on-device storage that survives closing and reopening the
//! review dialog, and process restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! # Forward Compatibility
//!
//! Each group is stored as a JSON array of `DraftRecord`. New record fields
//! must use `#[serde(default)]` so drafts written by older builds still load.


use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::{DraftKey, DraftRecord, DraftRepository, RepositoryError};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed draft repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
pub struct SqliteDraftRepository {
    /// Exposed as `pub(crate)` so tests can plant malformed rows.
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteDraftRepository {
    /// Create a new SQLite repository at the given path.
    ///
    /// Creates the database file and schema if they don't exist, and runs any
    /// pending migrations on an existing file. The database is configured
    /// with `journal_mode = WAL` and `busy_timeout = 5000ms`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();

        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";
        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create draft directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // Drafts may hold reviewer notes about people; keep the file private.
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!("Failed to set restrictive permissions on draft database: {}", e);
            }
        }

        // In-memory databases report "memory"; that is expected.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            // Drafts are best-effort, so a weaker journal is a warning, not an error
            warn!(
                "SQLite kept journal mode '{}' instead of 'wal' for the draft database",
                journal_mode
            );
        }

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        // 0 if the table is empty (fresh database)
        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Draft database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS draft_groups (
                    owner_id TEXT NOT NULL,
                    subject_kind TEXT NOT NULL CHECK(subject_kind IN (
                        'lecturer', 'degrees', 'certificates'
                    )),
                    records_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (owner_id, subject_kind)
                );
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    /// Current unix timestamp in seconds.
    fn now_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

fn lock<'a>(
    conn: &'a Mutex<Connection>,
    operation: &'static str,
) -> Result<MutexGuard<'a, Connection>, RepositoryError> {
    conn.lock()
        .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))
}

fn join_error(operation: &'static str, e: tokio::task::JoinError) -> RepositoryError {
    RepositoryError::storage(operation, format!("spawn_blocking failed: {}", e))
}

#[async_trait]
impl DraftRepository for SqliteDraftRepository {
    async fn get(&self, key: &DraftKey) -> Result<Option<Vec<DraftRecord>>, RepositoryError> {
        let conn = self.conn.clone();
        let owner = key.owner_id.0.clone();
        let kind = key.kind.group_name();
        let what = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "get")?;

            let json: Option<String> = conn
                .query_row(
                    "SELECT records_json FROM draft_groups
                     WHERE owner_id = ?1 AND subject_kind = ?2",
                    params![owner, kind],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get", e.to_string()))?;

            match json {
                Some(json) => {
                    let records: Vec<DraftRecord> = serde_json::from_str(&json)
                        .map_err(|_| RepositoryError::corruption(what))?;
                    Ok(Some(records))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| join_error("get", e))?
    }

    async fn put(&self, key: &DraftKey, records: Vec<DraftRecord>) -> Result<(), RepositoryError> {
        let conn = self.conn.clone();
        let owner = key.owner_id.0.clone();
        let kind = key.kind.group_name();

        let records_json = serde_json::to_string(&records)
            .map_err(|e| RepositoryError::storage("serialize drafts", e.to_string()))?;
        let updated_at = Self::now_secs();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "put")?;

            conn.execute(
                "INSERT INTO draft_groups (owner_id, subject_kind, records_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner_id, subject_kind) DO UPDATE SET
                     records_json = excluded.records_json,
                     updated_at = excluded.updated_at",
                params![owner, kind, records_json, updated_at],
            )
            .map_err(|e| RepositoryError::storage("put", e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| join_error("put", e))?
    }

    async fn delete(&self, key: &DraftKey) -> Result<bool, RepositoryError> {
        let conn = self.conn.clone();
        let owner = key.owner_id.0.clone();
        let kind = key.kind.group_name();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "delete")?;

            let removed = conn
                .execute(
                    "DELETE FROM draft_groups WHERE owner_id = ?1 AND subject_kind = ?2",
                    params![owner, kind],
                )
                .map_err(|e| RepositoryError::storage("delete", e.to_string()))?;

            Ok(removed > 0)
        })
        .await
        .map_err(|e| join_error("delete", e))?
    }
}

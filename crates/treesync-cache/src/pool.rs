//! SQLite connection pool and schema versioning
//!
//! The schema version lives in SQLite's `user_version` pragma. Opening a
//! database applies every migration above the stored version, each in its own
//! transaction, and refuses databases written by a newer schema.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::CacheError;

/// Schema migrations in order; entry `n` upgrades the schema to version `n + 1`
const MIGRATIONS: &[&str] = &[
    include_str!("migrations/20260301_initial.sql"),
    include_str!("migrations/20260315_patch_order.sql"),
];

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of connections to the sync state database
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (or creates) the database at `db_path` and brings its schema up
    /// to date
    ///
    /// Missing parent directories are created. The database runs in WAL mode
    /// so readers do not block the ledger writer.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Open`] if the file cannot be created or opened
    /// - [`CacheError::Schema`] if a migration fails
    /// - [`CacheError::NewerSchema`] if the file was written by a newer version
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Open(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Open(format!("{}: {e}", db_path.display())))?;

        let version = migrate(&pool).await?;
        info!(path = %db_path.display(), schema_version = version, "Opened sync state database");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database
    ///
    /// An in-memory database lives as long as its connection, so the pool
    /// keeps exactly one connection open for its whole lifetime.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Open(format!("in-memory database: {e}")))?;

        migrate(&pool).await?;
        debug!("Opened in-memory sync state database");
        Ok(Self { pool })
    }

    /// Returns the underlying pool, for building repositories
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection, waiting for checked-out ones to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Applies the pending migrations and returns the resulting schema version
async fn migrate(pool: &SqlitePool) -> Result<i64, CacheError> {
    let latest = MIGRATIONS.len() as i64;
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    if current > latest {
        return Err(CacheError::NewerSchema {
            found: current,
            supported: latest,
        });
    }

    let applied = usize::try_from(current).unwrap_or(0);
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(applied) {
        let version = index as i64 + 1;
        let schema_error = |e: sqlx::Error| CacheError::Schema {
            version,
            message: e.to_string(),
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(schema_error)?;
        let bump = format!("PRAGMA user_version = {version}");
        sqlx::raw_sql(&bump)
            .execute(&mut *tx)
            .await
            .map_err(schema_error)?;
        tx.commit().await?;

        debug!(version, "Applied schema migration");
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user_version(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_is_migrated() {
        let db = DatabasePool::in_memory().await.unwrap();
        assert_eq!(user_version(db.pool()).await, MIGRATIONS.len() as i64);

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(tables, vec!["page_tokens", "settings", "sync_data", "workspaces"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("treesync.db");

        let db = DatabasePool::new(&path).await.unwrap();
        db.close().await;
        let db = DatabasePool::new(&path).await.unwrap();
        assert_eq!(user_version(db.pool()).await, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treesync.db");

        let db = DatabasePool::new(&path).await.unwrap();
        sqlx::raw_sql("PRAGMA user_version = 99")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        match DatabasePool::new(&path).await {
            Err(CacheError::NewerSchema { found, supported }) => {
                assert_eq!(found, 99);
                assert_eq!(supported, MIGRATIONS.len() as i64);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("newer schema was accepted"),
        }
    }
}

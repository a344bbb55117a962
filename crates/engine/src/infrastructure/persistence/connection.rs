//! SQLite connection management

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::infrastructure::ports::RepoError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        kind TEXT NOT NULL,
        id TEXT NOT NULL,
        short_id TEXT,
        owner_id TEXT,
        body TEXT NOT NULL,
        revision INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (kind, id)
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS documents_short_id ON documents (kind, short_id) WHERE short_id IS NOT NULL",
    "CREATE INDEX IF NOT EXISTS documents_owner ON documents (kind, owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS files (
        filename TEXT PRIMARY KEY NOT NULL,
        content_type TEXT NOT NULL,
        length INTEGER NOT NULL,
        metadata TEXT NOT NULL,
        data BLOB NOT NULL,
        revision INTEGER NOT NULL DEFAULT 1,
        upload_date TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

/// Shared SQLite connection pool
#[derive(Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub async fn open(path: &Path) -> Result<Self, RepoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::database("connect", e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        tracing::info!(path = %path.display(), "Opened SQLite database");

        let connection = Self { pool };
        connection.initialize_schema().await?;
        Ok(connection)
    }

    /// Get a reference to the pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes
    pub async fn initialize_schema(&self) -> Result<(), RepoError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("schema", e))?;
        }
        tracing::info!("Database schema initialized");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//! SQLite blob store for uploaded files.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use questline_domain::{FileName, ShortId, StoredFile};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::connection::SqliteConnection;
use super::hooks::HookRegistry;
use crate::infrastructure::ports::{PersistHook, RepoError, ResourceStore, Upserted};

const META_COLUMNS: &str = "filename, content_type, length, metadata, upload_date, revision";

/// Document fields holding URLs of stored pictures.
pub const PICTURE_FIELDS: &[&str] = &["adventurePic", "adventureHeaderPic", "portrait"];

pub struct SqliteFileStore {
    pool: SqlitePool,
    hooks: HookRegistry<StoredFile>,
}

impl SqliteFileStore {
    pub fn new(connection: &SqliteConnection) -> Self {
        Self {
            pool: connection.pool().clone(),
            hooks: HookRegistry::new(),
        }
    }

    /// Whether a blob with this name exists, without loading it.
    pub async fn exists(&self, filename: &FileName) -> Result<bool, RepoError> {
        let row = sqlx::query("SELECT 1 FROM files WHERE filename = ?")
            .bind(filename.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("file_exists", e))?;
        Ok(row.is_some())
    }

    /// Whether any stored adventure or character still points at this file.
    pub async fn is_referenced(&self, filename: &FileName) -> Result<bool, RepoError> {
        let matches = PICTURE_FIELDS
            .iter()
            .map(|field| format!("json_extract(body, '$.{field}') = ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("SELECT 1 FROM documents WHERE {matches} LIMIT 1");

        let url = filename.url();
        let mut query = sqlx::query(&sql);
        for _ in PICTURE_FIELDS {
            query = query.bind(url.clone());
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("file_is_referenced", e))?;
        Ok(row.is_some())
    }

    /// Decodes metadata columns; `data` is read only when selected.
    fn decode(row: &SqliteRow, with_data: bool) -> Result<StoredFile, RepoError> {
        let filename: String = row.get("filename");
        let filename = FileName::new(filename).map_err(RepoError::serialization)?;
        let metadata: String = row.get("metadata");
        let metadata: Map<String, Value> =
            serde_json::from_str(&metadata).map_err(RepoError::serialization)?;
        let upload_date: String = row.get("upload_date");
        let upload_date = DateTime::parse_from_rfc3339(&upload_date)
            .map_err(RepoError::serialization)?
            .with_timezone(&Utc);
        let length: i64 = row.get("length");
        let content: Vec<u8> = if with_data { row.get("data") } else { Vec::new() };

        Ok(StoredFile {
            url: filename.url(),
            filename,
            content_type: row.get("content_type"),
            length: u64::try_from(length).unwrap_or_default(),
            upload_date,
            metadata,
            content,
        })
    }

    fn metadata_json(file: &StoredFile) -> Result<String, RepoError> {
        serde_json::to_string(&file.metadata).map_err(RepoError::serialization)
    }
}

#[async_trait]
impl ResourceStore<StoredFile> for SqliteFileStore {
    /// Metadata only; listing never loads blob bytes.
    async fn find_all(&self) -> Result<Vec<StoredFile>, RepoError> {
        let sql = format!("SELECT {META_COLUMNS} FROM files ORDER BY rowid");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("file_find_all", e))?;
        rows.iter().map(|row| Self::decode(row, false)).collect()
    }

    async fn find_by_id(&self, id: &FileName) -> Result<Option<StoredFile>, RepoError> {
        let sql = format!("SELECT {META_COLUMNS}, data FROM files WHERE filename = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("file_find", e))?;
        row.as_ref().map(|row| Self::decode(row, true)).transpose()
    }

    /// Files are addressed by filename only.
    async fn find_by_short_id(&self, _short_id: &ShortId) -> Result<Option<StoredFile>, RepoError> {
        Ok(None)
    }

    async fn insert(&self, file: &StoredFile) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO files (filename, content_type, length, metadata, data, revision, upload_date)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(file.filename.as_str())
        .bind(&file.content_type)
        .bind(file.content.len() as i64)
        .bind(Self::metadata_json(file)?)
        .bind(&file.content)
        .bind(file.upload_date.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::from_sqlx("file_insert", e))?;

        self.hooks.saved(file);
        Ok(())
    }

    /// Replaces content and metadata; the original upload date is kept.
    async fn upsert(&self, file: &StoredFile) -> Result<Upserted<StoredFile>, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO files (filename, content_type, length, metadata, data, revision, upload_date)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(filename) DO UPDATE SET
                content_type = excluded.content_type,
                length = excluded.length,
                metadata = excluded.metadata,
                data = excluded.data,
                revision = files.revision + 1
            RETURNING {META_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(file.filename.as_str())
            .bind(&file.content_type)
            .bind(file.content.len() as i64)
            .bind(Self::metadata_json(file)?)
            .bind(&file.content)
            .bind(file.upload_date.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::from_sqlx("file_upsert", e))?;

        let revision: i64 = row.get("revision");
        let mut stored = Self::decode(&row, false)?;
        stored.content = file.content.clone();
        self.hooks.saved(&stored);
        Ok(Upserted {
            entity: stored,
            created: revision == 1,
        })
    }

    /// Updates content type and metadata. Bytes are immutable through save.
    async fn save(&self, file: &StoredFile) -> Result<StoredFile, RepoError> {
        let sql = format!(
            r#"
            UPDATE files
            SET content_type = ?, metadata = ?, revision = revision + 1
            WHERE filename = ?
            RETURNING {META_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&file.content_type)
            .bind(Self::metadata_json(file)?)
            .bind(file.filename.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::from_sqlx("file_save", e))?
            .ok_or_else(|| RepoError::not_found("file", &file.filename))?;

        let mut stored = Self::decode(&row, false)?;
        stored.content = file.content.clone();
        self.hooks.saved(&stored);
        Ok(stored)
    }

    async fn remove(&self, id: &FileName) -> Result<Option<StoredFile>, RepoError> {
        let sql = format!("DELETE FROM files WHERE filename = ? RETURNING {META_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("file_remove", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let removed = Self::decode(&row, false)?;
        self.hooks.removed(&removed);
        Ok(Some(removed))
    }

    fn register_hook(&self, hook: Arc<dyn PersistHook<StoredFile>>) {
        self.hooks.register(hook);
    }
}

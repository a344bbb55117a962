//! SQLite document store, one instance per resource kind.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use questline_domain::{Identity, Resource, ShortId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::connection::SqliteConnection;
use super::hooks::HookRegistry;
use crate::infrastructure::ports::{ClockPort, PersistHook, RepoError, ResourceStore, Upserted};

const COLUMNS: &str = "id, short_id, owner_id, body, revision";

/// Stores `R` as JSON in the shared `documents` table.
///
/// The identity columns are authoritative: on every read they overwrite
/// whatever identity the JSON body carries.
pub struct SqliteDocumentStore<R> {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    hooks: HookRegistry<R>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> SqliteDocumentStore<R> {
    pub fn new(connection: &SqliteConnection, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            pool: connection.pool().clone(),
            clock,
            hooks: HookRegistry::new(),
            _kind: PhantomData,
        }
    }

    fn decode(row: &SqliteRow) -> Result<R, RepoError> {
        let id: String = row.get("id");
        let short_id: Option<String> = row.get("short_id");
        let owner_id: Option<String> = row.get("owner_id");
        let body: String = row.get("body");

        let mut entity: R =
            serde_json::from_str(&body).map_err(RepoError::serialization)?;
        let id = R::parse_id(&id).ok_or_else(|| {
            RepoError::serialization(format!("corrupt {} id column: {}", R::KIND, id))
        })?;
        let short_id = short_id
            .map(ShortId::new)
            .transpose()
            .map_err(RepoError::serialization)?;
        let owner = owner_id
            .map(|o| o.parse::<UserId>())
            .transpose()
            .map_err(RepoError::serialization)?;

        entity.set_identity(Identity {
            id,
            short_id,
            owner,
        });
        Ok(entity)
    }

    fn encode(entity: &R) -> Result<(Identity<R::Id>, String), RepoError> {
        let body = serde_json::to_string(entity).map_err(RepoError::serialization)?;
        Ok((entity.identity(), body))
    }

    async fn fetch_one_where(
        &self,
        operation: &'static str,
        clause: &str,
        value: String,
    ) -> Result<Option<R>, RepoError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE kind = ? AND {clause} = ?");
        let row = sqlx::query(&sql)
            .bind(R::KIND)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database(operation, e))?;
        row.as_ref().map(Self::decode).transpose()
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for SqliteDocumentStore<R> {
    async fn find_all(&self) -> Result<Vec<R>, RepoError> {
        let sql = format!("SELECT {COLUMNS} FROM documents WHERE kind = ? ORDER BY rowid");
        let rows = sqlx::query(&sql)
            .bind(R::KIND)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("find_all", e))?;
        rows.iter().map(Self::decode).collect()
    }

    async fn find_by_id(&self, id: &R::Id) -> Result<Option<R>, RepoError> {
        self.fetch_one_where("find_by_id", "id", id.to_string())
            .await
    }

    async fn find_by_short_id(&self, short_id: &ShortId) -> Result<Option<R>, RepoError> {
        self.fetch_one_where("find_by_short_id", "short_id", short_id.to_string())
            .await
    }

    async fn insert(&self, entity: &R) -> Result<(), RepoError> {
        let (identity, body) = Self::encode(entity)?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents (kind, id, short_id, owner_id, body, revision, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(R::KIND)
        .bind(identity.id.to_string())
        .bind(identity.short_id.map(String::from))
        .bind(identity.owner.map(|o| o.to_string()))
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::from_sqlx("insert", e))?;

        self.hooks.saved(entity);
        Ok(())
    }

    async fn upsert(&self, entity: &R) -> Result<Upserted<R>, RepoError> {
        let (identity, body) = Self::encode(entity)?;
        let now = self.clock.now().to_rfc3339();

        // Identity columns are left alone by the update branch.
        let sql = format!(
            r#"
            INSERT INTO documents (kind, id, short_id, owner_id, body, revision, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(kind, id) DO UPDATE SET
                body = excluded.body,
                revision = documents.revision + 1,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(R::KIND)
            .bind(identity.id.to_string())
            .bind(identity.short_id.map(String::from))
            .bind(identity.owner.map(|o| o.to_string()))
            .bind(body)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::from_sqlx("upsert", e))?;

        let revision: i64 = row.get("revision");
        let stored = Self::decode(&row)?;
        self.hooks.saved(&stored);
        Ok(Upserted {
            entity: stored,
            created: revision == 1,
        })
    }

    async fn save(&self, entity: &R) -> Result<R, RepoError> {
        let (identity, body) = Self::encode(entity)?;
        let now = self.clock.now().to_rfc3339();

        let sql = format!(
            r#"
            UPDATE documents
            SET body = ?, revision = revision + 1, updated_at = ?
            WHERE kind = ? AND id = ?
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(body)
            .bind(now)
            .bind(R::KIND)
            .bind(identity.id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::from_sqlx("save", e))?
            .ok_or_else(|| RepoError::not_found(R::KIND, &identity.id))?;

        let stored = Self::decode(&row)?;
        self.hooks.saved(&stored);
        Ok(stored)
    }

    async fn remove(&self, id: &R::Id) -> Result<Option<R>, RepoError> {
        let sql = format!("DELETE FROM documents WHERE kind = ? AND id = ? RETURNING {COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(R::KIND)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("remove", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let removed = Self::decode(&row)?;
        self.hooks.removed(&removed);
        Ok(Some(removed))
    }

    fn register_hook(&self, hook: Arc<dyn PersistHook<R>>) {
        self.hooks.register(hook);
    }
}

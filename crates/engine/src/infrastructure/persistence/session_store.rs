//! SQLite-backed sessions resolving bearer tokens to principals.

use std::sync::Arc;

use async_trait::async_trait;
use questline_domain::{Adventure, Character, Principal, Resource, Role, UserId};
use sqlx::{Row, SqlitePool};

use super::connection::SqliteConnection;
use crate::infrastructure::config::SessionGrant;
use crate::infrastructure::ports::{ClockPort, PrincipalProvider, RepoError};

pub struct SqliteSessionStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteSessionStore {
    pub fn new(connection: &SqliteConnection, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            pool: connection.pool().clone(),
            clock,
        }
    }

    /// Creates or re-points a session token.
    pub async fn grant(&self, grant: &SessionGrant) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, role, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                user_id = excluded.user_id,
                role = excluded.role
            "#,
        )
        .bind(&grant.token)
        .bind(grant.user_id.to_string())
        .bind(grant.role.as_str())
        .bind(self.clock.now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("session_grant", e))?;
        Ok(())
    }

    /// Adventure and character ids owned by `user_id`.
    async fn owned_documents(&self, principal: Principal) -> Result<Principal, RepoError> {
        let rows = sqlx::query(
            "SELECT kind, id FROM documents WHERE owner_id = ? AND kind IN (?, ?) ORDER BY rowid",
        )
        .bind(principal.user_id.to_string())
        .bind(Adventure::KIND)
        .bind(Character::KIND)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("session_owned", e))?;

        let mut principal = principal;
        for row in rows {
            let kind: String = row.get("kind");
            let id: String = row.get("id");
            if kind == Adventure::KIND {
                if let Some(id) = Adventure::parse_id(&id) {
                    principal.adventures.insert(id);
                }
            } else if let Some(id) = Character::parse_id(&id) {
                principal.characters.insert(id);
            }
        }
        Ok(principal)
    }
}

#[async_trait]
impl PrincipalProvider for SqliteSessionStore {
    async fn principal_for_token(&self, token: &str) -> Result<Option<Principal>, RepoError> {
        let row = sqlx::query("SELECT user_id, role FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("session_lookup", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user_id: String = row.get("user_id");
        let role: String = row.get("role");
        let user_id: UserId = user_id.parse().map_err(RepoError::serialization)?;
        let role: Role = role.parse().map_err(RepoError::serialization)?;

        self.owned_documents(Principal::new(user_id, role))
            .await
            .map(Some)
    }
}

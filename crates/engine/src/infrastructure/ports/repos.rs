//! Storage port traits.

use std::sync::Arc;

use async_trait::async_trait;
use questline_domain::{Principal, Resource, ShortId};

use super::error::RepoError;

// =============================================================================
// Document Storage
// =============================================================================

/// Result of an atomic create-or-replace.
#[derive(Debug, Clone)]
pub struct Upserted<R> {
    pub entity: R,
    /// `true` when the insert branch ran.
    pub created: bool,
}

/// Callbacks run after a write has been committed.
///
/// Hooks are called inline on the writing task, so they must not block.
pub trait PersistHook<R>: Send + Sync {
    fn after_save(&self, entity: &R);
    fn after_remove(&self, entity: &R);
}

/// Persistent store for one resource kind.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Every document, in the store's natural (insertion) order.
    async fn find_all(&self) -> Result<Vec<R>, RepoError>;

    async fn find_by_id(&self, id: &R::Id) -> Result<Option<R>, RepoError>;

    async fn find_by_short_id(&self, short_id: &ShortId) -> Result<Option<R>, RepoError>;

    /// Stores a new document. Fails with `RepoError::Conflict` when its
    /// primary or short identifier is taken.
    async fn insert(&self, entity: &R) -> Result<(), RepoError>;

    /// Single-statement create-or-replace keyed by primary identifier.
    ///
    /// Identity assigned at insert time (short id, owner) survives the
    /// replace branch.
    async fn upsert(&self, entity: &R) -> Result<Upserted<R>, RepoError>;

    /// Overwrites an existing document. Fails with `RepoError::NotFound` if
    /// it vanished since it was read.
    async fn save(&self, entity: &R) -> Result<R, RepoError>;

    /// Removes a document, returning what was removed.
    async fn remove(&self, id: &R::Id) -> Result<Option<R>, RepoError>;

    fn register_hook(&self, hook: Arc<dyn PersistHook<R>>);
}

// =============================================================================
// Sessions
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    /// Principal behind a bearer token, or `None` for unknown tokens.
    async fn principal_for_token(&self, token: &str) -> Result<Option<Principal>, RepoError>;
}

//! Resource lifecycle: the six operations every stored document type shares.
//!
//! One `ResourceLifecycle` is instantiated per resource kind. Each operation
//! authorizes first, resolves the identifier second and only then touches the
//! store. Events are not published here: the store's after-save and
//! after-remove hooks fire once a write has committed.

mod error;
mod gate;
mod outcome;
mod patch;
mod resolver;
mod sanitize;
mod short_id;

pub use error::ResourceError;
pub use gate::{requires_authentication, requires_role, AccessPolicy, Operation, Requirement};
pub use outcome::Outcome;
pub use patch::{apply_patch, parse_patch};
pub use resolver::Resolver;
pub use sanitize::strip_identifiers;
pub use short_id::ShortIdGenerator;

use std::sync::Arc;

use questline_domain::{Identity, Principal, Resource};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::infrastructure::config::ShortIdConfig;
use crate::infrastructure::ports::{RandomPort, RepoError, ResourceStore};

/// Which documents a list operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Only documents the principal owns. Never an authorization failure.
    Mine,
}

pub struct ResourceLifecycle<R: Resource> {
    store: Arc<dyn ResourceStore<R>>,
    resolver: Resolver<R>,
    policy: AccessPolicy,
    short_ids: ShortIdGenerator,
    random: Arc<dyn RandomPort>,
}

impl<R: Resource> ResourceLifecycle<R> {
    pub fn new(
        store: Arc<dyn ResourceStore<R>>,
        policy: AccessPolicy,
        random: Arc<dyn RandomPort>,
        short_ids: ShortIdConfig,
    ) -> Self {
        Self {
            resolver: Resolver::new(store.clone()),
            short_ids: ShortIdGenerator::new(random.clone(), short_ids),
            store,
            policy,
            random,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn list(
        &self,
        principal: Option<&Principal>,
        scope: Scope,
    ) -> Result<Outcome<Vec<R>>, ResourceError> {
        let principal = self.policy.authorize(Operation::List, principal)?;
        let mut entities = self
            .store
            .find_all()
            .await
            .map_err(|e| self.store_error("list", e))?;

        if scope == Scope::Mine {
            entities.retain(|entity| entity.is_owned_by(principal));
        }
        Ok(Outcome::Ok(entities))
    }

    /// Persists a new document with system-assigned identifiers.
    ///
    /// Collisions on a generated identifier are retried with fresh ones.
    pub async fn create(
        &self,
        principal: Option<&Principal>,
        draft: R::Draft,
    ) -> Result<Outcome<R>, ResourceError> {
        let principal = self.policy.authorize(Operation::Create, principal)?;

        let mut last_conflict = None;
        for attempt in 1..=self.short_ids.attempts() {
            let id = R::mint_id(self.random.gen_uuid(), &draft)?;
            let entity = R::assemble(self.fresh_identity(id, principal)?, draft.clone())?;
            entity.validate()?;

            match self.store.insert(&entity).await {
                Ok(()) => {
                    tracing::info!(kind = R::KIND, id = %entity.identity().id, "Created");
                    self.report_dependencies(&entity);
                    return Ok(Outcome::Created(entity));
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(kind = R::KIND, attempt, error = %e, "Identifier collision on create");
                    last_conflict = Some(e);
                }
                Err(e) => return Err(self.store_error("create", e)),
            }
        }

        let e = last_conflict
            .unwrap_or_else(|| RepoError::conflict("insert", "no identifier attempts made"));
        Err(self.store_error("create", e))
    }

    pub async fn read(
        &self,
        principal: Option<&Principal>,
        token: &str,
    ) -> Result<Outcome<R>, ResourceError> {
        self.policy.authorize(Operation::Read, principal)?;
        let entity = self.resolve(token).await?;
        Ok(Outcome::Ok(entity))
    }

    /// Replace-or-create in one atomic upsert.
    ///
    /// An existing document keeps its identity. When nothing resolves, the
    /// token must be a well-formed primary identifier, which the new document
    /// is created under.
    pub async fn replace(
        &self,
        principal: Option<&Principal>,
        token: &str,
        draft: R::Draft,
    ) -> Result<Outcome<R>, ResourceError> {
        let principal = self.policy.authorize(Operation::Replace, principal)?;
        let existing = self.resolver.resolve(token).await;
        let id = match &existing {
            Some(entity) => entity.identity().id,
            None => R::parse_id(token).ok_or_else(|| ResourceError::not_found(R::KIND, token))?,
        };

        let mut last_conflict = None;
        for attempt in 1..=self.short_ids.attempts() {
            let identity = match &existing {
                Some(entity) => entity.identity(),
                None => self.fresh_identity(id.clone(), principal)?,
            };
            let entity = R::assemble(identity, draft.clone())?;
            entity.validate()?;

            match self.store.upsert(&entity).await {
                Ok(upserted) => {
                    tracing::info!(
                        kind = R::KIND,
                        id = %id,
                        created = upserted.created,
                        "Replaced"
                    );
                    self.report_dependencies(&upserted.entity);
                    return Ok(Outcome::Ok(upserted.entity));
                }
                Err(e) if e.is_conflict() && existing.is_none() => {
                    tracing::debug!(kind = R::KIND, attempt, error = %e, "Identifier collision on replace");
                    last_conflict = Some(e);
                }
                Err(e) => return Err(self.store_error(token, e)),
            }
        }

        let e = last_conflict
            .unwrap_or_else(|| RepoError::conflict("upsert", "no identifier attempts made"));
        Err(self.store_error(token, e))
    }

    /// Applies an RFC 6902 operation list. Either every operation lands or
    /// the stored document is left untouched.
    pub async fn patch(
        &self,
        principal: Option<&Principal>,
        token: &str,
        operations: Value,
    ) -> Result<Outcome<R>, ResourceError> {
        self.policy.authorize(Operation::Patch, principal)?;
        let original = self.resolve(token).await?;
        let patch = parse_patch(operations)?;
        let patched = apply_patch(&original, &patch)?;

        // Concurrent patches of the same document: last write wins.
        let saved = self
            .store
            .save(&patched)
            .await
            .map_err(|e| self.store_error(token, e))?;

        tracing::info!(kind = R::KIND, id = %saved.identity().id, operations = patch.0.len(), "Patched");
        self.report_dependencies(&saved);
        Ok(Outcome::Ok(saved))
    }

    pub async fn destroy(
        &self,
        principal: Option<&Principal>,
        token: &str,
    ) -> Result<Outcome<R>, ResourceError> {
        self.policy.authorize(Operation::Destroy, principal)?;
        let entity = self.resolve(token).await?;
        let id = entity.identity().id;

        match self.store.remove(&id).await {
            Ok(Some(_)) => {
                tracing::info!(kind = R::KIND, id = %id, "Destroyed");
                Ok(Outcome::NoContent)
            }
            // Removed by a concurrent request between resolve and remove.
            Ok(None) => Err(ResourceError::not_found(R::KIND, token)),
            Err(e) => Err(self.store_error(token, e)),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn resolve(&self, token: &str) -> Result<R, ResourceError> {
        self.resolver
            .resolve(token)
            .await
            .ok_or_else(|| ResourceError::not_found(R::KIND, token))
    }

    fn fresh_identity(
        &self,
        id: R::Id,
        principal: &Principal,
    ) -> Result<Identity<R::Id>, ResourceError> {
        let mut identity = Identity::new(id).with_owner(principal.user_id);
        if R::HAS_SHORT_ID {
            // A generation failure is a configuration fault, never the client's.
            let short_id = self.short_ids.next().map_err(|e| {
                tracing::error!(kind = R::KIND, error = %e, "Short id generation failed");
                ResourceError::Store(RepoError::database("generate_short_id", e))
            })?;
            identity = identity.with_short_id(short_id);
        }
        Ok(identity)
    }

    fn report_dependencies(&self, entity: &R) {
        let unresolved = entity.unresolved_dependencies();
        if !unresolved.is_empty() {
            tracing::warn!(
                kind = R::KIND,
                id = %entity.identity().id,
                codes = ?unresolved,
                "Attribute dependencies do not resolve within the sheet"
            );
        }
    }

    fn store_error(&self, token: &str, e: RepoError) -> ResourceError {
        if e.is_not_found() {
            return ResourceError::not_found(R::KIND, token);
        }
        tracing::error!(kind = R::KIND, token, error = %e, "Store operation failed");
        ResourceError::Store(e)
    }
}

impl<R> ResourceLifecycle<R>
where
    R: Resource,
    R::Draft: DeserializeOwned,
{
    /// `create` from a raw JSON payload. Identifiers are stripped first.
    pub async fn create_json(
        &self,
        principal: Option<&Principal>,
        payload: Value,
    ) -> Result<Outcome<R>, ResourceError> {
        self.policy.authorize(Operation::Create, principal)?;
        let draft = decode_draft::<R>(payload)?;
        self.create(principal, draft).await
    }

    /// `replace` from a raw JSON payload. Identifiers are stripped first.
    pub async fn replace_json(
        &self,
        principal: Option<&Principal>,
        token: &str,
        payload: Value,
    ) -> Result<Outcome<R>, ResourceError> {
        self.policy.authorize(Operation::Replace, principal)?;
        let draft = decode_draft::<R>(payload)?;
        self.replace(principal, token, draft).await
    }
}

fn decode_draft<R>(payload: Value) -> Result<R::Draft, ResourceError>
where
    R: Resource,
    R::Draft: DeserializeOwned,
{
    let clean = strip_identifiers::<R>(payload)?;
    serde_json::from_value(clean).map_err(ResourceError::validation)
}

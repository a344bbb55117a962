//! Identifier resolution: primary id first, then short id.

use std::sync::Arc;

use questline_domain::{Resource, ShortId};

use crate::infrastructure::ports::ResourceStore;

pub struct Resolver<R: Resource> {
    store: Arc<dyn ResourceStore<R>>,
}

impl<R: Resource> Resolver<R> {
    pub fn new(store: Arc<dyn ResourceStore<R>>) -> Self {
        Self { store }
    }

    /// The entity `token` names, or `None`.
    ///
    /// Malformed tokens and store failures both count as "not found".
    pub async fn resolve(&self, token: &str) -> Option<R> {
        if let Some(id) = R::parse_id(token) {
            match self.store.find_by_id(&id).await {
                Ok(Some(entity)) => return Some(entity),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(kind = R::KIND, token, error = %e, "Primary id lookup failed");
                }
            }
        }

        if !R::HAS_SHORT_ID {
            tracing::debug!(kind = R::KIND, token, "Identifier not resolved");
            return None;
        }
        let short_id = ShortId::new(token).ok()?;
        match self.store.find_by_short_id(&short_id).await {
            Ok(found) => {
                if found.is_none() {
                    tracing::debug!(kind = R::KIND, token, "Identifier not resolved");
                }
                found
            }
            Err(e) => {
                tracing::warn!(kind = R::KIND, token, error = %e, "Short id lookup failed");
                None
            }
        }
    }
}

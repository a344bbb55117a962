//! Bearer-token authentication.
//!
//! `Authorization: Bearer <token>` is looked up through the
//! [`PrincipalProvider`]. A missing header or an unknown token yields no
//! principal rather than a rejection: whether an operation needs one is the
//! lifecycle's decision.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use questline_domain::Principal;

use super::http::ApiError;
use crate::infrastructure::ports::PrincipalProvider;
use crate::use_cases::lifecycle::ResourceError;

/// Session lookup handed to the extractor through router state.
#[derive(Clone)]
pub struct SessionLookup(pub Arc<dyn PrincipalProvider>);

/// The calling principal, if any.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for MaybePrincipal
where
    SessionLookup: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybePrincipal(None));
        };

        let SessionLookup(provider) = SessionLookup::from_ref(state);
        match provider.principal_for_token(token).await {
            Ok(principal) => {
                if principal.is_none() {
                    tracing::debug!("Unknown bearer token");
                }
                Ok(MaybePrincipal(principal))
            }
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                Err(ResourceError::Store(e).into())
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

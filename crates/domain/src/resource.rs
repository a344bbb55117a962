//! The capability contract every stored document type implements.
//!
//! Adventures, characters and files share one lifecycle. Everything that
//! differs between them (identifier scheme, ownership, how a payload becomes
//! an entity) is expressed here.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ids::UserId;
use crate::principal::Principal;
use crate::value_objects::ShortId;

/// System-assigned identity of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity<Id> {
    pub id: Id,
    pub short_id: Option<ShortId>,
    pub owner: Option<UserId>,
}

impl<Id> Identity<Id> {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            short_id: None,
            owner: None,
        }
    }

    pub fn with_short_id(mut self, short_id: ShortId) -> Self {
        self.short_id = Some(short_id);
        self
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }
}

pub trait Resource:
    Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Primary identifier.
    type Id: Clone + Debug + Display + Eq + Hash + Send + Sync + 'static;

    /// Client-supplied content, without any identity.
    type Draft: Clone + Send + Sync + 'static;

    /// Namespace used in storage and logs.
    const KIND: &'static str;

    /// Whether documents carry a short secondary identifier.
    const HAS_SHORT_ID: bool;

    /// Payload keys clients must never control.
    const IDENTITY_FIELDS: &'static [&'static str];

    /// Interprets a path token as a primary identifier.
    ///
    /// Malformed tokens yield `None` rather than an error.
    fn parse_id(token: &str) -> Option<Self::Id>;

    /// Mints a fresh primary identifier from random `seed`.
    fn mint_id(seed: Uuid, draft: &Self::Draft) -> Result<Self::Id, DomainError>;

    fn identity(&self) -> Identity<Self::Id>;

    fn set_identity(&mut self, identity: Identity<Self::Id>);

    /// Builds a new document from its identity and client content.
    fn assemble(identity: Identity<Self::Id>, draft: Self::Draft) -> Result<Self, DomainError>;

    /// Restores everything about `original` a client may not change.
    fn inherit(&mut self, original: &Self) {
        self.set_identity(original.identity());
    }

    /// Entity invariants beyond what deserialization already guarantees.
    fn validate(&self) -> Result<(), DomainError> {
        Ok(())
    }

    /// Attribute dependency codes that nothing on the sheet defines.
    ///
    /// Reported, never enforced.
    fn unresolved_dependencies(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn is_owned_by(&self, principal: &Principal) -> bool;
}

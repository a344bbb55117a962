//! Adventure entity - A campaign run by one gamemaster

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ids::{AdventureId, UserId};
use crate::principal::Principal;
use crate::resource::{Identity, Resource};
use crate::value_objects::{validate_sheet, AdventureName, CharTemplate, ShortId};

fn default_active() -> bool {
    true
}

/// An adventure and the character-sheet template its characters follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adventure {
    #[serde(default)]
    pub id: AdventureId,
    #[serde(default)]
    pub short_id: Option<ShortId>,
    /// Owning principal
    #[serde(default)]
    pub gamemaster: UserId,
    pub name: AdventureName,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// File URL of the list picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adventure_pic: Option<String>,
    /// File URL of the banner picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adventure_header_pic: Option<String>,
    #[serde(default)]
    pub char_template: CharTemplate,
}

/// Client-supplied adventure content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdventureDraft {
    pub name: AdventureName,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub adventure_pic: Option<String>,
    #[serde(default)]
    pub adventure_header_pic: Option<String>,
    #[serde(default)]
    pub char_template: CharTemplate,
}

impl AdventureDraft {
    pub fn new(name: AdventureName) -> Self {
        Self {
            name,
            description: String::new(),
            active: true,
            adventure_pic: None,
            adventure_header_pic: None,
            char_template: CharTemplate::default(),
        }
    }

    pub fn with_template(mut self, char_template: CharTemplate) -> Self {
        self.char_template = char_template;
        self
    }
}

impl Resource for Adventure {
    type Id = AdventureId;
    type Draft = AdventureDraft;

    const KIND: &'static str = "adventure";
    const HAS_SHORT_ID: bool = true;
    const IDENTITY_FIELDS: &'static [&'static str] = &[
        "id",
        "_id",
        "shortId",
        "short_id",
        "gamemaster",
        "_gamemaster",
    ];

    fn parse_id(token: &str) -> Option<Self::Id> {
        token.parse().ok()
    }

    fn mint_id(seed: Uuid, _draft: &Self::Draft) -> Result<Self::Id, DomainError> {
        Ok(AdventureId::from_uuid(seed))
    }

    fn identity(&self) -> Identity<Self::Id> {
        Identity {
            id: self.id,
            short_id: self.short_id.clone(),
            owner: Some(self.gamemaster),
        }
    }

    fn set_identity(&mut self, identity: Identity<Self::Id>) {
        self.id = identity.id;
        self.short_id = identity.short_id;
        if let Some(owner) = identity.owner {
            self.gamemaster = owner;
        }
    }

    fn assemble(identity: Identity<Self::Id>, draft: Self::Draft) -> Result<Self, DomainError> {
        let gamemaster = identity
            .owner
            .ok_or_else(|| DomainError::validation("Adventure requires a gamemaster"))?;
        Ok(Self {
            id: identity.id,
            short_id: identity.short_id,
            gamemaster,
            name: draft.name,
            description: draft.description,
            active: draft.active,
            adventure_pic: draft.adventure_pic,
            adventure_header_pic: draft.adventure_header_pic,
            char_template: draft.char_template,
        })
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_sheet(&self.char_template.stats, &self.char_template.attributes)
    }

    fn unresolved_dependencies(&self) -> BTreeSet<String> {
        self.char_template.unresolved_dependencies()
    }

    fn is_owned_by(&self, principal: &Principal) -> bool {
        principal.owns_adventure(&self.id)
    }
}

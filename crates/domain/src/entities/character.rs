//! Character entity - A player's character, optionally attached to an adventure

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ids::{AdventureId, CharacterId, UserId};
use crate::principal::Principal;
use crate::resource::{Identity, Resource};
use crate::value_objects::{
    unresolved_dependencies, validate_sheet, AttributeDefinition, InventoryItem, ShortId,
    StatDefinition,
};

fn default_active() -> bool {
    true
}

/// A character sheet.
///
/// Stats and attributes are independent copies of the adventure's template,
/// not references into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default)]
    pub id: CharacterId,
    #[serde(default)]
    pub short_id: Option<ShortId>,
    #[serde(default)]
    pub owner: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adventure: Option<AdventureId>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default)]
    pub attribute_points: u32,
    /// File URL of the portrait
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    #[serde(default)]
    pub stats: Vec<StatDefinition>,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
}

/// Client-supplied character content.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterDraft {
    #[serde(alias = "_adventure")]
    pub adventure: Option<AdventureId>,
    pub active: Option<bool>,
    pub name: String,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub profession: Option<String>,
    pub age: Option<String>,
    pub biography: Option<String>,
    pub attribute_points: u32,
    pub portrait: Option<String>,
    pub stats: Vec<StatDefinition>,
    pub attributes: Vec<AttributeDefinition>,
    pub inventory: Vec<InventoryItem>,
}

impl Resource for Character {
    type Id = CharacterId;
    type Draft = CharacterDraft;

    const KIND: &'static str = "character";
    const HAS_SHORT_ID: bool = true;
    const IDENTITY_FIELDS: &'static [&'static str] =
        &["id", "_id", "shortId", "short_id", "owner", "_owner"];

    fn parse_id(token: &str) -> Option<Self::Id> {
        token.parse().ok()
    }

    fn mint_id(seed: Uuid, _draft: &Self::Draft) -> Result<Self::Id, DomainError> {
        Ok(CharacterId::from_uuid(seed))
    }

    fn identity(&self) -> Identity<Self::Id> {
        Identity {
            id: self.id,
            short_id: self.short_id.clone(),
            owner: Some(self.owner),
        }
    }

    fn set_identity(&mut self, identity: Identity<Self::Id>) {
        self.id = identity.id;
        self.short_id = identity.short_id;
        if let Some(owner) = identity.owner {
            self.owner = owner;
        }
    }

    fn assemble(identity: Identity<Self::Id>, draft: Self::Draft) -> Result<Self, DomainError> {
        let owner = identity
            .owner
            .ok_or_else(|| DomainError::validation("Character requires an owner"))?;
        Ok(Self {
            id: identity.id,
            short_id: identity.short_id,
            owner,
            adventure: draft.adventure,
            active: draft.active.unwrap_or(true),
            name: draft.name,
            gender: draft.gender,
            race: draft.race,
            profession: draft.profession,
            age: draft.age,
            biography: draft.biography,
            attribute_points: draft.attribute_points,
            portrait: draft.portrait,
            stats: draft.stats,
            attributes: draft.attributes,
            inventory: draft.inventory,
        })
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_sheet(&self.stats, &self.attributes)?;
        if let Some(item) = self
            .inventory
            .iter()
            .find(|item| item.weight.is_some_and(|w| !w.is_finite() || w < 0.0))
        {
            return Err(DomainError::validation(format!(
                "Inventory item '{}' has an invalid weight",
                item.name
            )));
        }
        Ok(())
    }

    fn unresolved_dependencies(&self) -> BTreeSet<String> {
        unresolved_dependencies(&self.attributes)
    }

    fn is_owned_by(&self, principal: &Principal) -> bool {
        principal.owns_character(&self.id)
    }
}

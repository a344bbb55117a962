//! Authenticated actors and their roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::{AdventureId, CharacterId, UserId};

/// Role of a principal.
///
/// Roles are ordered: a role satisfies every requirement at or below it, so
/// `Admin` satisfies any requirement and `User` does not satisfy `Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::parse(format!("Unknown role: {}", other))),
        }
    }
}

/// The actor performing an operation, with the documents it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub adventures: BTreeSet<AdventureId>,
    #[serde(default)]
    pub characters: BTreeSet<CharacterId>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            adventures: BTreeSet::new(),
            characters: BTreeSet::new(),
        }
    }

    pub fn with_adventure(mut self, id: AdventureId) -> Self {
        self.adventures.insert(id);
        self
    }

    pub fn with_character(mut self, id: CharacterId) -> Self {
        self.characters.insert(id);
        self
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role.satisfies(required)
    }

    pub fn owns_adventure(&self, id: &AdventureId) -> bool {
        self.adventures.contains(id)
    }

    pub fn owns_character(&self, id: &CharacterId) -> bool {
        self.characters.contains(id)
    }
}

//! Character-sheet building blocks shared by adventures and characters.
//!
//! An adventure carries a template (stats + attributes); a character carries
//! its own independent copy of the same structures plus an inventory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Dice a player rolls against an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiceType {
    W4,
    W6,
    W8,
    W10,
    W12,
    W20,
}

impl DiceType {
    pub const ALL: [DiceType; 6] = [
        DiceType::W4,
        DiceType::W6,
        DiceType::W8,
        DiceType::W10,
        DiceType::W12,
        DiceType::W20,
    ];

    /// Number of faces on the die.
    pub fn sides(self) -> u8 {
        match self {
            DiceType::W4 => 4,
            DiceType::W6 => 6,
            DiceType::W8 => 8,
            DiceType::W10 => 10,
            DiceType::W12 => 12,
            DiceType::W20 => 20,
        }
    }
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.sides())
    }
}

impl FromStr for DiceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceType::ALL
            .into_iter()
            .find(|dice| dice.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::parse(format!("Unknown dice type: {}", s)))
    }
}

/// Stats change over the course of play (health, mana, initiative).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatDefinition {
    pub name: String,
    pub max: Option<f64>,
    pub current: Option<f64>,
}

fn default_level_factor() -> f64 {
    1.0
}

/// Attributes are grouped by category and may depend on other attributes'
/// codes (e.g. "Mechanik" depends on GE, GE, IN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(default, alias = "dices", skip_serializing_if = "Option::is_none")]
    pub dice: Option<DiceType>,
    #[serde(default = "default_level_factor", alias = "levelfactor")]
    pub level_factor: f64,
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            code: None,
            dependencies: Vec::new(),
            value: 0.0,
            dice: None,
            level_factor: default_level_factor(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryItem {
    pub name: String,
    pub weight: Option<f64>,
    pub equipped: bool,
}

/// Stats and attributes an adventure prescribes for its characters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharTemplate {
    pub stats: Vec<StatDefinition>,
    pub attributes: Vec<AttributeDefinition>,
}

impl CharTemplate {
    /// Dependency codes that no attribute in this template defines.
    pub fn unresolved_dependencies(&self) -> BTreeSet<String> {
        unresolved_dependencies(&self.attributes)
    }
}

/// Dependency codes referenced by `attributes` but defined by none of them.
pub fn unresolved_dependencies(attributes: &[AttributeDefinition]) -> BTreeSet<String> {
    let defined: BTreeSet<&str> = attributes
        .iter()
        .filter_map(|a| a.code.as_deref())
        .collect();
    attributes
        .iter()
        .flat_map(|a| a.dependencies.iter())
        .filter(|code| !defined.contains(code.as_str()))
        .cloned()
        .collect()
}

/// Checks numeric sanity of stats and attributes.
pub fn validate_sheet(
    stats: &[StatDefinition],
    attributes: &[AttributeDefinition],
) -> Result<(), DomainError> {
    for stat in stats {
        if let (Some(max), Some(current)) = (stat.max, stat.current) {
            if !max.is_finite() || !current.is_finite() {
                return Err(DomainError::validation(format!(
                    "Stat '{}' must have finite values",
                    stat.name
                )));
            }
        }
    }
    for attribute in attributes {
        if !attribute.value.is_finite() || !attribute.level_factor.is_finite() {
            return Err(DomainError::validation(format!(
                "Attribute '{}' must have finite values",
                attribute.name
            )));
        }
    }
    Ok(())
}

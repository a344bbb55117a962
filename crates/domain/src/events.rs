//! Notifications emitted after a document was saved or removed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What happened to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Save,
    Remove,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Save => "save",
            Verb::Remove => "remove",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription key on a per-kind event bus.
///
/// Displays as `save` for the unscoped topic and `save:<id>` for the
/// entity-scoped one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    All(Verb),
    Entity(Verb, String),
}

impl Topic {
    pub fn verb(&self) -> Verb {
        match self {
            Topic::All(verb) | Topic::Entity(verb, _) => *verb,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::All(verb) => write!(f, "{}", verb),
            Topic::Entity(verb, id) => write!(f, "{}:{}", verb, id),
        }
    }
}

/// A durable state change of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
    pub kind: String,
    pub verb: Verb,
    pub entity_id: String,
    /// JSON form of the document as persisted (or as it was before removal).
    pub document: Value,
}

impl ResourceEvent {
    pub fn new(kind: impl Into<String>, verb: Verb, entity_id: impl Into<String>, document: Value) -> Self {
        Self {
            kind: kind.into(),
            verb,
            entity_id: entity_id.into(),
            document,
        }
    }

    /// Topics this event is delivered to, scoped first.
    pub fn topics(&self) -> [Topic; 2] {
        [
            Topic::Entity(self.verb, self.entity_id.clone()),
            Topic::All(self.verb),
        ]
    }
}

//! Questline domain: campaign documents, their value objects and the
//! capability contract the resource lifecycle is generic over.

pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod principal;
pub mod resource;
pub mod value_objects;

pub use entities::{
    Adventure, AdventureDraft, Character, CharacterDraft, FileUpload, StoredFile,
    DEFAULT_CONTENT_TYPE,
};
pub use error::DomainError;
pub use events::{ResourceEvent, Topic, Verb};
pub use ids::{AdventureId, CharacterId, UserId};
pub use principal::{Principal, Role};
pub use resource::{Identity, Resource};
pub use value_objects::{
    AdventureName, AttributeDefinition, CharTemplate, DiceType, FileName, InventoryItem, ShortId,
    StatDefinition, FILE_URL_PREFIX, MAX_SHORT_ID_LENGTH, MIN_SHORT_ID_LENGTH,
};

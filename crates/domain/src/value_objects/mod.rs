//! Value objects - Immutable objects defined by their attributes

mod char_template;
mod names;
mod short_id;

pub use char_template::{
    unresolved_dependencies, validate_sheet, AttributeDefinition, CharTemplate, DiceType,
    InventoryItem, StatDefinition,
};
pub use names::{AdventureName, FileName, FILE_URL_PREFIX};
pub use short_id::{ShortId, MAX_SHORT_ID_LENGTH, MIN_SHORT_ID_LENGTH, SHORT_ID_ALPHABET};

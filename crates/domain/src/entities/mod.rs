//! Entities - Documents with a system-assigned identity

mod adventure;
mod character;
mod stored_file;

pub use adventure::{Adventure, AdventureDraft};
pub use character::{Character, CharacterDraft};
pub use stored_file::{FileUpload, StoredFile, DEFAULT_CONTENT_TYPE};

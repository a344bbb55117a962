//! SQLite persistence adapters
//!
//! Documents (adventures, characters) share one table keyed by kind; files and
//! sessions have their own tables in the same database.

mod connection;
mod document_store;
mod file_store;
mod hooks;
mod session_store;

pub use connection::SqliteConnection;
pub use document_store::SqliteDocumentStore;
pub use file_store::{SqliteFileStore, PICTURE_FIELDS};
pub use hooks::HookRegistry;
pub use session_store::SqliteSessionStore;

//! Questline Engine library.
//!
//! Server-side code for the Questline campaign manager.
//!
//! ## Structure
//!
//! - `use_cases/` - The resource lifecycle shared by adventures, characters and files
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;

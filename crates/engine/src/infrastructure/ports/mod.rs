//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Document and blob storage (could swap SQLite -> MongoDB/GridFS)
//! - Session lookup (could swap local sessions -> external identity provider)
//! - Clock/Random (for testing)

mod error;
mod repos;
mod testing;

pub use error::RepoError;

// =============================================================================
// Storage Ports
// =============================================================================
pub use repos::{PersistHook, PrincipalProvider, ResourceStore, Upserted};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::MockPrincipalProvider;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

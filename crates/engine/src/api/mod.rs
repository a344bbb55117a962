//! API layer - HTTP entry points.

pub mod auth;
pub mod files;
pub mod http;

//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod event_bus;
pub mod listeners;
pub mod persistence;
pub mod ports;

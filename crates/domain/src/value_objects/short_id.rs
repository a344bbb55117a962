//! Short, human-friendly secondary identifiers.
//!
//! A short id lives next to the primary UUID of a document. It is assigned once
//! at creation, never changes, and is unique per resource kind. Generation is
//! driven by an injected index source so the domain stays free of RNG state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Minimum accepted length of a short id.
pub const MIN_SHORT_ID_LENGTH: usize = 7;

/// Maximum accepted length of a short id.
///
/// Kept well below the 36 characters of a hyphenated UUID so a short id can
/// never be mistaken for a primary identifier.
pub const MAX_SHORT_ID_LENGTH: usize = 24;

/// Alphabet used for generated ids (no 0/O, 1/l/I look-alikes).
pub const SHORT_ID_ALPHABET: &[u8] =
    b"23456789abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortId(String);

impl ShortId {
    /// Validates an existing short id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidId` unless the value is 7..=24 ASCII
    /// alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let len = value.len();
        if !(MIN_SHORT_ID_LENGTH..=MAX_SHORT_ID_LENGTH).contains(&len) {
            return Err(DomainError::invalid_id(format!(
                "short id must be {}..={} characters, got {}",
                MIN_SHORT_ID_LENGTH, MAX_SHORT_ID_LENGTH, len
            )));
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DomainError::invalid_id(format!(
                "short id must be alphanumeric: {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Builds a fresh short id of `length` characters.
    ///
    /// `pick` receives the alphabet size and must return an index below it.
    pub fn generate(
        length: usize,
        mut pick: impl FnMut(usize) -> usize,
    ) -> Result<Self, DomainError> {
        let value: String = (0..length)
            .map(|_| {
                let idx = pick(SHORT_ID_ALPHABET.len()) % SHORT_ID_ALPHABET.len();
                SHORT_ID_ALPHABET[idx] as char
            })
            .collect();
        Self::new(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ShortId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ShortId> for String {
    fn from(id: ShortId) -> String {
        id.0
    }
}

//! Validated name newtypes for domain entities
//!
//! These newtypes ensure that names are valid by construction:
//! - Non-empty
//! - Within length limits
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for name fields
const MAX_NAME_LENGTH: usize = 200;

/// Maximum length for a stored filename
const MAX_FILE_NAME_LENGTH: usize = 255;

// ============================================================================
// AdventureName
// ============================================================================

/// A validated adventure name (non-empty, <=200 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdventureName(String);

impl AdventureName {
    /// Create a new validated adventure name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The name is empty after trimming
    /// - The name exceeds 200 characters after trimming
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Adventure name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Adventure name cannot exceed {} characters",
                MAX_NAME_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdventureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AdventureName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AdventureName> for String {
    fn from(name: AdventureName) -> String {
        name.0
    }
}

// ============================================================================
// FileName
// ============================================================================

/// Name of a blob in the file store.
///
/// Filenames are path segments, so separators and dot-only names are refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Create a new validated filename.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidId` if the name is empty, longer than
    /// 255 bytes, contains a path separator or control character, or is
    /// `.` / `..`.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_FILE_NAME_LENGTH {
            return Err(DomainError::invalid_id(format!(
                "filename must be 1..={} bytes",
                MAX_FILE_NAME_LENGTH
            )));
        }
        if name == "." || name == ".." {
            return Err(DomainError::invalid_id("filename cannot be a dot segment"));
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(DomainError::invalid_id(format!(
                "filename contains forbidden characters: {}",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public URL under which the file is served.
    pub fn url(&self) -> String {
        format!("{}{}", FILE_URL_PREFIX, self.0)
    }

    /// Extracts the filename from a file URL produced by [`FileName::url`].
    ///
    /// Returns `None` for external URLs or anything that is not a valid name.
    pub fn from_url(url: &str) -> Option<Self> {
        url.strip_prefix(FILE_URL_PREFIX)
            .and_then(|rest| Self::new(rest).ok())
    }
}

/// Route prefix under which stored files are served.
pub const FILE_URL_PREFIX: &str = "/api/files/";

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> String {
        name.0
    }
}

//! Stored file entity - A named binary blob (portraits, adventure pictures)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::DomainError;
use crate::principal::Principal;
use crate::resource::{Identity, Resource};
use crate::value_objects::FileName;

/// Longest extension carried over from an uploaded filename.
const MAX_EXTENSION_LENGTH: usize = 10;

/// Content type assumed when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A blob and its metadata. The bytes are never part of the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: FileName,
    #[serde(default)]
    pub url: String,
    pub content_type: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// An upload waiting to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    /// Name the client sent, used only for its extension.
    pub original_name: Option<String>,
    pub content_type: String,
    pub content: Vec<u8>,
    pub metadata: Map<String, Value>,
    pub received_at: DateTime<Utc>,
}

impl FileUpload {
    pub fn new(content_type: Option<String>, content: Vec<u8>, received_at: DateTime<Utc>) -> Self {
        Self {
            original_name: None,
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            content,
            metadata: Map::new(),
            received_at,
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    /// Lowercased alphanumeric extension of the uploaded name, including the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.original_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty()
            || ext.is_empty()
            || ext.len() > MAX_EXTENSION_LENGTH
            || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Whether `content_type` is `type/subtype[; params]` and safe as a header value.
fn is_valid_content_type(content_type: &str) -> bool {
    if !content_type
        .bytes()
        .all(|b| b == b' ' || b == b'\t' || b.is_ascii_graphic())
    {
        return false;
    }
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
    };
    is_token(kind) && is_token(subtype)
}

impl Resource for StoredFile {
    type Id = FileName;
    type Draft = FileUpload;

    const KIND: &'static str = "file";
    const HAS_SHORT_ID: bool = false;
    const IDENTITY_FIELDS: &'static [&'static str] =
        &["_id", "id", "filename", "url", "length", "uploadDate"];

    fn parse_id(token: &str) -> Option<Self::Id> {
        FileName::new(token).ok()
    }

    fn mint_id(seed: Uuid, draft: &Self::Draft) -> Result<Self::Id, DomainError> {
        let extension = draft.extension().unwrap_or_default();
        FileName::new(format!("{}{}", seed.simple(), extension))
    }

    fn identity(&self) -> Identity<Self::Id> {
        Identity::new(self.filename.clone())
    }

    fn set_identity(&mut self, identity: Identity<Self::Id>) {
        self.url = identity.id.url();
        self.filename = identity.id;
    }

    fn assemble(identity: Identity<Self::Id>, draft: Self::Draft) -> Result<Self, DomainError> {
        Ok(Self {
            url: identity.id.url(),
            filename: identity.id,
            content_type: draft.content_type,
            length: draft.content.len() as u64,
            upload_date: draft.received_at,
            metadata: draft.metadata,
            content: draft.content,
        })
    }

    fn inherit(&mut self, original: &Self) {
        self.set_identity(original.identity());
        self.length = original.length;
        self.upload_date = original.upload_date;
        self.content = original.content.clone();
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.content_type.trim().is_empty() {
            return Err(DomainError::validation("File content type cannot be empty"));
        }
        if !is_valid_content_type(&self.content_type) {
            return Err(DomainError::validation(format!(
                "Invalid content type '{}'",
                self.content_type.escape_debug()
            )));
        }
        Ok(())
    }

    /// Files carry no owner; access is role-based only.
    fn is_owned_by(&self, _principal: &Principal) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> FileUpload {
        FileUpload::new(Some("image/jpeg".into()), vec![1, 2, 3], Utc::now()).with_original_name(name)
    }

    #[test]
    fn minted_name_keeps_sanitized_extension() {
        let seed = Uuid::nil();
        let name = StoredFile::mint_id(seed, &upload("Portrait.JPG")).expect("mint");
        assert_eq!(name.as_str(), "00000000000000000000000000000000.jpg");

        let bare = StoredFile::mint_id(seed, &upload("../../evil.p/hp")).expect("mint");
        assert_eq!(bare.as_str(), "00000000000000000000000000000000");
    }

    #[test]
    fn content_type_defaults_to_octet_stream() {
        let upload = FileUpload::new(None, Vec::new(), Utc::now());
        assert_eq!(upload.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn json_form_omits_bytes() {
        let name = FileName::new("a.jpg").expect("name");
        let file = StoredFile::assemble(Identity::new(name), upload("a.jpg")).expect("assemble");
        let value = serde_json::to_value(&file).expect("serialize");
        assert_eq!(value["url"], "/api/files/a.jpg");
        assert_eq!(value["length"], 3);
        assert!(value.get("content").is_none());
    }

    #[test]
    fn content_type_must_be_a_header_safe_media_type() {
        let name = FileName::new("a.txt").expect("name");
        let mut file = StoredFile::assemble(Identity::new(name), upload("a.txt")).expect("assemble");

        for valid in ["text/plain", "text/plain; charset=utf-8", "application/vnd.api+json"] {
            file.content_type = valid.into();
            assert!(file.validate().is_ok(), "{valid}");
        }
        for invalid in ["text/plain\nX-Evil: 1", "plain", "text/", "/plain", "image/p\u{e9}ng"] {
            file.content_type = invalid.into();
            assert!(
                matches!(file.validate(), Err(DomainError::Validation(_))),
                "{invalid:?}"
            );
        }
    }

    #[test]
    fn inherit_keeps_bytes_and_length() {
        let name = FileName::new("a.jpg").expect("name");
        let original = StoredFile::assemble(Identity::new(name), upload("a.jpg")).expect("assemble");

        let mut patched: StoredFile =
            serde_json::from_value(serde_json::to_value(&original).expect("serialize"))
                .expect("deserialize");
        patched.content_type = "image/png".into();
        patched.length = 99;
        patched.inherit(&original);

        assert_eq!(patched.content, vec![1, 2, 3]);
        assert_eq!(patched.length, 3);
        assert_eq!(patched.content_type, "image/png");
    }
}

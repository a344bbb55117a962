//! Identifier stripping for create and replace payloads.
//!
//! Identity is always system-assigned. Any identity key a client sends is
//! removed before the payload is decoded, so a payload can never name or take
//! over another entity's identifiers.

use questline_domain::Resource;
use serde_json::Value;

use super::error::ResourceError;

pub fn strip_identifiers<R: Resource>(payload: Value) -> Result<Value, ResourceError> {
    let Value::Object(mut fields) = payload else {
        return Err(ResourceError::validation(format!(
            "{} payload must be a JSON object",
            R::KIND
        )));
    };

    let stripped: Vec<&str> = R::IDENTITY_FIELDS
        .iter()
        .copied()
        .filter(|key| fields.remove(*key).is_some())
        .collect();
    if !stripped.is_empty() {
        tracing::debug!(kind = R::KIND, fields = ?stripped, "Stripped client-supplied identifiers");
    }

    Ok(Value::Object(fields))
}

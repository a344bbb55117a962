//! RFC 6902 patch application.
//!
//! Operations run in request order on a JSON copy of the entity. Nothing is
//! returned unless the whole batch applied and the result is a valid entity,
//! so a failed batch never reaches the store.

use json_patch::Patch;
use questline_domain::Resource;
use serde_json::Value;

use super::error::ResourceError;

/// Parses a patch document (a JSON array of operations).
pub fn parse_patch(operations: Value) -> Result<Patch, ResourceError> {
    if !operations.is_array() {
        return Err(ResourceError::patch("patch document must be an array of operations"));
    }
    serde_json::from_value(operations)
        .map_err(|e| ResourceError::patch(format!("malformed patch document: {e}")))
}

/// Applies `patch` to a copy of `original`.
///
/// Identity and other server-owned fields are restored from `original`
/// afterwards, whatever the patch did to them.
pub fn apply_patch<R: Resource>(original: &R, patch: &Patch) -> Result<R, ResourceError> {
    let mut document = serde_json::to_value(original)
        .map_err(|e| ResourceError::patch(format!("entity is not patchable: {e}")))?;

    json_patch::patch(&mut document, patch).map_err(ResourceError::patch)?;

    let mut patched: R = serde_json::from_value(document).map_err(ResourceError::validation)?;
    patched.inherit(original);
    patched.validate()?;
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_domain::{
        Adventure, AdventureDraft, AdventureId, AdventureName, CharTemplate, Identity, ShortId,
        UserId,
    };
    use serde_json::json;

    fn adventure() -> Adventure {
        let template: CharTemplate = serde_json::from_value(json!({
            "stats": [{"name": "Health", "max": 10, "current": 10}],
            "attributes": [{"name": "ST"}, {"name": "GE"}, {"name": "IN"}]
        }))
        .expect("template");
        let identity = Identity::new(AdventureId::new())
            .with_short_id(ShortId::new("abcdefgh").expect("short id"))
            .with_owner(UserId::new());
        let draft =
            AdventureDraft::new(AdventureName::new("New Adventure").expect("name")).with_template(template);
        Adventure::assemble(identity, draft).expect("assemble")
    }

    fn ops(value: Value) -> Patch {
        parse_patch(value).expect("parse")
    }

    #[test]
    fn replaces_name_and_keeps_template() {
        let original = adventure();
        let patched = apply_patch(
            &original,
            &ops(json!([{"op": "replace", "path": "/name", "value": "Patched Adventure"}])),
        )
        .expect("apply");

        assert_eq!(patched.name.as_str(), "Patched Adventure");
        assert_eq!(patched.char_template.stats.len(), 1);
        assert_eq!(patched.char_template.attributes.len(), 3);
    }

    #[test]
    fn later_operations_see_earlier_ones() {
        let original = adventure();
        let patched = apply_patch(
            &original,
            &ops(json!([
                {"op": "add", "path": "/charTemplate/attributes/-", "value": {"name": "CH", "code": "CH"}},
                {"op": "copy", "from": "/charTemplate/attributes/3/name", "path": "/description"},
                {"op": "test", "path": "/description", "value": "CH"}
            ])),
        )
        .expect("apply");

        assert_eq!(patched.char_template.attributes.len(), 4);
        assert_eq!(patched.char_template.attributes[3].level_factor, 1.0);
        assert_eq!(patched.description, "CH");
    }

    #[test]
    fn missing_path_fails_the_whole_batch() {
        let original = adventure();
        let before = serde_json::to_value(&original).expect("serialize");
        let err = apply_patch(
            &original,
            &ops(json!([
                {"op": "replace", "path": "/name", "value": "Half Applied"},
                {"op": "replace", "path": "/doesNotExist", "value": 1}
            ])),
        )
        .unwrap_err();

        assert!(matches!(err, ResourceError::Patch(_)));
        assert_eq!(serde_json::to_value(&original).expect("serialize"), before);
    }

    #[test]
    fn failed_test_operation_is_a_patch_error() {
        let err = apply_patch(
            &adventure(),
            &ops(json!([{"op": "test", "path": "/name", "value": "Other"}])),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::Patch(_)));
    }

    #[test]
    fn out_of_bounds_index_is_a_patch_error() {
        let err = apply_patch(
            &adventure(),
            &ops(json!([{"op": "remove", "path": "/charTemplate/stats/5"}])),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::Patch(_)));
    }

    #[test]
    fn invalid_result_is_a_validation_error() {
        let err = apply_patch(
            &adventure(),
            &ops(json!([{"op": "replace", "path": "/name", "value": ""}])),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));

        let err = apply_patch(
            &adventure(),
            &ops(json!([{"op": "add", "path": "/charTemplate/attributes/0/dice", "value": "W7"}])),
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
    }

    #[test]
    fn identity_cannot_be_patched() {
        let original = adventure();
        let patched = apply_patch(
            &original,
            &ops(json!([
                {"op": "replace", "path": "/shortId", "value": "hijacked1"},
                {"op": "replace", "path": "/gamemaster", "value": UserId::new().to_string()}
            ])),
        )
        .expect("apply");

        assert_eq!(patched.short_id, original.short_id);
        assert_eq!(patched.gamemaster, original.gamemaster);
    }

    #[test]
    fn non_array_documents_are_rejected() {
        assert!(parse_patch(json!({"op": "replace"})).is_err());
        assert!(parse_patch(json!([{"op": "launch", "path": "/"}])).is_err());
    }
}

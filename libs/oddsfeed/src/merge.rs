//! RFC 7396 JSON merge patch.
//!
//! Fields present in the patch overwrite the target, `null` deletes, objects
//! merge recursively, arrays replace wholesale.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Apply `patch` to `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        // A non-object patch replaces the target entirely.
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                let slot = target_map.entry(key.clone()).or_insert(Value::Null);
                merge_patch(slot, value);
            }
        }
    }
}

/// Apply a merge patch to a typed value: marshal, merge, unmarshal.
pub fn apply_merge_patch<T>(original: &T, patch: &Value) -> serde_json::Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_json::to_value(original)?;
    merge_patch(&mut merged, patch);
    serde_json::from_value(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Match;
    use serde_json::json;

    #[test]
    fn overwrites_scalars_and_keeps_the_rest() {
        let mut target = json!({"id": 1, "name": "Original", "value": 100});
        merge_patch(&mut target, &json!({"name": "Updated"}));
        assert_eq!(target, json!({"id": 1, "name": "Updated", "value": 100}));
    }

    #[test]
    fn null_deletes_the_key() {
        let mut target = json!({"a": {"b": 1, "c": 2}});
        merge_patch(&mut target, &json!({"a": {"b": null}}));
        assert_eq!(target, json!({"a": {"c": 2}}));
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let mut target = json!({
            "id": 1,
            "nested": {"id": 10, "name": "Original Nested", "detail": "Original Detail"},
        });
        merge_patch(
            &mut target,
            &json!({"nested": {"id": 10, "name": "Updated Nested"}}),
        );
        assert_eq!(
            target,
            json!({
                "id": 1,
                "nested": {"id": 10, "name": "Updated Nested", "detail": "Original Detail"},
            })
        );
    }

    #[test]
    fn arrays_replace_wholesale() {
        let mut target = json!({"items": [1, 2, 3]});
        merge_patch(&mut target, &json!({"items": [9]}));
        assert_eq!(target, json!({"items": [9]}));
    }

    #[test]
    fn absent_keys_are_added() {
        let mut target = json!({"a": 1});
        merge_patch(&mut target, &json!({"b": {"c": 2}}));
        assert_eq!(target, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn non_object_patch_replaces_target() {
        let mut target = json!({"a": 1});
        merge_patch(&mut target, &json!([1, 2]));
        assert_eq!(target, json!([1, 2]));
    }

    #[test]
    fn typed_apply_preserves_unpatched_match_fields() {
        let original = Match {
            id: 42,
            best_of_x: 3,
            is_live: false,
            parent_id: 42,
            ..Default::default()
        };
        let merged: Match = apply_merge_patch(&original, &json!({"id": 42, "isLive": true})).unwrap();
        assert_eq!(merged.id, 42);
        assert_eq!(merged.best_of_x, 3);
        assert!(merged.is_live);
        assert_eq!(merged.parent_id, 42);
    }
}

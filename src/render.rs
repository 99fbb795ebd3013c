//! Canonical JSON output shared by both renderers.
//!
//! Agent configuration and definition files are pretty-printed with two-space
//! indentation and no trailing newline. Object keys keep insertion order
//! (`serde_json` is built with `preserve_order`), so the caller decides the
//! order once and every run reproduces it byte for byte.

use crate::error::Result;
use serde_json::{Map, Value};

/// Serialize an ordered JSON object into the canonical on-disk text.
pub fn to_canonical_json(object: &Map<String, Value>) -> Result<String> {
    Ok(serde_json::to_string_pretty(object)?)
}

/// Parse rendered text and serialize it again with the same algorithm.
///
/// Rendered files are stable under this operation.
pub fn recanonicalize(text: &str) -> Result<String> {
    let value: Map<String, Value> = serde_json::from_str(text)?;
    to_canonical_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_two_space_indentation() {
        let text = to_canonical_json(&object(json!({"server": true, "ports": {"dns": 8600}})))
            .unwrap();
        assert_eq!(
            text,
            "{\n  \"server\": true,\n  \"ports\": {\n    \"dns\": 8600\n  }\n}"
        );
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = Map::new();
        map.insert("zeta".to_string(), json!(1));
        map.insert("alpha".to_string(), json!(2));
        let text = to_canonical_json(&map).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
    }

    #[test]
    fn test_empty_object_and_array() {
        let text = to_canonical_json(&object(json!({"watches": {}, "start_join": []}))).unwrap();
        assert_eq!(text, "{\n  \"watches\": {},\n  \"start_join\": []\n}");
    }

    #[test]
    fn test_no_trailing_newline() {
        let text = to_canonical_json(&object(json!({"a": 1}))).unwrap();
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_recanonicalize_is_stable() {
        let text = to_canonical_json(&object(json!({
            "service": {"tags": ["master"], "port": 6379, "name": "redis"}
        })))
        .unwrap();
        assert_eq!(recanonicalize(&text).unwrap(), text);
    }

    #[test]
    fn test_recanonicalize_normalizes_compact_input() {
        let text = recanonicalize(r#"{"check":{"ttl":"30s","name":"web-api"}}"#).unwrap();
        assert_eq!(
            text,
            "{\n  \"check\": {\n    \"ttl\": \"30s\",\n    \"name\": \"web-api\"\n  }\n}"
        );
    }

    #[test]
    fn test_recanonicalize_rejects_non_object() {
        assert!(recanonicalize("[1, 2]").is_err());
    }
}

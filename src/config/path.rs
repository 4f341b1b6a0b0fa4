//! Dotted key-path access into config objects.
//!
//! An exact top-level key always wins over a dotted walk, so a key literally
//! named `"a.b"` is still addressable.

use serde_json::{Map, Value};

/// Read the value at `key`.
pub fn get_path<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    let map = config.as_object()?;
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    if !key.contains('.') {
        return None;
    }
    key.split('.')
        .try_fold(config, |current, segment| current.as_object()?.get(segment))
}

/// Whether `key` exists, regardless of its value (`0`, `false`, `""` and
/// `null` all count).
pub fn has_path(config: &Value, key: &str) -> bool {
    get_path(config, key).is_some()
}

/// Write `value` at `key`, creating intermediate objects as needed.
///
/// A non-object encountered along the way is replaced by an object.
pub fn set_path(config: &mut Map<String, Value>, key: &str, value: Value) {
    if config.contains_key(key) || !key.contains('.') {
        config.insert(key.to_string(), value);
        return;
    }

    let mut segments = key.split('.').peekable();
    let mut current = config;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_top_level_and_nested() {
        let config = json!({"a": 1, "db": {"host": "x"}, "x.y": "literal"});
        assert_eq!(get_path(&config, "a"), Some(&json!(1)));
        assert_eq!(get_path(&config, "db.host"), Some(&json!("x")));
        assert_eq!(get_path(&config, "x.y"), Some(&json!("literal")));
        assert_eq!(get_path(&config, "db.port"), None);
        assert_eq!(get_path(&config, "a.b"), None);
    }

    #[test]
    fn test_has_path_counts_falsy_values() {
        let config = json!({"zero": 0, "no": false, "empty": "", "nothing": null});
        for key in ["zero", "no", "empty", "nothing"] {
            assert!(has_path(&config, key), "{key} should be present");
        }
        assert!(!has_path(&config, "absent"));
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let mut map = Map::new();
        set_path(&mut map, "db.host", json!("y"));
        set_path(&mut map, "port", json!(5432));
        assert_eq!(Value::Object(map), json!({"db": {"host": "y"}, "port": 5432}));
    }

    #[test]
    fn test_set_path_replaces_scalar_parent() {
        let mut map = json!({"db": "flat"}).as_object().cloned().unwrap_or_default();
        set_path(&mut map, "db.host", json!("y"));
        assert_eq!(Value::Object(map), json!({"db": {"host": "y"}}));
    }

    #[test]
    fn test_set_path_prefers_existing_literal_key() {
        let mut map = json!({"a.b": 1}).as_object().cloned().unwrap_or_default();
        set_path(&mut map, "a.b", json!(2));
        assert_eq!(Value::Object(map), json!({"a.b": 2}));
    }
}

//! Deep merge of configuration layers.
//!
//! Objects merge field-by-field; arrays and scalars are replaced entirely,
//! never concatenated. An absent key is "not specified"; an explicit `null`
//! is a value like any other and replaces what lies below it.

use serde_json::{Map, Value};

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans and `null` are replaced entirely
/// - Keys absent from overlay keep their base value
///
/// # Example
/// ```
/// use serde_json::json;
/// use layered_conf::config::deep_merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(
///     result,
///     json!({ "server": { "port": 9000, "host": "localhost" }, "features": ["c"] })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers by argument position: earlier layers win.
///
/// Callers list overrides first and defaults last, e.g.
/// `merge_layers([overrides, file, defaults])`. The result is always an
/// object, empty when no layer contributed one. A layer that is not an
/// object contributes nothing.
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Value {
    let layers: Vec<Value> = layers.into_iter().filter(Value::is_object).collect();
    let merged = layers
        .into_iter()
        .rev()
        .fold(Value::Object(Map::new()), deep_merge);
    match merged {
        Value::Object(_) => merged,
        _ => Value::Object(Map::new()),
    }
}

//! Environment overlay: substitute environment values into a config tree.
//!
//! For each key, depth-first, the mangled path is looked up under the prefix:
//!
//! - unset: recurse into objects, leave anything else alone
//! - set to a non-object: replace the value entirely, even a whole sub-object
//! - set to an object over an existing object: shallow merge, env keys win,
//!   and the subtree is not walked further
//! - set to an object over anything else: replace
//!
//! Arrays are never merged element-wise.
//!
//! With expansion enabled, a second pass rewrites `{{NAME}}` in every string
//! of the result, array elements and env-merged subtrees included.

use super::coerce::coerce;
use super::env::{EnvOptions, EnvSource, get_env};
use super::path::set_path;
use regex_lite::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Options for [`apply_env`].
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub env: EnvOptions,
    /// Expand `{{NAME}}` placeholders in string leaves.
    pub env_expansion: bool,
}

impl OverlayOptions {
    pub fn new(env: EnvOptions) -> Self {
        Self {
            env,
            env_expansion: false,
        }
    }

    pub fn with_expansion(mut self, enabled: bool) -> Self {
        self.env_expansion = enabled;
        self
    }
}

/// Overlay environment values onto `tree` in place and hand it back.
///
/// Takes ownership so the mutation is explicit; use [`env_layer`] to overlay
/// a copy while keeping the original.
pub fn apply_env(mut tree: Value, env: &dyn EnvSource, options: &OverlayOptions) -> Value {
    if let Value::Object(map) = &mut tree {
        apply_env_to_map(map, "", env, options);
    }
    if options.env_expansion {
        expand_strings(&mut tree, env);
    }
    tree
}

/// Overlay a clone of `tree`, leaving the input untouched.
pub fn env_layer(tree: &Value, env: &dyn EnvSource, options: &OverlayOptions) -> Value {
    apply_env(tree.clone(), env, options)
}

fn apply_env_to_map(
    map: &mut Map<String, Value>,
    parent: &str,
    env: &dyn EnvSource,
    options: &OverlayOptions,
) {
    for (key, value) in map.iter_mut() {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}.{key}")
        };

        match get_env(env, &path, &options.env) {
            None => {
                if let Value::Object(child) = value {
                    apply_env_to_map(child, &path, env, options);
                }
            }
            Some(Value::Object(env_map)) => match value {
                Value::Object(existing) => {
                    for (env_key, env_value) in env_map {
                        existing.insert(env_key, env_value);
                    }
                }
                _ => *value = Value::Object(env_map),
            },
            Some(env_value) => *value = env_value,
        }
    }
}

fn expand_strings(value: &mut Value, env: &dyn EnvSource) {
    match value {
        Value::String(text) => *text = expand_from_env(text, env),
        Value::Array(items) => items.iter_mut().for_each(|item| expand_strings(item, env)),
        Value::Object(map) => map.values_mut().for_each(|child| expand_strings(child, env)),
        _ => {}
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{(.*?)\}\}").expect("placeholder pattern is valid")
    })
}

/// Replace `{{NAME}}` with the value of `NAME`; unset names stay literal.
pub fn expand_from_env(text: &str, env: &dyn EnvSource) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    placeholder()
        .replace_all(text, |caps: &Captures| {
            env.get(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Apply explicit variable → key mappings onto `tree`.
///
/// Each mapped variable that is set is coerced and written at its key path,
/// replacing whatever was there. Iteration follows the map's ordering.
pub fn apply_env_map(tree: &mut Value, env_map: &BTreeMap<String, String>, env: &dyn EnvSource) {
    let Value::Object(map) = tree else {
        return;
    };
    for (var, key) in env_map {
        if let Some(raw) = env.get(var) {
            set_path(map, key, coerce(&raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::MapEnv;
    use serde_json::json;

    fn options() -> OverlayOptions {
        OverlayOptions::new(EnvOptions::new("APP_CONFIG_"))
    }

    fn database() -> Value {
        json!({"database": {"host": "x", "port": 1}})
    }

    #[test]
    fn test_nested_path_overlay() {
        let env = MapEnv::from_pairs([("APP_CONFIG_DATABASE_HOST", "y")]);
        let result = apply_env(database(), &env, &options());
        assert_eq!(result, json!({"database": {"host": "y", "port": 1}}));
    }

    #[test]
    fn test_object_value_merges() {
        let env = MapEnv::from_pairs([("APP_CONFIG_DATABASE", r#"{"host":"z","ssl":true}"#)]);
        let result = apply_env(database(), &env, &options());
        assert_eq!(result, json!({"database": {"host": "z", "port": 1, "ssl": true}}));
    }

    #[test]
    fn test_object_value_short_circuits_nested_lookup() {
        let env = MapEnv::from_pairs([
            ("APP_CONFIG_DATABASE", r#"{"ssl":true}"#),
            ("APP_CONFIG_DATABASE_HOST", "ignored"),
        ]);
        let result = apply_env(database(), &env, &options());
        assert_eq!(result, json!({"database": {"host": "x", "port": 1, "ssl": true}}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let env = MapEnv::from_pairs([("APP_CONFIG_DATABASE", "plain-string")]);
        let result = apply_env(database(), &env, &options());
        assert_eq!(result, json!({"database": "plain-string"}));
    }

    #[test]
    fn test_object_replaces_scalar() {
        let env = MapEnv::from_pairs([("APP_CONFIG_MODE", r#"{"a":1}"#)]);
        let result = apply_env(json!({"mode": "simple"}), &env, &options());
        assert_eq!(result, json!({"mode": {"a": 1}}));
    }

    #[test]
    fn test_array_replaced_wholesale() {
        let env = MapEnv::from_pairs([("APP_CONFIG_ITEMS", "[9]")]);
        let result = apply_env(json!({"items": [1, 2, 3]}), &env, &options());
        assert_eq!(result, json!({"items": [9]}));

        let env = MapEnv::from_pairs([("APP_CONFIG_ITEMS", r#"{"0":"x"}"#)]);
        let result = apply_env(json!({"items": [1, 2, 3]}), &env, &options());
        assert_eq!(result, json!({"items": {"0": "x"}}));
    }

    #[test]
    fn test_camel_case_keys() {
        let env = MapEnv::from_pairs([("APP_CONFIG_SERVER_MAX_CONNECTIONS", "64")]);
        let result = apply_env(json!({"server": {"maxConnections": 8}}), &env, &options());
        assert_eq!(result, json!({"server": {"maxConnections": 64}}));
    }

    #[test]
    fn test_env_layer_leaves_input() {
        let env = MapEnv::from_pairs([("APP_CONFIG_DATABASE_HOST", "y")]);
        let original = database();
        let layer = env_layer(&original, &env, &options());
        assert_eq!(original, database());
        assert_eq!(layer["database"]["host"], json!("y"));
    }

    #[test]
    fn test_expansion_in_untouched_leaves() {
        let env = MapEnv::from_pairs([("HOME_DIR", "/home/me")]);
        let tree = json!({"paths": {"data": "{{HOME_DIR}}/data", "cache": "{{UNSET}}/cache"}, "n": 1});
        let result = apply_env(tree, &env, &options().with_expansion(true));
        assert_eq!(
            result,
            json!({"paths": {"data": "/home/me/data", "cache": "{{UNSET}}/cache"}, "n": 1})
        );
    }

    #[test]
    fn test_expansion_applies_to_env_values() {
        let env = MapEnv::from_pairs([("APP_CONFIG_URL", "http://{{HOST}}:80"), ("HOST", "h")]);
        let result = apply_env(json!({"url": ""}), &env, &options().with_expansion(true));
        assert_eq!(result, json!({"url": "http://h:80"}));
    }

    #[test]
    fn test_expansion_reaches_arrays_and_env_merged_subtrees() {
        let env = MapEnv::from_pairs([("APP_CONFIG_DB", r#"{"port":1}"#), ("H", "h")]);
        let tree = json!({"db": {"host": "{{H}}"}, "list": ["{{H}}", {"inner": "{{H}}"}, 3]});
        let result = apply_env(tree, &env, &options().with_expansion(true));
        assert_eq!(
            result,
            json!({"db": {"host": "h", "port": 1}, "list": ["h", {"inner": "h"}, 3]})
        );
    }

    #[test]
    fn test_expansion_disabled_by_default() {
        let env = MapEnv::from_pairs([("HOST", "h")]);
        let result = apply_env(json!({"url": "{{HOST}}"}), &env, &options());
        assert_eq!(result, json!({"url": "{{HOST}}"}));
    }

    #[test]
    fn test_expand_from_env_multiple() {
        let env = MapEnv::from_pairs([("A", "1"), ("B", "2")]);
        assert_eq!(expand_from_env("{{A}}-{{B}}-{{C}}", &env), "1-2-{{C}}");
        assert_eq!(expand_from_env("no placeholders", &env), "no placeholders");
    }

    #[test]
    fn test_apply_env_map() {
        let env = MapEnv::from_pairs([("DATABASE_URL", "postgres://db"), ("PORT", "5432")]);
        let env_map = BTreeMap::from([
            ("DATABASE_URL".to_string(), "database.url".to_string()),
            ("PORT".to_string(), "port".to_string()),
            ("UNSET".to_string(), "other".to_string()),
        ]);
        let mut tree = json!({"database": {"pool": 5}});
        apply_env_map(&mut tree, &env_map, &env);
        assert_eq!(
            tree,
            json!({"database": {"pool": 5, "url": "postgres://db"}, "port": 5432})
        );
    }
}

//! Environment variable access and key-path name mangling.
//!
//! Config paths map onto environment variables by upper-snake-casing each
//! path segment and joining them with `_` under a prefix:
//!
//! - `database.host` with prefix `APP_CONFIG_` → `APP_CONFIG_DATABASE_HOST`
//! - `apiKey` with prefix `APP_CONFIG_` → `APP_CONFIG_API_KEY`

use super::coerce::coerce;
use heck::ToShoutySnakeCase;
use serde_json::Value;
use std::collections::HashMap;

/// Read-only view of environment variables.
///
/// The loader never queries `std::env` directly; everything goes through a
/// source so resolution can run against an explicit snapshot.
pub trait EnvSource: Send + Sync {
    /// Get the value of a variable, `None` if unset.
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs.
    pub fn from_pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl EnvSource for MapEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// A primary source with a fallback consulted only for unset names.
///
/// Used to put dotenv values underneath the real environment.
pub struct LayeredEnv<'a> {
    primary: &'a dyn EnvSource,
    fallback: MapEnv,
}

impl<'a> LayeredEnv<'a> {
    pub fn new(primary: &'a dyn EnvSource, fallback: MapEnv) -> Self {
        Self { primary, fallback }
    }
}

impl EnvSource for LayeredEnv<'_> {
    fn get(&self, name: &str) -> Option<String> {
        self.primary.get(name).or_else(|| self.fallback.get(name))
    }
}

/// Prefixes used when looking up a config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOptions {
    /// Primary prefix, e.g. `APP_CONFIG_`.
    pub prefix: String,
    /// Consulted only when the primary variable is unset.
    pub alt_prefix: Option<String>,
}

impl EnvOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            alt_prefix: None,
        }
    }

    pub fn with_alt_prefix(mut self, alt_prefix: impl Into<String>) -> Self {
        self.alt_prefix = Some(alt_prefix.into());
        self
    }

    /// Default prefix for a config name: `my-app` → `MY_APP_CONFIG_`.
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("{}_CONFIG_", name.to_shouty_snake_case()))
    }
}

/// Mangle a key path into the variable-name suffix.
///
/// Both dotted paths and already-flattened identifiers are accepted:
/// `database.host`, `database_host` and `databaseHost` all produce
/// `DATABASE_HOST`.
pub fn mangle_key(key_path: &str) -> String {
    key_path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_shouty_snake_case())
        .collect::<Vec<_>>()
        .join("_")
}

/// Look up the variable for `key_path` and coerce its value.
///
/// Returns `None` only when neither the prefixed nor the alt-prefixed variable
/// is set; an empty variable yields `Some("")`.
pub fn get_env(env: &dyn EnvSource, key_path: &str, options: &EnvOptions) -> Option<Value> {
    let mangled = mangle_key(key_path);
    let raw = env.get(&format!("{}{}", options.prefix, mangled)).or_else(|| {
        options
            .alt_prefix
            .as_ref()
            .and_then(|alt| env.get(&format!("{alt}{mangled}")))
    })?;
    Some(coerce(&raw))
}

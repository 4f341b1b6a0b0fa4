//! `.env` file loading.
//!
//! Values are collected into a [`MapEnv`] rather than written to the process
//! environment; the loader layers them underneath the real environment so an
//! already-set variable always wins.

use super::env::{EnvSource, MapEnv};
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::debug;

/// Variable consulted for the environment name by default.
pub const ENV_NAME_VAR: &str = "NODE_ENV";

/// Which `.env.{name}` file to load in addition to `.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvName {
    /// Read the name from [`ENV_NAME_VAR`].
    #[default]
    FromEnv,
    Named(String),
    /// Load only `.env`.
    Disabled,
}

impl EnvName {
    fn resolve(&self, env: &dyn EnvSource) -> Option<String> {
        match self {
            EnvName::FromEnv => env.get(ENV_NAME_VAR).filter(|name| !name.is_empty()),
            EnvName::Named(name) => Some(name.clone()),
            EnvName::Disabled => None,
        }
    }
}

/// Read `.env` and then `.env.{name}` from `cwd`.
///
/// Later files override earlier ones; missing files are skipped.
pub async fn load_dotenv(
    cwd: &Path,
    env_name: &EnvName,
    env: &dyn EnvSource,
) -> ConfigResult<MapEnv> {
    let mut files = vec![".env".to_string()];
    if let Some(name) = env_name.resolve(env) {
        files.push(format!(".env.{name}"));
    }

    let mut vars = MapEnv::new();
    for file in files {
        let path = cwd.join(&file);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(ConfigError::read(&path, err)),
        };

        let mut count = 0usize;
        for item in dotenvy::from_read_iter(content.as_slice()) {
            let (key, value) = item.map_err(|source| ConfigError::Dotenv {
                path: path.clone(),
                source,
            })?;
            vars.set(key, value);
            count += 1;
        }
        debug!(path = %path.display(), count, "Loaded env file");
    }

    Ok(vars)
}

//! Config file discovery and loading.
//!
//! Discovery walks from the working directory towards the home directory (or
//! the filesystem root) and takes the first matching file. In each directory
//! the candidates are checked in this order:
//!
//! 1. `package.json`, when it has a field named after the config
//! 2. `.{name}rc` (YAML or JSON)
//! 3. `.{name}rc.json`, `.{name}rc.yaml`, `.{name}rc.yml`
//! 4. `{name}.config.json`, `{name}.config.yaml`, `{name}.config.yml`

use crate::error::{ConfigError, ConfigResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A config file found by discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredConfig {
    pub config: Value,
    pub path: PathBuf,
}

/// Finds the config for a name, starting from a directory.
#[async_trait]
pub trait ConfigDiscovery: Send + Sync {
    async fn discover(&self, name: &str, cwd: &Path) -> ConfigResult<Option<DiscoveredConfig>>;
}

/// Discovery that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

#[async_trait]
impl ConfigDiscovery for NoDiscovery {
    async fn discover(&self, _name: &str, _cwd: &Path) -> ConfigResult<Option<DiscoveredConfig>> {
        Ok(None)
    }
}

/// Filesystem discovery using the search places listed in the module docs.
#[derive(Debug, Clone, Default)]
pub struct FsDiscovery {
    /// Last directory searched; defaults to the user's home directory.
    pub stop_dir: Option<PathBuf>,
}

impl FsDiscovery {
    pub fn new() -> Self {
        Self {
            stop_dir: dirs::home_dir(),
        }
    }

    /// Search only `stop_dir` and the directories below it.
    pub fn with_stop_dir(stop_dir: impl Into<PathBuf>) -> Self {
        Self {
            stop_dir: Some(stop_dir.into()),
        }
    }

    /// File names checked in each directory, in order.
    pub fn search_places(name: &str) -> Vec<String> {
        vec![
            "package.json".to_string(),
            format!(".{name}rc"),
            format!(".{name}rc.json"),
            format!(".{name}rc.yaml"),
            format!(".{name}rc.yml"),
            format!("{name}.config.json"),
            format!("{name}.config.yaml"),
            format!("{name}.config.yml"),
        ]
    }

    /// Directories searched from `cwd`, nearest first.
    ///
    /// A relative `cwd` is made absolute first so the walk can climb past it.
    pub fn search_dirs(&self, cwd: &Path) -> std::io::Result<Vec<PathBuf>> {
        let start = std::path::absolute(cwd)?;
        let stop_dir = match &self.stop_dir {
            Some(dir) => Some(std::path::absolute(dir)?),
            None => None,
        };

        let mut dirs = Vec::new();
        for dir in start.ancestors() {
            dirs.push(dir.to_path_buf());
            if stop_dir.as_deref() == Some(dir) {
                break;
            }
        }
        Ok(dirs)
    }

    async fn search_dir(&self, name: &str, dir: &Path) -> ConfigResult<Option<DiscoveredConfig>> {
        for place in Self::search_places(name) {
            let path = dir.join(&place);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }

            if place == "package.json" {
                let package = load_config_file(&path).await?;
                if let Some(config) = package.get(name).filter(|v| v.is_object()) {
                    return Ok(Some(DiscoveredConfig {
                        config: config.clone(),
                        path,
                    }));
                }
                continue;
            }

            let config = load_config_file(&path).await?;
            return Ok(Some(DiscoveredConfig { config, path }));
        }
        Ok(None)
    }
}

#[async_trait]
impl ConfigDiscovery for FsDiscovery {
    async fn discover(&self, name: &str, cwd: &Path) -> ConfigResult<Option<DiscoveredConfig>> {
        let dirs = self.search_dirs(cwd).map_err(|err| ConfigError::read(cwd, err))?;
        for dir in &dirs {
            if let Some(found) = self.search_dir(name, dir).await? {
                debug!(path = %found.path.display(), "Discovered config file");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Load a config file as an object.
///
/// `.json` files are parsed as JSON; everything else (`.yaml`, `.yml`,
/// extension-less rc files) as YAML, which also accepts JSON. An empty file is
/// an empty object.
pub async fn load_config_file(path: &Path) -> ConfigResult<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ConfigError::read(path, err))?;
    parse_config(path, &content)
}

/// Parse file content according to the file's extension.
pub fn parse_config(path: &Path, content: &str) -> ConfigResult<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let value: Value = if is_json {
        serde_json::from_str(content).map_err(|err| ConfigError::parse(path, err))?
    } else {
        serde_yaml::from_str(content).map_err(|err| ConfigError::parse(path, err))?
    };

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        other => Err(ConfigError::parse(
            path,
            format!("expected a mapping at the top level, found {}", type_name(&other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json_and_yaml() {
        let json_value = parse_config(Path::new("a.json"), r#"{"port": 1}"#).unwrap();
        assert_eq!(json_value, json!({"port": 1}));

        let yaml_value = parse_config(Path::new(".apprc"), "server:\n  port: 2\n").unwrap();
        assert_eq!(yaml_value, json!({"server": {"port": 2}}));
    }

    #[test]
    fn test_parse_empty_is_object() {
        assert_eq!(parse_config(Path::new("a.yaml"), "  \n").unwrap(), json!({}));
        assert_eq!(parse_config(Path::new("a.yaml"), "~").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_config(Path::new("a.json"), "{oops").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse_config(Path::new("a.yaml"), "- 1\n- 2\n").unwrap_err();
        assert!(err.to_string().contains("a sequence"));
    }

    #[tokio::test]
    async fn test_discovers_rc_in_cwd() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".apprc.json"), r#"{"a": 1}"#).unwrap();

        let found = FsDiscovery::with_stop_dir(temp.path())
            .discover("app", temp.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.config, json!({"a": 1}));
        assert_eq!(found.path, temp.path().join(".apprc.json"));
    }

    #[tokio::test]
    async fn test_search_order_prefers_rc_over_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.config.yaml"), "a: config").unwrap();
        std::fs::write(temp.path().join(".apprc"), "a: rc").unwrap();

        let found = FsDiscovery::with_stop_dir(temp.path())
            .discover("app", temp.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.config, json!({"a": "rc"}));
    }

    #[tokio::test]
    async fn test_package_json_field() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"name": "pkg", "app": {"port": 3000}}"#,
        )
        .unwrap();

        let found = FsDiscovery::with_stop_dir(temp.path())
            .discover("app", temp.path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.config, json!({"port": 3000}));

        let none = FsDiscovery::with_stop_dir(temp.path())
            .discover("other", temp.path())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_walks_up_to_stop_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("app.config.json"), r#"{"root": true}"#).unwrap();

        let found = FsDiscovery::with_stop_dir(temp.path())
            .discover("app", &nested)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.config, json!({"root": true}));

        let none = FsDiscovery::with_stop_dir(temp.path().join("a"))
            .discover("app", &nested)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_relative_cwd_walks_up() {
        let discovery = FsDiscovery { stop_dir: None };
        let dirs = discovery.search_dirs(Path::new(".")).unwrap();
        let expected = std::path::absolute(".").unwrap();

        assert!(dirs.iter().all(|dir| dir.is_absolute()));
        assert_eq!(dirs.len(), expected.ancestors().count());
        assert!(dirs.len() > 1);
    }

    #[test]
    fn test_search_dirs_stop_at_stop_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let dirs = FsDiscovery::with_stop_dir(temp.path())
            .search_dirs(&nested)
            .unwrap();
        assert_eq!(
            dirs,
            vec![nested.clone(), temp.path().join("a"), temp.path().to_path_buf()]
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = load_config_file(&temp.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

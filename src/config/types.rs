//! Layer and result types.

use super::path::get_path;
use crate::error::ConfigResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Layer precedence (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Caller-supplied defaults (lowest priority)
    Defaults = 0,
    /// Config file found by discovery
    Module = 1,
    /// Explicitly named config file
    File = 2,
    /// Environment variables
    Env = 3,
    /// Programmatic overrides
    Overrides = 4,
    /// Interactive prompt answers (highest priority)
    Prompt = 5,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Defaults => write!(f, "defaults"),
            LayerKind::Module => write!(f, "module"),
            LayerKind::File => write!(f, "file"),
            LayerKind::Env => write!(f, "env"),
            LayerKind::Overrides => write!(f, "overrides"),
            LayerKind::Prompt => write!(f, "prompt"),
        }
    }
}

/// One source of partial configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Layer {
    pub fn new(kind: LayerKind, config: Value) -> Self {
        Self {
            kind,
            config,
            source_path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// The result of a load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// Merged configuration, always an object.
    pub config: Value,
    /// The explicit config file if one was given, else the discovered file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    /// Required keys that were absent before prompting.
    pub missing: Vec<String>,
    /// Layers applied, lowest precedence first.
    pub layers: Vec<Layer>,
}

impl ResolvedConfig {
    /// Read a value by key or dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        get_path(&self.config, key)
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }

    /// Deserialize the merged config into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        Ok(serde_json::from_value(self.config.clone())?)
    }

    pub fn into_config(self) -> Value {
        self.config
    }
}

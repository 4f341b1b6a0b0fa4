//! Configuration loader with layer-based merging.
//!
//! One call to [`load_config`] runs the whole pipeline:
//!
//! 1. Read `.env` files into a fallback under the environment
//! 2. Discover the module config file, load the explicit config file
//! 3. Merge overrides > file > module > defaults
//! 4. Overlay environment variables onto a copy of that result
//! 5. Merge overrides > env > file > module > defaults
//! 6. Resolve missing required keys, prompting if allowed

use super::dotenv::{EnvName, load_dotenv};
use super::env::{EnvOptions, EnvSource, LayeredEnv, MapEnv, ProcessEnv};
use super::files::{ConfigDiscovery, FsDiscovery, load_config_file};
use super::merge::merge_layers;
use super::overlay::{OverlayOptions, apply_env_map, env_layer};
use super::prompt::{Prompter, TerminalPrompter, is_interactive};
use super::resolver::{KeySource, MissingFieldResolver, PromptsSource};
use super::types::{Layer, LayerKind, ResolvedConfig};
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Options for one [`load_config`] call.
#[derive(Clone)]
pub struct LoadOptions {
    /// Logical config name; drives discovery and the env prefix.
    pub name: String,
    pub default_config: Option<Value>,
    pub overrides: Option<Value>,
    /// Variable name → config key, applied after the prefixed overlay.
    pub env_map: BTreeMap<String, String>,
    /// Load `.env` files (default: true).
    pub dotenv: bool,
    pub env_name: EnvName,
    /// Base directory; defaults to the process working directory.
    pub cwd: Option<PathBuf>,
    /// Extra config file, relative to `cwd`. Must exist.
    pub config_file: Option<PathBuf>,
    pub required: Option<KeySource>,
    pub prompt: Option<KeySource>,
    pub prompts: Option<PromptsSource>,
    /// Overrides the `{NAME}_CONFIG_` prefix.
    pub env_prefix: Option<String>,
    pub alt_env_prefix: Option<String>,
    /// Expand `{{VAR}}` in string values.
    pub env_expansion: bool,
    /// Overrides terminal detection.
    pub interactive: Option<bool>,
    pub env: Arc<dyn EnvSource>,
    pub discovery: Arc<dyn ConfigDiscovery>,
    pub prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("name", &self.name)
            .field("default_config", &self.default_config)
            .field("overrides", &self.overrides)
            .field("env_map", &self.env_map)
            .field("dotenv", &self.dotenv)
            .field("env_name", &self.env_name)
            .field("cwd", &self.cwd)
            .field("config_file", &self.config_file)
            .field("required", &self.required)
            .field("prompt", &self.prompt)
            .field("prompts", &self.prompts)
            .field("env_prefix", &self.env_prefix)
            .field("alt_env_prefix", &self.alt_env_prefix)
            .field("env_expansion", &self.env_expansion)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl LoadOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_config: None,
            overrides: None,
            env_map: BTreeMap::new(),
            dotenv: true,
            env_name: EnvName::default(),
            cwd: None,
            config_file: None,
            required: None,
            prompt: None,
            prompts: None,
            env_prefix: None,
            alt_env_prefix: None,
            env_expansion: false,
            interactive: None,
            env: Arc::new(ProcessEnv),
            discovery: Arc::new(FsDiscovery::new()),
            prompter: Arc::new(TerminalPrompter),
        }
    }

    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.default_config = Some(defaults);
        self
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_env_mapping(mut self, var: impl Into<String>, key: impl Into<String>) -> Self {
        self.env_map.insert(var.into(), key.into());
        self
    }

    pub fn with_dotenv(mut self, enabled: bool) -> Self {
        self.dotenv = enabled;
        self
    }

    pub fn with_env_name(mut self, env_name: EnvName) -> Self {
        self.env_name = env_name;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_required(mut self, required: impl Into<KeySource>) -> Self {
        self.required = Some(required.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<KeySource>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_prompts(mut self, prompts: impl Into<PromptsSource>) -> Self {
        self.prompts = Some(prompts.into());
        self
    }

    /// Never prompt; unmet required keys fail the load.
    pub fn without_prompts(self) -> Self {
        self.with_prompts(PromptsSource::Disabled)
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn with_alt_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alt_env_prefix = Some(prefix.into());
        self
    }

    pub fn with_env_expansion(mut self, enabled: bool) -> Self {
        self.env_expansion = enabled;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn with_discovery(mut self, discovery: impl ConfigDiscovery + 'static) -> Self {
        self.discovery = Arc::new(discovery);
        self
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Arc::new(prompter);
        self
    }

    /// Prefixes for environment lookups.
    pub fn env_options(&self) -> EnvOptions {
        let mut options = match &self.env_prefix {
            Some(prefix) => EnvOptions::new(prefix.clone()),
            None => EnvOptions::for_name(&self.name),
        };
        options.alt_prefix = self.alt_env_prefix.clone();
        options
    }

    pub async fn load(self) -> ConfigResult<ResolvedConfig> {
        load_config(self).await
    }
}

/// Merge layers given lowest precedence first, plus the overrides on top.
fn merge_stack(layers: &[Layer], overrides: Option<&Value>) -> Value {
    let stack = overrides
        .cloned()
        .into_iter()
        .chain(layers.iter().rev().map(|layer| layer.config.clone()));
    merge_layers(stack)
}

/// Resolve the configuration for `options`.
pub async fn load_config(options: LoadOptions) -> ConfigResult<ResolvedConfig> {
    let cwd = match &options.cwd {
        Some(cwd) => std::path::absolute(cwd).map_err(|err| ConfigError::read(cwd, err))?,
        None => std::env::current_dir().map_err(|err| ConfigError::read(".", err))?,
    };

    let dotenv_vars = if options.dotenv {
        load_dotenv(&cwd, &options.env_name, options.env.as_ref()).await?
    } else {
        MapEnv::new()
    };
    let env = LayeredEnv::new(options.env.as_ref(), dotenv_vars);

    let mut layers: Vec<Layer> = Vec::new();
    if let Some(defaults) = &options.default_config {
        layers.push(Layer::new(LayerKind::Defaults, defaults.clone()));
    }

    let discovered = options.discovery.discover(&options.name, &cwd).await?;
    let discovered_path = discovered.as_ref().map(|found| found.path.clone());
    if let Some(found) = discovered {
        debug!(path = %found.path.display(), "Applying module config layer");
        layers.push(Layer::new(LayerKind::Module, found.config).with_path(found.path));
    }

    let explicit_path = match &options.config_file {
        Some(file) => {
            let path = resolve_config_file(&cwd, file).await?;
            let config = load_config_file(&path).await?;
            debug!(path = %path.display(), "Applying explicit config file layer");
            layers.push(Layer::new(LayerKind::File, config).with_path(&path));
            Some(path)
        }
        None => None,
    };

    let env_options = options.env_options();
    let overlay = OverlayOptions::new(env_options.clone()).with_expansion(options.env_expansion);
    let merged = merge_stack(&layers, options.overrides.as_ref());
    let mut env_config = env_layer(&merged, &env, &overlay);
    apply_env_map(&mut env_config, &options.env_map, &env);
    debug!(prefix = %env_options.prefix, "Applying environment layer");
    layers.push(Layer::new(LayerKind::Env, env_config));

    if let Some(overrides) = &options.overrides {
        layers.push(Layer::new(LayerKind::Overrides, overrides.clone()));
    }
    let merged = merge_stack(&layers, None);

    let resolver = MissingFieldResolver {
        required: options.required.as_ref(),
        prompt: options.prompt.as_ref(),
        prompts: options.prompts.as_ref(),
        interactive: options.interactive.unwrap_or_else(is_interactive),
        prompter: options.prompter.as_ref(),
        env: &env_options,
    };
    let resolution = resolver.resolve(merged).await?;
    if let Some(response) = resolution.response {
        layers.push(Layer::new(LayerKind::Prompt, response));
    }

    Ok(ResolvedConfig {
        config: resolution.config,
        filepath: explicit_path.or(discovered_path),
        missing: resolution.missing,
        layers,
    })
}

async fn resolve_config_file(cwd: &Path, file: &Path) -> ConfigResult<PathBuf> {
    let path = cwd.join(file);
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        _ => Err(ConfigError::MissingFile { path }),
    }
}

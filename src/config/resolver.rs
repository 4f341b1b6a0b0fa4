//! Missing-field resolution.
//!
//! After every other layer is merged, the resolver works out which required
//! keys are still absent, decides whether the user may be asked for them, and
//! folds the answers back in with the highest precedence.

use super::env::EnvOptions;
use super::merge::merge_layers;
use super::path::{has_path, set_path};
use super::prompt::{PromptDescriptor, Prompter, build_prompt_list};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Boxed future returned by asynchronous key and prompt sources.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type SyncFn<T> = Arc<dyn Fn(&Value) -> T + Send + Sync>;
type AsyncFn<T> = Arc<dyn Fn(Value) -> BoxFuture<T> + Send + Sync>;

/// A list of config keys, given up front or computed from the merged config.
///
/// Computed sources are evaluated once per load, against the config as it
/// stands before prompting.
#[derive(Clone)]
pub enum KeySource {
    Static(Vec<String>),
    Sync(SyncFn<Vec<String>>),
    Async(AsyncFn<Vec<String>>),
}

impl KeySource {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<String>> + Send + 'static,
    {
        Self::Async(Arc::new(move |config| -> BoxFuture<Vec<String>> {
            Box::pin(f(config))
        }))
    }

    pub async fn resolve(&self, config: &Value) -> Vec<String> {
        match self {
            KeySource::Static(keys) => keys.clone(),
            KeySource::Sync(f) => f(config),
            KeySource::Async(f) => f(config.clone()).await,
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Static(keys) => f.debug_tuple("Static").field(keys).finish(),
            KeySource::Sync(_) => f.write_str("Sync(<fn>)"),
            KeySource::Async(_) => f.write_str("Async(<fn>)"),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for KeySource {
    fn from(keys: Vec<S>) -> Self {
        Self::Static(keys.into_iter().map(Into::into).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for KeySource {
    fn from(keys: &[S]) -> Self {
        Self::Static(keys.iter().map(|k| k.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for KeySource {
    fn from(keys: [S; N]) -> Self {
        Self::Static(keys.iter().map(|k| k.as_ref().to_string()).collect())
    }
}

/// Prompt descriptors, or an explicit opt-out of interactive resolution.
#[derive(Clone)]
pub enum PromptsSource {
    /// Never prompt; unmet required keys fail the load.
    Disabled,
    Static(Vec<PromptDescriptor>),
    Sync(SyncFn<Vec<PromptDescriptor>>),
    Async(AsyncFn<Vec<PromptDescriptor>>),
}

impl PromptsSource {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Vec<PromptDescriptor> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<PromptDescriptor>> + Send + 'static,
    {
        Self::Async(Arc::new(move |config| -> BoxFuture<Vec<PromptDescriptor>> {
            Box::pin(f(config))
        }))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, PromptsSource::Disabled)
    }

    pub async fn resolve(&self, config: &Value) -> Vec<PromptDescriptor> {
        match self {
            PromptsSource::Disabled => Vec::new(),
            PromptsSource::Static(prompts) => prompts.clone(),
            PromptsSource::Sync(f) => f(config),
            PromptsSource::Async(f) => f(config.clone()).await,
        }
    }
}

impl fmt::Debug for PromptsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptsSource::Disabled => f.write_str("Disabled"),
            PromptsSource::Static(prompts) => f.debug_tuple("Static").field(prompts).finish(),
            PromptsSource::Sync(_) => f.write_str("Sync(<fn>)"),
            PromptsSource::Async(_) => f.write_str("Async(<fn>)"),
        }
    }
}

impl From<Vec<PromptDescriptor>> for PromptsSource {
    fn from(prompts: Vec<PromptDescriptor>) -> Self {
        Self::Static(prompts)
    }
}

/// Outcome of missing-field resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: Value,
    /// Required keys that were absent before prompting.
    pub missing: Vec<String>,
    /// Answers as a nested layer, when the prompter was invoked.
    pub response: Option<Value>,
}

/// Resolves required keys for one load.
pub struct MissingFieldResolver<'a> {
    pub required: Option<&'a KeySource>,
    pub prompt: Option<&'a KeySource>,
    pub prompts: Option<&'a PromptsSource>,
    /// Whether a user is there to answer.
    pub interactive: bool,
    pub prompter: &'a dyn Prompter,
    /// Used to suggest variable names in the missing-keys error.
    pub env: &'a EnvOptions,
}

impl MissingFieldResolver<'_> {
    pub async fn resolve(&self, config: Value) -> ConfigResult<Resolution> {
        let required = match self.required {
            Some(source) => dedup(source.resolve(&config).await),
            None => Vec::new(),
        };
        let missing: Vec<String> = required
            .into_iter()
            .filter(|key| !has_path(&config, key))
            .collect();

        let forced = match self.prompt {
            Some(source) => source.resolve(&config).await,
            None => Vec::new(),
        };
        let mut keys = missing.clone();
        keys.extend(forced);
        let keys = dedup(keys);

        if keys.is_empty() {
            return Ok(Resolution {
                config,
                missing,
                response: None,
            });
        }

        let disabled = self.prompts.is_some_and(PromptsSource::is_disabled);
        if disabled || !self.interactive {
            if !missing.is_empty() {
                return Err(ConfigError::MissingRequired {
                    keys: missing,
                    prefix: self.env.prefix.clone(),
                });
            }
            warn!(
                keys = %keys.join(", "),
                "Skipping forced prompts: interactive prompting is unavailable"
            );
            return Ok(Resolution {
                config,
                missing,
                response: None,
            });
        }

        let descriptors = match self.prompts {
            Some(source) => source.resolve(&config).await,
            None => Vec::new(),
        };
        let ordered = build_prompt_list(&keys, &descriptors);

        info!(count = ordered.len(), "Prompting for configuration values");
        let answers = self.prompter.prompt(&ordered).await?;
        debug!(answered = answers.len(), "Prompt response received");

        let response = response_layer(answers);
        let config = merge_layers([response.clone(), config]);

        Ok(Resolution {
            config,
            missing,
            response: Some(response),
        })
    }
}

/// Expand dotted answer keys into a nested object.
fn response_layer(answers: Map<String, Value>) -> Value {
    let mut layer = Map::new();
    for (key, value) in answers {
        set_path(&mut layer, &key, value);
    }
    Value::Object(layer)
}

fn dedup(keys: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique.contains(&key) {
            unique.push(key);
        }
    }
    unique
}

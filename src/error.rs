//! Structured error types for configuration loading.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Source errors
    MissingFile,
    ReadError,
    ParseError,
    DotenvError,

    // Resolution errors
    MissingRequiredField,
    PromptFailed,
    PromptCancelled,

    // Extraction errors
    DeserializeError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(code)) => f.write_str(&code),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Failure reported by a [`Prompter`](crate::config::Prompter).
#[derive(Debug, Error)]
pub enum PromptError {
    /// The user aborted, or input ended before every question was answered.
    #[error("prompt cancelled by user")]
    Cancelled,

    /// An answer could not be interpreted for the prompt's kind.
    #[error("invalid answer for \"{name}\": {message}")]
    InvalidAnswer { name: String, message: String },

    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure from a custom prompting backend.
    #[error("{0}")]
    Failed(String),
}

/// Error returned by [`load_config`](crate::config::load_config).
///
/// There is no partial success: either a fully resolved config comes back or
/// one of these does.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    #[error("config file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A discovered or explicit config file failed to parse.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to load env file '{}': {source}", .path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Required keys are missing and interactive prompting is unavailable.
    #[error(
        "missing required configuration: {}. Provide values through environment variables \
         (e.g. {prefix}{}) or a config file",
        .keys.join(", "),
        example_var(.keys)
    )]
    MissingRequired { keys: Vec<String>, prefix: String },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] serde_json::Error),
}

fn example_var(keys: &[String]) -> String {
    keys.first()
        .map(|key| crate::config::mangle_key(key))
        .unwrap_or_default()
}

impl ConfigError {
    pub fn parse(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::MissingFile { .. } => ErrorCode::MissingFile,
            ConfigError::Read { .. } => ErrorCode::ReadError,
            ConfigError::Parse { .. } => ErrorCode::ParseError,
            ConfigError::Dotenv { .. } => ErrorCode::DotenvError,
            ConfigError::MissingRequired { .. } => ErrorCode::MissingRequiredField,
            ConfigError::Prompt(PromptError::Cancelled) => ErrorCode::PromptCancelled,
            ConfigError::Prompt(_) => ErrorCode::PromptFailed,
            ConfigError::Deserialize(_) => ErrorCode::DeserializeError,
        }
    }

    /// Keys still missing, for `MissingRequired`.
    pub fn missing_keys(&self) -> &[String] {
        match self {
            ConfigError::MissingRequired { keys, .. } => keys,
            _ => &[],
        }
    }
}

/// Serializable error summary for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl From<&ConfigError> for ErrorReport {
    fn from(err: &ConfigError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            keys: err.missing_keys().to_vec(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

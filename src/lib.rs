//! Layered configuration loader.
//!
//! This module exports the core components for embedding and testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

pub use config::{LoadOptions, ResolvedConfig, load_config};
pub use error::{ConfigError, ConfigResult, PromptError};

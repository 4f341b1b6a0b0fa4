//! CLI command definitions for layered-conf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{EnvName, LoadOptions, coerce, mangle_key, set_path};
use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Output format for resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Resolve layered configuration from files, env files, environment variables and prompts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and print the merged configuration
    Resolve(ResolveArgs),

    /// Print the environment variable that overrides each config path
    EnvVars(ResolveArgs),
}

/// Arguments shared by the resolving subcommands.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Logical config name (drives discovery and the env prefix)
    pub name: String,

    /// Base directory for file resolution
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Explicit config file (must exist)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Default configuration as a JSON object
    #[arg(long)]
    pub defaults: Option<String>,

    /// Override a key: key=value (value is coerced)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Map an environment variable to a key: VAR=key
    #[arg(long = "env-map", value_name = "VAR=KEY")]
    pub env_map: Vec<String>,

    /// Key that must be present
    #[arg(long = "required", value_name = "KEY")]
    pub required: Vec<String>,

    /// Key to always prompt for
    #[arg(long = "prompt", value_name = "KEY")]
    pub prompt: Vec<String>,

    /// Never prompt; fail when required keys are missing
    #[arg(long)]
    pub no_prompts: bool,

    /// Skip .env files
    #[arg(long)]
    pub no_dotenv: bool,

    /// Load .env.{NAME} in addition to .env (default: $NODE_ENV)
    #[arg(long, conflicts_with = "no_env_name")]
    pub env_name: Option<String>,

    /// Load only .env
    #[arg(long)]
    pub no_env_name: bool,

    /// Environment variable prefix (default: {NAME}_CONFIG_)
    #[arg(long)]
    pub env_prefix: Option<String>,

    /// Fallback environment variable prefix
    #[arg(long)]
    pub alt_env_prefix: Option<String>,

    /// Expand {{VAR}} placeholders in string values
    #[arg(long)]
    pub env_expansion: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Print every applied layer instead of the merged result
    #[arg(long)]
    pub show_layers: bool,
}

impl ResolveArgs {
    /// Build loader options from the arguments.
    pub fn to_options(&self) -> Result<LoadOptions> {
        let mut options = LoadOptions::new(&self.name)
            .with_dotenv(!self.no_dotenv)
            .with_env_expansion(self.env_expansion);

        if let Some(cwd) = &self.cwd {
            options = options.with_cwd(cwd);
        }
        if let Some(config) = &self.config {
            options = options.with_config_file(config);
        }
        if let Some(defaults) = &self.defaults {
            let defaults: Value =
                serde_json::from_str(defaults).context("--defaults must be a JSON object")?;
            if !defaults.is_object() {
                return Err(anyhow!("--defaults must be a JSON object"));
            }
            options = options.with_defaults(defaults);
        }
        if !self.overrides.is_empty() {
            options = options.with_overrides(parse_overrides(&self.overrides)?);
        }
        for mapping in &self.env_map {
            let (var, key) = split_pair(mapping)?;
            options = options.with_env_mapping(var, key);
        }
        if !self.required.is_empty() {
            options = options.with_required(self.required.clone());
        }
        if !self.prompt.is_empty() {
            options = options.with_prompt(self.prompt.clone());
        }
        if self.no_prompts {
            options = options.without_prompts();
        }
        if self.no_env_name {
            options = options.with_env_name(EnvName::Disabled);
        } else if let Some(name) = &self.env_name {
            options = options.with_env_name(EnvName::Named(name.clone()));
        }
        if let Some(prefix) = &self.env_prefix {
            options = options.with_env_prefix(prefix);
        }
        if let Some(prefix) = &self.alt_env_prefix {
            options = options.with_alt_env_prefix(prefix);
        }

        Ok(options)
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .filter(|(left, _)| !left.is_empty())
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", pair))
}

/// Build an overrides object from `key=value` pairs.
pub fn parse_overrides(pairs: &[String]) -> Result<Value> {
    let mut overrides = Map::new();
    for pair in pairs {
        let (key, value) = split_pair(pair)?;
        set_path(&mut overrides, key, coerce(value));
    }
    Ok(Value::Object(overrides))
}

/// List `(path, variable)` for every leaf of `config`.
pub fn env_var_names(config: &Value, prefix: &str) -> Vec<(String, String)> {
    let mut names = Vec::new();
    collect_env_var_names(config, "", prefix, &mut names);
    names
}

fn collect_env_var_names(value: &Value, path: &str, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                collect_env_var_names(child, &child_path, prefix, out);
            }
        }
        _ if !path.is_empty() => {
            out.push((path.to_string(), format!("{prefix}{}", mangle_key(path))));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_overrides() {
        let pairs = vec![
            "server.port=9000".to_string(),
            "debug=true".to_string(),
            "name=app=1".to_string(),
        ];
        let overrides = parse_overrides(&pairs).unwrap();
        assert_eq!(
            overrides,
            json!({"server": {"port": 9000}, "debug": true, "name": "app=1"})
        );
    }

    #[test]
    fn test_parse_overrides_rejects_missing_equals() {
        assert!(parse_overrides(&["novalue".to_string()]).is_err());
        assert!(parse_overrides(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_env_var_names() {
        let config = json!({"database": {"host": "x", "maxPool": 1}, "tags": ["a"]});
        let names = env_var_names(&config, "APP_CONFIG_");
        assert!(names.contains(&("database.host".to_string(), "APP_CONFIG_DATABASE_HOST".to_string())));
        assert!(names.contains(&(
            "database.maxPool".to_string(),
            "APP_CONFIG_DATABASE_MAX_POOL".to_string()
        )));
        assert!(names.contains(&("tags".to_string(), "APP_CONFIG_TAGS".to_string())));
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from([
            "layered-conf",
            "resolve",
            "app",
            "--set",
            "port=1",
            "--required",
            "token",
            "--no-prompts",
            "--format",
            "yaml",
        ])
        .unwrap();

        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.name, "app");
        assert_eq!(args.format, OutputFormat::Yaml);

        let options = args.to_options().unwrap();
        assert_eq!(options.overrides, Some(json!({"port": 1})));
        assert!(options.prompts.as_ref().is_some_and(|p| p.is_disabled()));
        assert_eq!(options.env_options().prefix, "APP_CONFIG_");
    }

    #[test]
    fn test_cli_parses_env_vars_with_globals() {
        let cli = Cli::try_parse_from([
            "layered-conf",
            "env-vars",
            "my-app",
            "--env-prefix",
            "MY_",
            "-v",
            "--log",
            "off",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log, "off");
        let Command::EnvVars(args) = cli.command else {
            panic!("expected env-vars");
        };
        assert_eq!(args.name, "my-app");
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.to_options().unwrap().env_options().prefix, "MY_");
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["layered-conf", "app"]).is_err());
        assert!(Cli::try_parse_from(["layered-conf", "resolve"]).is_err());
    }

    #[test]
    fn test_defaults_must_be_object() {
        let cli = Cli::try_parse_from(["layered-conf", "resolve", "app", "--defaults", "[1]"]).unwrap();
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert!(args.to_options().is_err());
    }
}

//! layered-conf
//!
//! Resolves a layered configuration and prints it.

use anyhow::Result;
use clap::Parser;
use layered_conf::cli::{Cli, Command, OutputFormat, ResolveArgs, env_var_names};
use layered_conf::config::{ResolvedConfig, load_config};
use layered_conf::error::{ConfigError, ErrorReport};
use layered_conf::logging::{LogTarget, init_logging};
use serde::Serialize;
use std::process::ExitCode;
use tracing::debug;

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

async fn resolve(args: &ResolveArgs) -> Result<std::result::Result<ResolvedConfig, ConfigError>> {
    let options = args.to_options()?;
    debug!(?options, "Resolving configuration");
    Ok(load_config(options).await)
}

fn report_error(err: &ConfigError, format: OutputFormat) -> Result<()> {
    eprintln!("Error: {}", err);
    if format == OutputFormat::Json {
        println!("{}", render(&ErrorReport::from(err), format)?);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Resolve(args) => match resolve(args).await? {
            Ok(resolved) => {
                let output = if args.show_layers {
                    render(&resolved.layers, args.format)?
                } else {
                    render(&resolved.config, args.format)?
                };
                println!("{}", output.trim_end());
                if let Some(path) = resolved.filepath() {
                    debug!(path = %path.display(), "Config file used");
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                report_error(&err, args.format)?;
                Ok(ExitCode::FAILURE)
            }
        },
        Command::EnvVars(args) => {
            let prefix = args.to_options()?.env_options().prefix;
            match resolve(args).await? {
                Ok(resolved) => {
                    for (path, var) in env_var_names(&resolved.config, &prefix) {
                        println!("{var}\t{path}");
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    report_error(&err, args.format)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;
    run(cli).await
}

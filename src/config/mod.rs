//! Layered configuration resolution.
//!
//! Consolidates configuration from these layers, highest precedence first:
//! 1. **Prompt** - Answers collected interactively for missing keys
//! 2. **Overrides** - Passed programmatically
//! 3. **Env** - `{NAME}_CONFIG_*` variables, `.env` files and explicit mappings
//! 4. **File** - An explicitly named config file
//! 5. **Module** - The config file found by discovery
//! 6. **Defaults** - Passed programmatically
//!
//! ## Merge Strategy
//! - Objects: deep merge field-by-field
//! - Arrays and scalars: replaced entirely by the higher layer
//! - Absent keys: "not specified"; an explicit `null` replaces lower layers
//!
//! ## Environment Variables
//! - `{NAME}_CONFIG_{PATH}` - Override any existing path, e.g.
//!   `APP_CONFIG_DATABASE_HOST` for `database.host`
//! - `NODE_ENV` - Selects `.env.{NODE_ENV}` next to `.env`

mod coerce;
mod dotenv;
mod env;
mod files;
mod loader;
mod merge;
mod overlay;
mod path;
mod prompt;
mod resolver;
mod types;

pub use coerce::coerce;
pub use dotenv::{ENV_NAME_VAR, EnvName, load_dotenv};
pub use env::{EnvOptions, EnvSource, LayeredEnv, MapEnv, ProcessEnv, get_env, mangle_key};
pub use files::{
    ConfigDiscovery, DiscoveredConfig, FsDiscovery, NoDiscovery, load_config_file, parse_config,
};
pub use loader::{LoadOptions, load_config};
pub use merge::{deep_merge, merge_layers};
pub use overlay::{OverlayOptions, apply_env, apply_env_map, env_layer, expand_from_env};
pub use path::{get_path, has_path, set_path};
pub use prompt::{
    PromptDescriptor, Prompter, TerminalPrompter, build_prompt_list, is_interactive, parse_answer,
    prompt_lines,
};
pub use resolver::{BoxFuture, KeySource, MissingFieldResolver, PromptsSource, Resolution};
pub use types::{Layer, LayerKind, ResolvedConfig};

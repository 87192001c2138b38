//! Configuration system for ledgerlink.
//!
//! Provides TOML-based configuration with:
//! - Environment selection (`sandbox` or `production`) picking the API base URL
//! - OAuth client registration (client id/secret, redirect URI, scope)
//! - Config file layering (XDG user config + project-local overrides)
//! - Environment variable overrides and secret resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, apply_env_overrides, load_config,
    load_config_file, load_config_with_options, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{
    CLIENT_ID_ENV, CLIENT_SECRET_ENV, ClientCredentials, ResolvedSecret, SecretSource,
    resolve_secret, resolve_secret_with,
};
pub use types::*;

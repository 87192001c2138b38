//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/ledgerlink/config.toml` (XDG user config)
//! 2. `./ledgerlink.toml` (project-local)
//! 3. `LEDGERLINK_*` environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Environment, LedgerConfig, OAuthSection, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "ledgerlink.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "ledgerlink";

/// Environment variable selecting sandbox or production.
pub const ENVIRONMENT_ENV: &str = "LEDGERLINK_ENVIRONMENT";

/// Environment variable overriding the registered redirect URI.
pub const REDIRECT_URI_ENV: &str = "LEDGERLINK_REDIRECT_URI";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: LedgerConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Primary source file (first successfully loaded), for save operations.
    pub source: Option<ConfigSource>,
    /// Warnings generated during loading (e.g., plaintext client secret).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `LEDGERLINK_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut loaded = load_files(project_dir, config_dir)?;
    apply_env_overrides(&mut loaded.config, &mut loaded.warnings, |var| {
        std::env::var(var).ok()
    });
    Ok(loaded)
}

/// Discover and merge the file layers only.
fn load_files(project_dir: Option<&Path>, config_dir: Option<&Path>) -> Result<LoadedConfig> {
    let mut config = LedgerConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        let source = load_layer(&mut config, &path, &mut warnings)?;
        sources.push(source);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    let source = load_layer(&mut config, &project_path, &mut warnings)?;
    sources.push(source);

    check_plaintext_secret(&config, &mut warnings);

    let source = sources.iter().find(|s| s.loaded).cloned();

    Ok(LoadedConfig {
        config,
        sources,
        source,
        warnings,
    })
}

/// Apply `LEDGERLINK_ENVIRONMENT` and `LEDGERLINK_REDIRECT_URI`.
///
/// An unparseable environment value is reported as a warning and ignored.
/// Client id and secret are resolved later, see [`LedgerConfig::client_credentials`].
pub fn apply_env_overrides(
    config: &mut LedgerConfig,
    warnings: &mut Vec<String>,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(value) = lookup(ENVIRONMENT_ENV).filter(|v| !v.is_empty()) {
        match value.parse::<Environment>() {
            Ok(env) => config.environment = Some(env),
            Err(e) => warnings.push(format!("Ignoring {}: {}", ENVIRONMENT_ENV, e)),
        }
    }

    if let Some(uri) = lookup(REDIRECT_URI_ENV).filter(|v| !v.is_empty()) {
        config
            .oauth
            .get_or_insert_with(OAuthSection::default)
            .redirect_uri = Some(uri);
    }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<LedgerConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    LedgerConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &LedgerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Environment variable to override the config directory.
///
/// When set, this takes precedence over the platform default.
pub const CONFIG_DIR_ENV: &str = "LEDGERLINK_CONFIG_DIR";

/// Get the XDG config file path for ledgerlink.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the XDG config directory for ledgerlink.
///
/// Checks `LEDGERLINK_CONFIG_DIR` first, then falls back to the platform
/// default (`~/.config/ledgerlink` on Linux).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(
    config: &mut LedgerConfig,
    path: &Path,
    warnings: &mut Vec<String>,
) -> Result<ConfigSource> {
    if !path.is_file() {
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        });
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            Ok(ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            })
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            Ok(ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            })
        }
    }
}

fn check_plaintext_secret(config: &LedgerConfig, warnings: &mut Vec<String>) {
    if config.has_plaintext_secret() {
        warnings.push(
            "[oauth] contains a plaintext client_secret. \
             Consider setting LEDGERLINK_CLIENT_SECRET instead."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

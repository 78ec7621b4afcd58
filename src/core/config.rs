//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.mxchat/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MxchatConfig {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AccountConfig {
    pub homeserver: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SyncConfig {
    pub timeout_ms: Option<u64>,
    pub typing_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiConfig {
    pub room_list_width: Option<u16>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOMESERVER: &str = "https://matrix.org";
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TYPING_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ROOM_LIST_WIDTH: u16 = 30;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub homeserver: String,
    pub user_id: String,
    pub password: Option<String>,
    pub sync_timeout_ms: u64,
    pub typing_timeout_ms: u64,
    pub room_list_width: u16,
}

/// Values given on the command line. `None` means not specified.
#[derive(Debug, Default)]
pub struct CliOverrides<'a> {
    pub homeserver: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.mxchat`.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".mxchat"))
}

/// Returns the path to `~/.mxchat/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("config.toml"))
}

/// Load config from `path`, or from `~/.mxchat/config.toml` when `None`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `MxchatConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config(path: Option<&Path>) -> Result<MxchatConfig, ConfigError> {
    let path = match path.map(Path::to_path_buf).or_else(config_path) {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(MxchatConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(MxchatConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: MxchatConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: homeserver={:?} user={:?}", config.account.homeserver, config.account.user_id);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# mxchat configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [account]
# homeserver = "https://matrix.org"  # Or set MXCHAT_HOMESERVER
# user_id = "@me:matrix.org"         # Or set MXCHAT_USER
# password = "..."                   # Or set MXCHAT_PASSWORD; only needed for the first login

# [sync]
# timeout_ms = 30000                 # Long-poll timeout for /sync
# typing_timeout_ms = 5000           # How long a typing notification lasts

# [ui]
# room_list_width = 30
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &MxchatConfig, cli: &CliOverrides<'_>) -> ResolvedConfig {
    // Homeserver: CLI → env → config → default
    let homeserver = cli
        .homeserver
        .map(|s| s.to_string())
        .or_else(|| std::env::var("MXCHAT_HOMESERVER").ok())
        .or_else(|| config.account.homeserver.clone())
        .unwrap_or_else(|| DEFAULT_HOMESERVER.to_string());

    // User: CLI → env → config
    let user_id = cli
        .user_id
        .map(|s| s.to_string())
        .or_else(|| std::env::var("MXCHAT_USER").ok())
        .or_else(|| config.account.user_id.clone())
        .unwrap_or_default();

    // Password: env → config
    let password = std::env::var("MXCHAT_PASSWORD")
        .ok()
        .or_else(|| config.account.password.clone());

    ResolvedConfig {
        homeserver: homeserver.trim_end_matches('/').to_string(),
        user_id,
        password,
        sync_timeout_ms: config.sync.timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS),
        typing_timeout_ms: config
            .sync
            .typing_timeout_ms
            .unwrap_or(DEFAULT_TYPING_TIMEOUT_MS),
        room_list_width: config
            .ui
            .room_list_width
            .unwrap_or(DEFAULT_ROOM_LIST_WIDTH),
    }
}

//! Bootstrap configuration
//!
//! Everything the server needs before it can answer a request: where to
//! listen, where the secret state and reward live, where the page and the
//! rendered notes are. Read once at startup; changing it requires a restart.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`~/.config/piano-tuner/config.toml` on Linux)
//! 4. Built-in defaults (no file)
//!
//! A missing file is not an error: the server logs a warning and starts on
//! defaults. A file that exists but does not parse is fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::judge::{DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_TRACKED_SESSIONS};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PIANO_TUNER_CONFIG";

/// Longest accepted cooldown (one year)
pub const MAX_COOLDOWN_SECS: i64 = 365 * 24 * 60 * 60;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Interface to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix every route is mounted under
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// Secret state JSON file, created on first boot
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Text file holding the reward released on a perfect tuning
    #[serde(default = "default_reward_file")]
    pub reward_file: PathBuf,

    /// Directory containing `index.html` and `cartographer.png`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Directory containing rendered `{note}-{level}.mp3` files
    #[serde(default = "default_notes_dir")]
    pub notes_dir: PathBuf,

    /// Minimum seconds between judged submissions per session
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,

    /// Tracked sessions before stale rate-limit entries are pruned
    #[serde(default = "default_max_tracked_sessions")]
    pub max_tracked_sessions: usize,

    /// Refuse to start when the secret state cannot be written
    #[serde(default)]
    pub strict_persistence: bool,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            route_prefix: default_route_prefix(),
            state_file: default_state_file(),
            reward_file: default_reward_file(),
            assets_dir: default_assets_dir(),
            notes_dir: default_notes_dir(),
            cooldown_secs: default_cooldown_secs(),
            max_tracked_sessions: default_max_tracked_sessions(),
            strict_persistence: false,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3093
}

fn default_route_prefix() -> String {
    "/viritys".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_reward_file() -> PathBuf {
    PathBuf::from("final-coords.txt")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_notes_dir() -> PathBuf {
    PathBuf::from("notes")
}

fn default_cooldown_secs() -> i64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_max_tracked_sessions() -> usize {
    DEFAULT_MAX_TRACKED_SESSIONS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path`, or defaults when there is no file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Route prefix normalised to `/name` form, or empty for the root
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.route_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    fn validate(&self) -> Result<()> {
        if !(0..=MAX_COOLDOWN_SECS).contains(&self.cooldown_secs) {
            return Err(Error::Config(format!(
                "cooldown_secs must be between 0 and {} (got {})",
                MAX_COOLDOWN_SECS, self.cooldown_secs
            )));
        }
        if self.max_tracked_sessions == 0 {
            return Err(Error::Config(
                "max_tracked_sessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve which config file to read
///
/// Returns `None` when no source names a file and the platform default does
/// not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("piano-tuner").join("config.toml"))
}

/// Read the reward payload released on a perfect tuning
pub fn load_reward(path: &Path) -> Result<String> {
    let reward = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read reward {}: {}", path.display(), e)))?;
    if reward.trim().is_empty() {
        warn!("Reward file {} is empty", path.display());
    }
    Ok(reward)
}

//! Configuration loading and base folder resolution
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument (highest priority, passed in as overrides)
//! 2. Environment variable (also surfaced through the command-line parser)
//! 3. TOML config file (`breadcast.toml`)
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error; compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Config file name looked up in the base folder, then the user config dir
pub const CONFIG_FILE_NAME: &str = "breadcast.toml";

/// Named recipe set file, relative to the environment folder
pub const RECIPE_SET_FILE_NAME: &str = "recipes.json";

/// Rendered recipe set file, relative to the environment folder
pub const RENDERED_RECIPES_FILE_NAME: &str = "rendered-recipes.json";

/// Frame images pinned at serve time (asset key → CID), relative to the environment folder
pub const PINNED_ASSETS_FILE_NAME: &str = "cid-data.json";

/// Environment variable naming the base folder
pub const BASE_DIR_ENV: &str = "BREADCAST_BASE_DIR";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_IPFS_GATEWAY: &str = "https://gateway.pinata.cloud";
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_TTL_SECS: u64 = 60;
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 10;

/// Where recipe documents come from at serve time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeMode {
    /// Recipes and frame images come from `rendered-recipes.json`
    Prerendered,
    /// Recipes listed in `recipes.json` are fetched from the object store
    Live,
}

/// How rendered frame images are memoized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicyKind {
    /// Render once, pin once, keep the content identifier forever
    PinOnce,
    /// Keep rendered data URIs for a fixed time, then re-render
    Ttl,
}

impl FromStr for ServeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prerendered" | "prod" | "production" => Ok(ServeMode::Prerendered),
            "live" | "dev" => Ok(ServeMode::Live),
            other => Err(format!("unknown serve mode '{}' (expected prerendered or live)", other)),
        }
    }
}

impl fmt::Display for ServeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeMode::Prerendered => write!(f, "prerendered"),
            ServeMode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for CachePolicyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pin_once" | "pin" => Ok(CachePolicyKind::PinOnce),
            "ttl" => Ok(CachePolicyKind::Ttl),
            other => Err(format!("unknown cache policy '{}' (expected pin_once or ttl)", other)),
        }
    }
}

impl fmt::Display for CachePolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicyKind::PinOnce => write!(f, "pin_once"),
            CachePolicyKind::Ttl => write!(f, "ttl"),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; unset fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub bind_host: Option<String>,

    #[serde(default)]
    pub mode: Option<ServeMode>,

    #[serde(default)]
    pub cache: Option<CachePolicyKind>,

    #[serde(default)]
    pub ttl_secs: Option<u64>,

    #[serde(default)]
    pub reload_interval_secs: Option<u64>,

    /// Origin used for button targets, e.g. `https://frames.example.com`
    #[serde(default)]
    pub public_url: Option<String>,

    /// Extra font directory for the renderer
    #[serde(default)]
    pub fonts_dir: Option<PathBuf>,

    #[serde(default)]
    pub ipfs: IpfsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pinning service and gateway settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IpfsConfig {
    #[serde(default)]
    pub gateway: Option<String>,

    #[serde(default)]
    pub pinata_jwt: Option<String>,

    #[serde(default)]
    pub pinata_api_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub base_dir: Option<PathBuf>,
    pub env_name: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<ServeMode>,
    pub cache: Option<CachePolicyKind>,
    pub public_url: Option<String>,
    pub ipfs_gateway: Option<String>,
    pub pinata_jwt: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    /// `{base_dir}/{env}`; holds the recipe set files
    pub env_dir: PathBuf,
    pub port: u16,
    pub bind_host: String,
    pub mode: ServeMode,
    pub cache: CachePolicyKind,
    pub ttl: Duration,
    pub reload_interval: Duration,
    pub public_url: Option<String>,
    pub fonts_dir: Option<PathBuf>,
    pub ipfs_gateway: String,
    pub pinata_api_url: String,
    pub pinata_jwt: Option<String>,
    pub log_level: String,
}

impl Settings {
    /// Resolve settings from overrides, the TOML file and compiled defaults.
    ///
    /// Creates the environment folder if it does not exist yet.
    pub fn resolve(overrides: SettingsOverrides) -> Result<Self> {
        let base_dir = resolve_base_dir(overrides.base_dir.as_deref());
        let toml_config = load_toml_config(&base_dir)?;
        let settings = Self::from_sources(base_dir, toml_config, overrides);

        if !settings.env_dir.exists() {
            std::fs::create_dir_all(&settings.env_dir)?;
            info!("Created environment folder: {}", settings.env_dir.display());
        }

        Ok(settings)
    }

    /// Merge sources without touching the filesystem
    pub fn from_sources(base_dir: PathBuf, toml: TomlConfig, overrides: SettingsOverrides) -> Self {
        let env_name = overrides.env_name.unwrap_or_default();
        let env_dir = if env_name.is_empty() {
            base_dir.clone()
        } else {
            base_dir.join(&env_name)
        };

        let fonts_dir = toml.fonts_dir.map(|p| {
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        });

        Self {
            env_dir,
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            bind_host: toml.bind_host.unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            mode: overrides.mode.or(toml.mode).unwrap_or(ServeMode::Prerendered),
            cache: overrides.cache.or(toml.cache).unwrap_or(CachePolicyKind::PinOnce),
            ttl: Duration::from_secs(toml.ttl_secs.unwrap_or(DEFAULT_TTL_SECS)),
            reload_interval: Duration::from_secs(
                toml.reload_interval_secs.unwrap_or(DEFAULT_RELOAD_INTERVAL_SECS),
            ),
            public_url: overrides
                .public_url
                .or(toml.public_url)
                .map(|url| url.trim_end_matches('/').to_string()),
            fonts_dir,
            ipfs_gateway: overrides
                .ipfs_gateway
                .or(toml.ipfs.gateway)
                .unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string())
                .trim_end_matches('/')
                .to_string(),
            pinata_api_url: toml
                .ipfs
                .pinata_api_url
                .unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            pinata_jwt: overrides.pinata_jwt.or(toml.ipfs.pinata_jwt),
            log_level: toml.logging.level,
            base_dir,
        }
    }

    pub fn recipe_set_path(&self) -> PathBuf {
        self.env_dir.join(RECIPE_SET_FILE_NAME)
    }

    pub fn rendered_recipes_path(&self) -> PathBuf {
        self.env_dir.join(RENDERED_RECIPES_FILE_NAME)
    }

    pub fn pinned_assets_path(&self) -> PathBuf {
        self.env_dir.join(PINNED_ASSETS_FILE_NAME)
    }
}

/// Base folder resolution: CLI argument, then `BREADCAST_BASE_DIR`, then the
/// current working directory.
pub fn resolve_base_dir(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(BASE_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Locate the config file: `{base_dir}/breadcast.toml`, then the per-user
/// config directory (`~/.config/breadcast/breadcast.toml` on Linux).
pub fn find_config_file(base_dir: &Path) -> Option<PathBuf> {
    let local = base_dir.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("breadcast").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load the TOML config, or defaults when no file exists.
///
/// A file that exists but does not parse is a configuration error.
pub fn load_toml_config(base_dir: &Path) -> Result<TomlConfig> {
    let Some(path) = find_config_file(base_dir) else {
        info!("No {} found, using compiled defaults", CONFIG_FILE_NAME);
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(&path)?;
    let config = toml::from_str::<TomlConfig>(&content).map_err(|e| {
        warn!("Failed to parse {}: {}", path.display(), e);
        Error::Config(format!("{}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

// Configuration loading and parsing (sources.toml, analyzer.toml, aliases.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::leagues::DEFAULT_FIRST_SEASON;
use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub sources: SourcesConfig,
    pub analyzer: AnalyzerConfig,
    /// Extra name aliases, raw name → canonical name.
    pub aliases: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// sources.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub sleeper: SleeperConfig,
    pub ktc: KtcConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SleeperConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KtcConfig {
    /// Rankings page URL; `{page}` is replaced by the 0-based page number.
    pub url_template: String,
    pub pages: u32,
    #[serde(default)]
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

// ---------------------------------------------------------------------------
// analyzer.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    #[serde(default)]
    pub leagues: LeaguesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub valuation_ttl_hours: i64,
    pub player_directory_ttl_hours: i64,
    pub league_ttl_hours: i64,
}

impl CacheConfig {
    pub fn valuation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.valuation_ttl_hours)
    }

    pub fn player_directory_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.player_directory_ttl_hours)
    }

    pub fn league_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.league_ttl_hours)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: std::time::Duration::from_millis(self.initial_backoff_ms),
            max_backoff: std::time::Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaguesConfig {
    #[serde(default = "default_first_season")]
    pub first_season: i32,
    /// Last season scanned; defaults to the current year.
    pub last_season: Option<i32>,
}

impl Default for LeaguesConfig {
    fn default() -> Self {
        Self {
            first_season: DEFAULT_FIRST_SEASON,
            last_season: None,
        }
    }
}

fn default_first_season() -> i32 {
    DEFAULT_FIRST_SEASON
}

// ---------------------------------------------------------------------------
// aliases.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct AliasesFile {
    #[serde(default)]
    aliases: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/sources.toml`,
/// `config/analyzer.toml`, and (optionally) `config/aliases.toml`, all
/// relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- sources.toml (required) ---
    let sources: SourcesConfig = parse_file(&config_dir.join("sources.toml"))?;

    // --- analyzer.toml (required) ---
    let analyzer: AnalyzerConfig = parse_file(&config_dir.join("analyzer.toml"))?;

    // --- aliases.toml (optional) ---
    let aliases_path = config_dir.join("aliases.toml");
    let aliases = if aliases_path.exists() {
        parse_file::<AliasesFile>(&aliases_path)?.aliases
    } else {
        HashMap::new()
    };

    let config = Config {
        sources,
        analyzer,
        aliases,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = read_file(path)?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let sources = &config.sources;
    if sources.sleeper.base_url.trim().is_empty() {
        return Err(invalid("sleeper.base_url", "must not be empty"));
    }
    if !sources.ktc.url_template.contains("{page}") {
        return Err(invalid("ktc.url_template", "must contain `{page}`"));
    }
    if sources.ktc.pages == 0 {
        return Err(invalid("ktc.pages", "must be >= 1"));
    }
    let timeouts: &[(&str, u64)] = &[
        ("sleeper.timeout_secs", sources.sleeper.timeout_secs),
        ("ktc.timeout_secs", sources.ktc.timeout_secs),
    ];
    for (name, val) in timeouts {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    let cache = &config.analyzer.cache;
    let ttls: &[(&str, i64)] = &[
        ("cache.valuation_ttl_hours", cache.valuation_ttl_hours),
        ("cache.player_directory_ttl_hours", cache.player_directory_ttl_hours),
        ("cache.league_ttl_hours", cache.league_ttl_hours),
    ];
    for (name, val) in ttls {
        if *val <= 0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }

    let retry = &config.analyzer.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be >= 1"));
    }
    if !(retry.multiplier >= 1.0 && retry.multiplier.is_finite()) {
        return Err(invalid(
            "retry.multiplier",
            format!("must be >= 1.0, got {}", retry.multiplier),
        ));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(invalid(
            "retry.initial_backoff_ms",
            format!(
                "must not exceed retry.max_backoff_ms ({} > {})",
                retry.initial_backoff_ms, retry.max_backoff_ms
            ),
        ));
    }

    let leagues = &config.analyzer.leagues;
    if let Some(last) = leagues.last_season {
        if leagues.first_season > last {
            return Err(invalid(
                "leagues.first_season",
                format!("must not be after last_season ({} > {last})", leagues.first_season),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

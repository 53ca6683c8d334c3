//! Runtime configuration.
//!
//! Loaded from `~/.bunkai/config.json` (missing file means defaults), then
//! environment overrides are applied on top. `.env` files are read by the
//! binary before [`Config::load`] runs, so they behave like real env vars.
//!
//! Recognised overrides:
//!
//! | Variable | Field |
//! |---|---|
//! | `ANTHROPIC_API_KEY` | `provider.api_key` |
//! | `BUNKAI_MODEL` | `provider.model` |
//! | `BUNKAI_BIND` | `server.bind` |
//! | `BUNKAI_PORT` | `server.port` |
//! | `BUNKAI_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `BUNKAI_LOG_FORMAT` | `logging.format` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BunkaiError, Result};

pub use crate::api::config::ServerConfig;

/// Anthropic Messages API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// External analyzer settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Anthropic API key. Empty or whitespace counts as unset.
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub api_base: String,
    /// Upper bound on a single upstream call.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// The API key, if one is actually usable.
    pub fn resolved_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entries older than this are treated as absent.
    pub ttl_secs: u64,
    /// Entry count above which an insert triggers a sweep of expired entries.
    pub sweep_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            sweep_threshold: 100,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = BunkaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(BunkaiError::Config(format!(
                "unknown log format '{other}' (expected 'pretty' or 'json')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Default config file location: `~/.bunkai/config.json`.
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bunkai")
            .join("config.json")
    }

    /// Load from the default path and apply process environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with_env(&Self::path(), |key| std::env::var(key).ok())
    }

    /// Load from `path` and apply process environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Read a config file without touching the environment.
    ///
    /// A missing file yields [`Config::default`]; a present but malformed
    /// file is an error rather than a silent fallback.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                BunkaiError::Config(format!("invalid config file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(BunkaiError::Io(e)),
        }
    }

    fn load_with_env<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides(env)?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Takes a lookup closure instead of reading `std::env` directly so tests
    /// never mutate process-global state.
    pub fn apply_env_overrides<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = env("ANTHROPIC_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = env("BUNKAI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.provider.model = model;
        }
        if let Some(bind) = env("BUNKAI_BIND").filter(|b| !b.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(port) = env("BUNKAI_PORT") {
            self.server.port = parse_number("BUNKAI_PORT", &port)?;
        }
        if let Some(ttl) = env("BUNKAI_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_number("BUNKAI_CACHE_TTL_SECS", &ttl)?;
        }
        if let Some(format) = env("BUNKAI_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BunkaiError::Config(format!("{name} must be a number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.provider.model, DEFAULT_MODEL);
        assert_eq!(cfg.provider.max_tokens, 2048);
        assert_eq!(cfg.provider.timeout_secs, 60);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.ttl_secs, 3600);
        assert_eq!(cfg.cache.sweep_threshold, 100);
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load_from_path(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache":{"ttl_secs":60},"server":{"port":9898}}"#).unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.sweep_threshold, 100);
        assert_eq!(cfg.server.port, 9898);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, BunkaiError::Config(_)));
    }

    #[test]
    fn test_env_overrides_applied() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(env_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("BUNKAI_PORT", "8088"),
            ("BUNKAI_MODEL", "claude-haiku"),
            ("BUNKAI_CACHE_TTL_SECS", "120"),
            ("BUNKAI_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider.resolved_api_key(), Some("sk-test"));
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.provider.model, "claude-haiku");
        assert_eq!(cfg.cache.ttl_secs, 120);
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_port_override_is_error() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides(env_from(&[("BUNKAI_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("BUNKAI_PORT"));
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut cfg = Config::default();
        cfg.provider.api_key = Some("   ".into());
        assert!(cfg.provider.resolved_api_key().is_none());
    }

    #[test]
    fn test_provider_debug_redacts_key() {
        let mut cfg = ProviderConfig::default();
        cfg.api_key = Some("sk-secret".into());
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

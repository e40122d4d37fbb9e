//! Framework configuration.
//!
//! Loaded from YAML and/or environment variables. Every section has defaults, so
//! an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BridgeResult;

pub const ENV_CACHE_ENABLED: &str = "MCP_CACHE_ENABLED";
pub const ENV_CACHE_TTL: &str = "MCP_CACHE_TTL";
pub const ENV_EXCLUDE_TOOLS: &str = "MCP_EXCLUDE_TOOLS";
pub const ENV_LOG_LEVEL: &str = "MCP_LOG_LEVEL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    /// Tool discovery filters
    #[serde(default)]
    pub tools: ToolFilterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity advertised to the host runtime
    #[serde(default)]
    pub server: ServerConfig,
}

/// Shared response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry lifetime (seconds). `0` means entries never expire.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolFilterConfig {
    /// Tools to leave unregistered. Each entry matches either the registered
    /// name (`ci_delete_build`) or the unprefixed tool name (`delete_build`).
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ToolFilterConfig {
    /// Whether a tool is excluded, by its unprefixed name and, when known, its
    /// registered name.
    pub fn is_excluded(&self, local_name: &str, registered_name: Option<&str>) -> bool {
        self.exclude
            .iter()
            .any(|name| name == local_name || Some(name.as_str()) == registered_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    86_400 // 1 day
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_name() -> String {
    "toolbridge".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            instructions: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    pub async fn from_file(path: &str) -> BridgeResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> BridgeResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Configuration from defaults plus process environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CACHE_ENABLED) {
            match parse_bool(&raw) {
                Some(v) => self.cache.enabled = v,
                None => warn!(var = ENV_CACHE_ENABLED, value = %raw, "ignoring invalid boolean"),
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            match raw.trim().parse::<u64>() {
                Ok(v) => self.cache.ttl_seconds = v,
                Err(e) => {
                    warn!(var = ENV_CACHE_TTL, value = %raw, error = %e, "ignoring invalid TTL");
                }
            }
        }

        if let Some(raw) = lookup(ENV_EXCLUDE_TOOLS) {
            self.tools.exclude = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

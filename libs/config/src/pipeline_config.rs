//! Pipeline Configuration Module
//!
//! Loads [`PipelineConfig`] from an optional TOML file with `LEADGEN__`
//! environment overrides. Every field has a default, so an empty source yields
//! a runnable configuration.

use crate::defaults;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use types::{Address, Role, RoutingError, RoutingTable, ADDRESS_PREFIX};

/// Semantic validation failures
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("alignment_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("max_delivery_attempts must be at least 1 when set")]
    ZeroDeliveryAttempts,

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Main pipeline configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Role → seed phrase or literal address
    pub routing: RoutingConfig,

    /// Correlation bridge timing
    pub bridge: BridgeSettings,

    /// Stage settings
    pub pipeline: StageSettings,

    pub logging: LoggingConfig,
}

/// One entry per role. A value starting with `agent1q` is used as a literal
/// address; anything else is treated as a seed phrase.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    pub scraper: String,
    pub alignment: String,
    pub scoring: String,
    pub summary: String,
    pub bridge: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            scraper: defaults::seeds::SCRAPER.to_string(),
            alignment: defaults::seeds::ALIGNMENT.to_string(),
            scoring: defaults::seeds::SCORING.to_string(),
            summary: defaults::seeds::SUMMARY.to_string(),
            bridge: defaults::seeds::BRIDGE.to_string(),
        }
    }
}

impl RoutingConfig {
    pub fn entry(&self, role: Role) -> &str {
        match role {
            Role::Scraper => &self.scraper,
            Role::Alignment => &self.alignment,
            Role::Scoring => &self.scoring,
            Role::Summary => &self.summary,
            Role::Bridge => &self.bridge,
        }
    }

    /// Resolve every entry to an address and build the routing table
    pub fn to_table(&self) -> std::result::Result<RoutingTable, RoutingError> {
        RoutingTable::new(
            Role::ALL
                .iter()
                .map(|role| (*role, resolve_address(self.entry(*role)))),
        )
    }
}

fn resolve_address(entry: &str) -> Address {
    if entry.starts_with(ADDRESS_PREFIX) {
        if let Ok(address) = entry.parse() {
            return address;
        }
        debug!(entry, "Entry looks like an address but does not parse - using it as a seed");
    }
    Address::from_seed(entry)
}

/// Correlation bridge timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub delivery_tick_ms: u64,
    pub poll_interval_ms: u64,
    pub default_timeout_secs: u64,
    /// Unbounded retry when unset
    pub max_delivery_attempts: Option<u32>,
    pub reply_retention_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            delivery_tick_ms: defaults::bridge::DELIVERY_TICK_MS,
            poll_interval_ms: defaults::bridge::POLL_INTERVAL_MS,
            default_timeout_secs: defaults::bridge::DEFAULT_TIMEOUT_SECS,
            max_delivery_attempts: None,
            reply_retention_secs: defaults::bridge::REPLY_RETENTION_SECS,
        }
    }
}

impl BridgeSettings {
    pub fn delivery_tick(&self) -> Duration {
        Duration::from_millis(self.delivery_tick_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn reply_retention(&self) -> Duration {
        Duration::from_secs(self.reply_retention_secs)
    }
}

/// Stage settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StageSettings {
    pub alignment_threshold: f64,
    /// JSON array of leads for the intake stage; built-in leads when unset
    pub lead_file: Option<PathBuf>,
    pub transform_latency_ms: u64,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            alignment_threshold: defaults::pipeline::ALIGNMENT_THRESHOLD,
            lead_file: None,
            transform_latency_ms: defaults::pipeline::TRANSFORM_LATENCY_MS,
        }
    }
}

impl StageSettings {
    pub fn transform_latency(&self) -> Duration {
        Duration::from_millis(self.transform_latency_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Environment::with_prefix(defaults::ENV_PREFIX))
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_with_env(
        path: Option<&Path>,
        env: config_crate::Map<String, String>,
    ) -> Result<Self> {
        Self::load_from(
            path,
            Environment::with_prefix(defaults::ENV_PREFIX).source(Some(env)),
        )
    }

    fn load_from(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (LEADGEN__ prefix)
        builder = builder.add_source(
            environment
                .prefix_separator(defaults::ENV_SEPARATOR)
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.bridge.delivery_tick_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "bridge.delivery_tick_ms",
            });
        }
        if self.bridge.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "bridge.poll_interval_ms",
            });
        }
        if self.bridge.default_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "bridge.default_timeout_secs",
            });
        }
        if self.bridge.reply_retention_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "bridge.reply_retention_secs",
            });
        }
        if self.bridge.max_delivery_attempts == Some(0) {
            return Err(ConfigError::ZeroDeliveryAttempts);
        }
        let threshold = self.pipeline.alignment_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        self.routing.to_table()?;
        Ok(())
    }

    pub fn routing_table(&self) -> std::result::Result<RoutingTable, RoutingError> {
        self.routing.to_table()
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    PipelineConfig::load(path)
}

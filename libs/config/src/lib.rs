//! # Lead Pipeline Configuration
//!
//! Centralized configuration and defaults for the lead pipeline services.
//!
//! ## Features
//!
//! - **Defaults**: timing constants, threshold, seed phrases ([`defaults`])
//! - **Loading**: optional TOML file plus `LEADGEN__SECTION__KEY` environment
//!   overrides ([`PipelineConfig::load`])
//! - **Routing**: role → address table built from seeds or literal addresses
//!
//! ## Usage
//!
//! ```rust
//! use config::PipelineConfig;
//! use types::Role;
//!
//! let config = PipelineConfig::default();
//! let routing = config.routing_table().unwrap();
//! assert!(routing.address(Role::Summary).is_ok());
//! ```

pub mod defaults;
pub mod pipeline_config;

// Re-export commonly used types
pub use pipeline_config::{
    load_config, BridgeSettings, ConfigError, LoggingConfig, PipelineConfig, RoutingConfig,
    StageSettings,
};

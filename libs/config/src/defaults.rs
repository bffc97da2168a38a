//! Default configuration values
//!
//! Shared by the serde defaults in [`crate::pipeline_config`] and by code that
//! builds components without a loaded configuration (tests, examples).

/// Correlation bridge defaults
pub mod bridge {
    /// Outbound delivery loop period (milliseconds)
    pub const DELIVERY_TICK_MS: u64 = 1_000;

    /// `await_result` polling interval (milliseconds)
    pub const POLL_INTERVAL_MS: u64 = 500;

    /// Caller timeout when none is given (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// How long uncollected replies are kept (seconds)
    pub const REPLY_RETENTION_SECS: u64 = 300;
}

/// Pipeline stage defaults
pub mod pipeline {
    /// Minimum alignment score a lead needs to pass the filter
    pub const ALIGNMENT_THRESHOLD: f64 = 0.3;

    /// Simulated transform latency (milliseconds)
    pub const TRANSFORM_LATENCY_MS: u64 = 0;
}

/// Seed phrases the default routing table derives addresses from
pub mod seeds {
    pub const SCRAPER: &str = "scraper_agent_unique_seed_phrase";
    pub const ALIGNMENT: &str = "alignment_agent_unique_seed_phrase";
    pub const SCORING: &str = "scoring_agent_unique_seed_phrase";
    pub const SUMMARY: &str = "summary_agent_unique_seed_phrase";
    pub const BRIDGE: &str = "cli_agent_seed";
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}

/// Prefix for environment overrides, e.g. `LEADGEN__BRIDGE__POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "LEADGEN";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

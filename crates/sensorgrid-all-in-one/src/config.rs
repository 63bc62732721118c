use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Mirror live frames over NATS so other nodes' subscribers see them
    #[serde(default = "default_nats_enabled")]
    pub nats_enabled: bool,

    /// Startup timeout for the NATS connection in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Cache configuration
    /// TTL for cached entity collections and credential lookups, seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    // Fan-out configuration
    /// Bounded capacity of the external delivery queue
    #[serde(default = "default_delivery_queue_capacity")]
    pub delivery_queue_capacity: usize,

    /// Reporting timezone as a fixed UTC offset in hours
    #[serde(default = "default_reporting_offset_hours")]
    pub reporting_offset_hours: i32,

    // Demo configuration
    /// Publish simulated readings from a seeded demo tenant
    #[serde(default = "default_demo_enabled")]
    pub demo_enabled: bool,

    /// Interval between simulated demo readings in seconds
    #[serde(default = "default_demo_interval_secs")]
    pub demo_interval_secs: u64,

    /// Optional HTTP endpoint configured as the demo tenant's live data
    /// target, so decoded readings are also forwarded outbound
    #[serde(default)]
    pub demo_forward_url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_enabled() -> bool {
    false
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// Cache defaults
fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

// Fan-out defaults
fn default_delivery_queue_capacity() -> usize {
    1024
}

fn default_reporting_offset_hours() -> i32 {
    0
}

// Demo defaults
fn default_demo_enabled() -> bool {
    true
}

fn default_demo_interval_secs() -> u64 {
    5
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SENSORGRID"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("SENSORGRID_LOG_LEVEL");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reporting_offset_hours, 0);
        assert!(!config.nats_enabled);
        assert_eq!(config.demo_forward_url, None);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("SENSORGRID_LOG_LEVEL", "debug");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "debug");

        // Clean up
        std::env::remove_var("SENSORGRID_LOG_LEVEL");
    }
}

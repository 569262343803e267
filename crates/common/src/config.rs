//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Feed composition configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Boosted post configuration.
    #[serde(default)]
    pub boost: BoostConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Feed composition configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of boosted posts overlaid per feed page.
    #[serde(default = "default_boost_slot_quota")]
    pub boost_slot_quota: u64,
    /// Default page size when the caller does not specify a limit.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            boost_slot_quota: default_boost_slot_quota(),
            default_page_size: default_page_size(),
        }
    }
}

/// Boosted post configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BoostConfig {
    /// Maximum number of boosts a user may create within the window.
    #[serde(default = "default_weekly_limit")]
    pub weekly_limit: u64,
    /// Length of the boost counting window in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Whether boost creation is restricted to pro accounts.
    #[serde(default = "default_true")]
    pub require_pro: bool,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            weekly_limit: default_weekly_limit(),
            window_days: default_window_days(),
            require_pro: default_true(),
        }
    }
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_boost_slot_quota() -> u64 {
    5
}

const fn default_page_size() -> u64 {
    20
}

const fn default_weekly_limit() -> u64 {
    3
}

const fn default_window_days() -> i64 {
    7
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `COMMUNE_ENV`)
    /// 3. Environment variables with `COMMUNE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("COMMUNE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COMMUNE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("COMMUNE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_config_defaults() {
        let feed = FeedConfig::default();
        assert_eq!(feed.boost_slot_quota, 5);
        assert_eq!(feed.default_page_size, 20);
    }

    #[test]
    fn test_boost_config_defaults() {
        let boost = BoostConfig::default();
        assert_eq!(boost.weekly_limit, 3);
        assert_eq!(boost.window_days, 7);
        assert!(boost.require_pro);
    }
}

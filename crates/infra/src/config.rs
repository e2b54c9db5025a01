//! Runtime configuration, read from the environment.

use serde::Deserialize;
use thiserror::Error;

/// Largest stale window `chrono::Duration` can hold, in seconds.
pub const MAX_STALE_SECS: u64 = (i64::MAX / 1000) as u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Products per page.
    pub page_size: u32,
    /// Distance from the bottom, in pixels, under which the next page loads.
    pub scroll_threshold_px: u32,
    pub products_stale_secs: u64,
    pub options_stale_secs: u64,
    /// Postgres URL. Absent means the in-memory catalog.
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// JSON [`crate::source::CatalogSeed`] loaded into the in-memory catalog.
    pub seed_file: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            scroll_threshold_px: 1000,
            products_stale_secs: 30,
            options_stale_secs: 300,
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            seed_file: None,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup. Unset or blank variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("VITRINE_PAGE_SIZE") {
            config.page_size = parse_number("VITRINE_PAGE_SIZE", &v)?;
            if config.page_size == 0 {
                return Err(invalid("VITRINE_PAGE_SIZE", v));
            }
        }
        if let Some(v) = get("VITRINE_SCROLL_THRESHOLD_PX") {
            config.scroll_threshold_px = parse_number("VITRINE_SCROLL_THRESHOLD_PX", &v)?;
        }
        if let Some(v) = get("VITRINE_PRODUCTS_STALE_SECS") {
            config.products_stale_secs = parse_stale_secs("VITRINE_PRODUCTS_STALE_SECS", &v)?;
        }
        if let Some(v) = get("VITRINE_OPTIONS_STALE_SECS") {
            config.options_stale_secs = parse_stale_secs("VITRINE_OPTIONS_STALE_SECS", &v)?;
        }
        if let Some(v) = get("VITRINE_BIND_ADDR") {
            config.bind_addr = v;
        }
        config.database_url = get("DATABASE_URL");
        config.seed_file = get("VITRINE_SEED_FILE");

        Ok(config)
    }

    pub fn products_max_age(&self) -> chrono::Duration {
        stale_duration(self.products_stale_secs)
    }

    pub fn options_max_age(&self) -> chrono::Duration {
        stale_duration(self.options_stale_secs)
    }
}

fn invalid(var: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected: "a positive integer",
        value,
    }
}

/// Deserialized configs skip `from_lookup`, so the bound is applied here too.
fn stale_duration(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_STALE_SECS) as i64)
}

fn parse_stale_secs(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let secs: u64 = parse_number(var, value)?;
    if secs > MAX_STALE_SECS {
        return Err(ConfigError::Invalid {
            var,
            expected: "a number of seconds a duration can hold",
            value: value.to_string(),
        });
    }
    Ok(secs)
}

fn parse_number<T: core::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected: "a non-negative integer",
        value: value.to_string(),
    })
}

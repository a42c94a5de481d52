// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the guardrails service.
//!
//! Defaults match the limits the directory site applies to its API routes
//! and server actions.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the guardrails service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// SEO guardrail configuration
    #[serde(default)]
    pub seo: SeoConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Sliding-window limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Limit applied when a check request names none (default: 60)
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Window applied when a check request names none, in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub default_window_ms: u64,

    /// How often idle keys are swept, in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Keys whose newest request is older than this are dropped by the sweep (default: 120)
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

/// SEO guardrail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoConfig {
    /// Minimum description + body words for an indexable page (default: 0, disabled)
    #[serde(default)]
    pub min_words: i64,

    /// Maximum SimHash distance treated as a near duplicate (default: 0, exact only)
    #[serde(default)]
    pub near_distance: u32,

    /// Treat duplicate detector failures as "not a duplicate" (default: false)
    #[serde(default)]
    pub fail_open: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_limit() -> u32 {
    60
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_age_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            seo: SeoConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            min_words: 0,
            near_distance: 0,
            fail_open: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Get the idle-key max age
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Config {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// Unset variables keep their default; a set but unparseable value is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        let rl = &mut config.rate_limit;
        override_parsed(&lookup, "RATE_LIMIT", &mut rl.default_limit)?;
        override_parsed(&lookup, "RATE_WINDOW_MS", &mut rl.default_window_ms)?;
        override_parsed(&lookup, "SWEEP_INTERVAL_SECS", &mut rl.sweep_interval_secs)?;
        override_parsed(&lookup, "RATE_MAX_AGE_SECS", &mut rl.max_age_secs)?;

        let seo = &mut config.seo;
        override_parsed(&lookup, "SEO_MIN_WORDS", &mut seo.min_words)?;
        override_parsed(&lookup, "SEO_NEAR_DISTANCE", &mut seo.near_distance)?;
        override_parsed(&lookup, "SEO_FAIL_OPEN", &mut seo.fail_open)?;

        Ok(config)
    }
}

fn override_parsed<F, T>(lookup: &F, name: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.rate_limit.default_limit, 60);
        assert_eq!(config.rate_limit.max_age(), Duration::from_secs(120));
        assert_eq!(config.seo.min_words, 0);
        assert!(!config.seo.fail_open);
        assert_eq!(config.metrics.path, "/metrics");
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("RATE_LIMIT", "5"),
            ("RATE_WINDOW_MS", "1000"),
            ("SEO_MIN_WORDS", "120"),
            ("SEO_NEAR_DISTANCE", "3"),
            ("SEO_FAIL_OPEN", "true"),
        ]))
        .unwrap();
        assert_eq!(config.rate_limit.default_limit, 5);
        assert_eq!(config.rate_limit.default_window_ms, 1000);
        assert_eq!(config.seo.min_words, 120);
        assert_eq!(config.seo.near_distance, 3);
        assert!(config.seo.fail_open);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = Config::from_lookup(lookup_from(&[("RATE_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "RATE_LIMIT", .. }));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"seo": {"min_words": 40}}"#).unwrap();
        assert_eq!(config.seo.min_words, 40);
        assert_eq!(config.rate_limit.sweep_interval_secs, 60);
        assert!(config.metrics.enabled);
    }
}

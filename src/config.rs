use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service configuration
///
/// Loaded from environment variables (a `.env` file is honored by `main`).
/// Every field has a default so the server starts with no configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listen address for HTTP and WebSocket traffic
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Alpha Vantage API key ("demo" only serves a handful of symbols)
    #[serde(default = "default_api_key")]
    pub alpha_vantage_api_key: String,

    /// Alpha Vantage query endpoint
    #[serde(default = "default_base_url")]
    pub alpha_vantage_base_url: String,

    /// Seconds between refresh loop ticks
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Upper bound on a single upstream quote fetch, in milliseconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Number of symbols fetched concurrently during a tick
    #[serde(default = "default_refresh_concurrency")]
    pub refresh_concurrency: usize,

    /// Per-connection outbound queue size
    #[serde(default = "default_outbound_capacity")]
    pub ws_outbound_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            alpha_vantage_api_key: default_api_key(),
            alpha_vantage_base_url: default_base_url(),
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_ms: default_fetch_timeout(),
            refresh_concurrency: default_refresh_concurrency(),
            ws_outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            alpha_vantage_api_key: lookup("ALPHA_VANTAGE_API_KEY")
                .unwrap_or(defaults.alpha_vantage_api_key),
            alpha_vantage_base_url: lookup("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or(defaults.alpha_vantage_base_url),
            refresh_interval_secs: parse_positive(
                &lookup,
                "REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            ),
            fetch_timeout_ms: parse_positive(&lookup, "FETCH_TIMEOUT_MS", defaults.fetch_timeout_ms),
            refresh_concurrency: parse_positive(
                &lookup,
                "REFRESH_CONCURRENCY",
                defaults.refresh_concurrency as u64,
            ) as usize,
            ws_outbound_capacity: parse_positive(
                &lookup,
                "WS_OUTBOUND_CAPACITY",
                defaults.ws_outbound_capacity as u64,
            ) as usize,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms.max(1))
    }
}

/// Parse a numeric variable, falling back to the default on garbage and
/// clamping zero to one
fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) => value.max(1),
            Err(_) => {
                tracing::warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
                default
            }
        },
    }
}

// Default value functions for serde
fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_api_key() -> String {
    "demo".to_string()
}

fn default_base_url() -> String {
    "https://www.alphavantage.co/query".to_string()
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    5000
}

fn default_refresh_concurrency() -> usize {
    4
}

fn default_outbound_capacity() -> usize {
    256
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.alpha_vantage_api_key, "demo");
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(5000));
        assert_eq!(config.refresh_concurrency, 4);
        assert_eq!(config.ws_outbound_capacity, 256);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("REFRESH_INTERVAL_SECS", "30"),
            ("ALPHA_VANTAGE_API_KEY", "secret"),
            ("REFRESH_CONCURRENCY", "8"),
        ]));

        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.alpha_vantage_api_key, "secret");
        assert_eq!(config.refresh_concurrency, 8);
    }

    #[test]
    fn test_invalid_and_zero_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("REFRESH_INTERVAL_SECS", "soon"),
            ("WS_OUTBOUND_CAPACITY", "0"),
        ]));

        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.ws_outbound_capacity, 1);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"fetch_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.fetch_timeout_ms, 250);
        assert_eq!(config.refresh_interval_secs, 60);
    }
}

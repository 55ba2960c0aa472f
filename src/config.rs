//! Application configuration model and defaults.

use std::time::Duration;

use crate::location_matcher::SegmentOrder;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Remote catalog endpoint and timeouts.
    pub upstream: UpstreamConfig,
    #[serde(default)]
    /// Snapshot cache behavior.
    pub cache: CacheConfig,
    #[serde(default)]
    /// Geocoding provider settings.
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    /// Tour-stop interpretation.
    pub locations: LocationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CacheConfig {
    /// How long a fetched snapshot is served before the next refresh.
    #[serde(default = "default_validity_window_secs")]
    pub validity_window_secs: u64,
}

/// Geocoding provider settings. The key is usually supplied via `OPENCAGE_KEY`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_geocoding_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct LocationsConfig {
    #[serde(default)]
    pub segment_order: SegmentOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            validity_window_secs: default_validity_window_secs(),
        }
    }
}

impl CacheConfig {
    pub fn validity_window(&self) -> Duration {
        Duration::from_secs(self.validity_window_secs)
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocoding_endpoint(),
            timeout_secs: default_geocoding_timeout_secs(),
        }
    }
}

impl GeocodingConfig {
    /// Configured key, ignoring blank values.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_upstream_base_url() -> String {
    "https://groupietrackers.herokuapp.com/api".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    15
}

fn default_validity_window_secs() -> u64 {
    600
}

fn default_geocoding_endpoint() -> String {
    "https://api.opencagedata.com/geocode/v1/json".to_string()
}

fn default_geocoding_timeout_secs() -> u64 {
    8
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Config, GeocodingConfig, LogLevel};
    use crate::location_matcher::SegmentOrder;

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert_eq!(
            config.upstream.base_url,
            "https://groupietrackers.herokuapp.com/api"
        );
        assert_eq!(config.upstream.connect_timeout_secs, 5);
        assert_eq!(config.upstream.read_timeout_secs, 15);
        assert_eq!(config.cache.validity_window(), Duration::from_secs(600));
        assert_eq!(config.geocoding.api_key, None);
        assert_eq!(config.geocoding.timeout_secs, 8);
        assert_eq!(
            config.locations.segment_order,
            SegmentOrder::FineToCoarse
        );
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_toml_fills_missing_sections_with_defaults() {
        let text = r#"
[cache]
validity_window_secs = 30

[locations]
segment_order = "coarse_to_fine"
"#;
        let config: Config = toml::from_str(text).expect("config should parse");
        assert_eq!(config.cache.validity_window_secs, 30);
        assert_eq!(
            config.locations.segment_order,
            SegmentOrder::CoarseToFine
        );
        assert_eq!(config.upstream, Config::default().upstream);
        assert_eq!(config.geocoding, Config::default().geocoding);
    }

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let config = GeocodingConfig {
            api_key: Some("   ".to_string()),
            ..GeocodingConfig::default()
        };
        assert_eq!(config.effective_api_key(), None);
    }

    #[test]
    fn test_round_trip_through_toml_preserves_values() {
        let mut config = Config::default();
        config.logging.level = LogLevel::Debug;
        config.geocoding.api_key = Some("abc".to_string());
        let text = toml::to_string(&config).expect("config should serialize");
        let parsed: Config = toml::from_str(&text).expect("config should parse");
        assert_eq!(parsed, config);
    }
}

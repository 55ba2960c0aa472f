//! Error types shared by the catalog, geocoding and config layers.

/// Upstream catalog unavailable or undecodable.
///
/// Holds rendered messages rather than transport errors so a single refresh
/// outcome can be cloned out to every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl FetchError {
    pub fn request(endpoint: &str, message: impl ToString) -> Self {
        Self::Request {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(endpoint: &str, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }
}

/// Geocoding failure for a single location. Never fatal to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("missing geocoding API key (set OPENCAGE_KEY or geocoding.api_key)")]
    MissingApiKey,

    #[error("geocoding request failed: {0}")]
    Request(String),

    #[error("invalid geocoding response: {0}")]
    Decode(String),

    #[error("no geocoding results for {0}")]
    NoResults(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

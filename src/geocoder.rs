//! Tour-stop geocoding with a process-lifetime result cache.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::config::GeocodingConfig;
use crate::errors::GeoError;
use crate::location_matcher::expand_separators;
use crate::protocol::GeoLocation;

/// Provider-side lookup for a single free-text place query.
pub trait GeoLookup: Send + Sync {
    fn lookup(&self, query: &str) -> Result<GeoLocation, GeoError>;
}

/// OpenCage forward geocoding backed by `ureq`.
pub struct OpenCageLookup {
    endpoint: String,
    api_key: Option<String>,
    http_client: ureq::Agent,
}

impl OpenCageLookup {
    pub fn new(config: &GeocodingConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: config.endpoint.trim().to_string(),
            api_key: config.effective_api_key().map(ToOwned::to_owned),
            http_client,
        }
    }

    fn request_url(&self, query: &str, api_key: &str) -> String {
        format!(
            "{}?q={}&key={}&limit=1",
            self.endpoint,
            urlencoding::encode(query),
            urlencoding::encode(api_key)
        )
    }

    fn parse_response(query: &str, body: &str) -> Result<GeoLocation, GeoError> {
        let parsed: Value =
            serde_json::from_str(body).map_err(|error| GeoError::Decode(error.to_string()))?;
        let first = parsed
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .ok_or_else(|| GeoError::NoResults(query.to_string()))?;
        let geometry = first
            .get("geometry")
            .ok_or_else(|| GeoError::Decode("result without geometry".to_string()))?;
        let lat = geometry.get("lat").and_then(Value::as_f64);
        let lng = geometry.get("lng").and_then(Value::as_f64);
        let (Some(lat), Some(lng)) = (lat, lng) else {
            return Err(GeoError::Decode("geometry without lat/lng".to_string()));
        };
        let display_name = first
            .get("formatted")
            .and_then(Value::as_str)
            .unwrap_or(query)
            .to_string();
        Ok(GeoLocation {
            display_name,
            lat,
            lng,
        })
    }
}

impl GeoLookup for OpenCageLookup {
    fn lookup(&self, query: &str) -> Result<GeoLocation, GeoError> {
        let api_key = self.api_key.as_deref().ok_or(GeoError::MissingApiKey)?;
        let response = self
            .http_client
            .get(&self.request_url(query, api_key))
            .set("Accept", "application/json")
            .call()
            .map_err(|error| GeoError::Request(error.to_string()))?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| GeoError::Request(format!("failed to read body: {error}")))?;
        Self::parse_response(query, &body)
    }
}

/// Caching front for a [`GeoLookup`].
///
/// Entries are keyed by the raw upstream string and never evicted. Only
/// successes are cached.
pub struct Geocoder {
    lookup: Box<dyn GeoLookup>,
    cache: RwLock<HashMap<String, GeoLocation>>,
}

impl Geocoder {
    pub fn new(lookup: Box<dyn GeoLookup>) -> Self {
        Self {
            lookup,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &GeocodingConfig) -> Self {
        Self::new(Box::new(OpenCageLookup::new(config)))
    }

    pub fn cached(&self, raw_location: &str) -> Option<GeoLocation> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(raw_location)
            .cloned()
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn geocode(&self, raw_location: &str) -> Result<GeoLocation, GeoError> {
        if let Some(hit) = self.cached(raw_location) {
            return Ok(hit);
        }

        // No lock is held across the provider call.
        let query = expand_separators(raw_location);
        debug!("Geocoding '{}' as '{}'", raw_location, query);
        let location = self.lookup.lookup(&query)?;

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(raw_location.to_string(), location.clone());
        Ok(location)
    }
}

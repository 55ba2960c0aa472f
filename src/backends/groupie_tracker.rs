//! Groupie Trackers catalog gateway backed by `ureq`.

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use crate::backends::CatalogGateway;
use crate::config::UpstreamConfig;
use crate::errors::FetchError;
use crate::protocol::{Artist, LocationIndex};

const USER_AGENT: &str = "tourdex/0.1.0";

#[derive(Debug, serde::Deserialize)]
struct LocationIndexPayload {
    #[serde(default)]
    index: Vec<LocationIndexEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct LocationIndexEntry {
    id: u32,
    #[serde(default)]
    locations: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct DatesPayload {
    #[serde(default)]
    dates: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct LocationsPayload {
    #[serde(default)]
    locations: Vec<String>,
}

/// Gateway for the public Groupie Trackers JSON API.
pub struct GroupieTrackerGateway {
    base_url: String,
    http_client: ureq::Agent,
}

impl GroupieTrackerGateway {
    pub fn new(config: &UpstreamConfig) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .timeout_write(Duration::from_secs(config.read_timeout_secs))
            .build();
        Self {
            base_url: Self::endpoint_base(&config.base_url),
            http_client,
        }
    }

    fn endpoint_base(endpoint: &str) -> String {
        endpoint.trim().trim_end_matches('/').to_string()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.api_url(path);
        debug!("Catalog request: GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call()
            .map_err(|error| FetchError::request(path, error))?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| FetchError::request(path, format!("failed to read body: {error}")))?;
        decode_payload(path, &body)
    }
}

fn decode_payload<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|error| FetchError::decode(path, error))
}

fn location_index_from_payload(payload: LocationIndexPayload) -> LocationIndex {
    payload
        .index
        .into_iter()
        .map(|entry| (entry.id, entry.locations))
        .collect()
}

impl CatalogGateway for GroupieTrackerGateway {
    fn fetch_artists(&self) -> Result<Vec<Artist>, FetchError> {
        self.request_json("artists")
    }

    fn fetch_location_index(&self) -> Result<LocationIndex, FetchError> {
        self.request_json::<LocationIndexPayload>("locations")
            .map(location_index_from_payload)
    }

    fn fetch_dates(&self, artist_id: u32) -> Result<Vec<String>, FetchError> {
        self.request_json::<DatesPayload>(&format!("dates/{artist_id}"))
            .map(|payload| payload.dates)
    }

    fn fetch_locations(&self, artist_id: u32) -> Result<Vec<String>, FetchError> {
        self.request_json::<LocationsPayload>(&format!("locations/{artist_id}"))
            .map(|payload| payload.locations)
    }
}

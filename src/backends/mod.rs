//! Upstream catalog gateway abstractions and concrete implementations.

pub mod groupie_tracker;

use crate::errors::FetchError;
use crate::protocol::{Artist, LocationIndex};

/// Interface implemented by concrete upstream catalog gateways.
///
/// Each call is one round trip; a failure never yields a partial result.
pub trait CatalogGateway: Send + Sync {
    fn fetch_artists(&self) -> Result<Vec<Artist>, FetchError>;
    fn fetch_location_index(&self) -> Result<LocationIndex, FetchError>;
    fn fetch_dates(&self, artist_id: u32) -> Result<Vec<String>, FetchError>;
    fn fetch_locations(&self, artist_id: u32) -> Result<Vec<String>, FetchError>;
}

//! Per-artist detail view: tour dates, tour stops and their map points.

use log::warn;

use crate::backends::CatalogGateway;
use crate::catalog_cache::CatalogSnapshot;
use crate::geocoder::Geocoder;
use crate::protocol::{Artist, GeoLocation};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ArtistDetail {
    pub artist: Artist,
    pub dates: Vec<String>,
    pub locations: Vec<String>,
    pub geo_points: Vec<GeoLocation>,
}

/// Assembles the detail view for `artist_id`, or `None` if it is unknown.
///
/// Upstream and geocoding failures degrade to empty/omitted entries.
pub fn load_artist_detail(
    snapshot: &CatalogSnapshot,
    gateway: &dyn CatalogGateway,
    geocoder: &Geocoder,
    artist_id: u32,
) -> Option<ArtistDetail> {
    let artist = snapshot.artist(artist_id)?.clone();

    let dates = gateway.fetch_dates(artist_id).unwrap_or_else(|err| {
        warn!("Dates unavailable for artist {}: {}", artist_id, err);
        Vec::new()
    });
    let locations = gateway.fetch_locations(artist_id).unwrap_or_else(|err| {
        warn!("Locations unavailable for artist {}: {}", artist_id, err);
        Vec::new()
    });

    let geo_points = locations
        .iter()
        .filter_map(|location| match geocoder.geocode(location) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!("Geocode failed for '{}': {}", location, err);
                None
            }
        })
        .collect();

    Some(ArtistDetail {
        artist,
        dates,
        locations,
        geo_points,
    })
}

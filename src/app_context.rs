use std::sync::Arc;

use crate::{
    artist_detail::{load_artist_detail, ArtistDetail},
    artist_filter::{apply_filters_with, suggest_artists},
    backends::{groupie_tracker::GroupieTrackerGateway, CatalogGateway},
    catalog_cache::{CatalogCache, CatalogSnapshot},
    config::Config,
    errors::FetchError,
    filter_query::FilterQuery,
    geocoder::Geocoder,
    location_matcher::LocationMatcher,
    protocol::{Artist, ArtistSuggestion},
};

/// Services built once at startup and shared by handle with every caller.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogCache>,
    pub geocoder: Arc<Geocoder>,
}

/// One filtered listing plus the option set it was filtered against.
pub struct FilteredListing {
    pub artists: Vec<Artist>,
    pub location_options: Vec<String>,
}

impl AppServices {
    pub fn new(gateway: Arc<dyn CatalogGateway>, geocoder: Geocoder, config: &Config) -> Self {
        let matcher = LocationMatcher::new(config.locations.segment_order);
        Self {
            catalog: Arc::new(CatalogCache::new(
                gateway,
                matcher,
                config.cache.validity_window(),
            )),
            geocoder: Arc::new(geocoder),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let gateway: Arc<dyn CatalogGateway> =
            Arc::new(GroupieTrackerGateway::new(&config.upstream));
        Self::new(gateway, Geocoder::from_config(&config.geocoding), config)
    }

    pub fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, FetchError> {
        self.catalog.get_snapshot()
    }

    pub fn filtered_artists(
        &self,
        query: &FilterQuery,
    ) -> Result<FilteredListing, FetchError> {
        let snapshot = self.snapshot()?;
        let artists = apply_filters_with(
            self.catalog.matcher(),
            &snapshot.artists,
            &snapshot.locations,
            query,
        );
        Ok(FilteredListing {
            artists,
            location_options: snapshot.location_options.clone(),
        })
    }

    pub fn suggestions(
        &self,
        raw: &str,
        limit: usize,
    ) -> Result<Vec<ArtistSuggestion>, FetchError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = self.snapshot()?;
        Ok(suggest_artists(&snapshot.artists, raw, limit))
    }

    pub fn artist_detail(
        &self,
        artist_id: u32,
    ) -> Result<Option<ArtistDetail>, FetchError> {
        let snapshot = self.snapshot()?;
        Ok(load_artist_detail(
            &snapshot,
            self.catalog.gateway().as_ref(),
            &self.geocoder,
            artist_id,
        ))
    }
}

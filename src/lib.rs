//! Artist catalog aggregation with cached snapshots and multi-predicate
//! filtering (text search, numeric and date ranges, hierarchical tour-stop
//! membership).

pub mod app_context;
pub mod artist_detail;
pub mod artist_filter;
pub mod backends;
pub mod catalog_cache;
pub mod config;
pub mod config_persistence;
pub mod errors;
pub mod filter_query;
pub mod geocoder;
pub mod location_matcher;
pub mod protocol;

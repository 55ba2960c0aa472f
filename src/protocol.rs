//! Shared catalog payload types passed between the gateway, cache and filters.

use std::collections::HashMap;

/// Raw tour stops per artist id, in upstream order.
pub type LocationIndex = HashMap<u32, Vec<String>>;

/// One artist record as served by the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub creation_date: i32,
    /// `DD-MM-YYYY` as published upstream. Not validated on decode.
    #[serde(default)]
    pub first_album: String,
}

impl Artist {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Geocoded point for one tour stop.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GeoLocation {
    #[serde(rename = "name")]
    pub display_name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Lightweight name completion entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtistSuggestion {
    pub id: u32,
    pub name: String,
}

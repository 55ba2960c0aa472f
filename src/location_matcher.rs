//! Tour-stop normalization and hierarchical location matching.
//!
//! Upstream feeds spell the same place several ways (`seattle-washington-usa`,
//! `Seattle, Washington, USA`, `new_york-usa`). Everything here works on the
//! normalized segment form so a selected filter such as `"washington, usa"`
//! matches any stop within that region, whatever city it names.

use std::collections::BTreeSet;

use crate::protocol::LocationIndex;

/// Order in which upstream location strings list their segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOrder {
    /// `city, region, country`; the coarse end is the tail.
    #[default]
    FineToCoarse,
    /// `country, region, city`; the coarse end is the head.
    CoarseToFine,
}

/// Rewrites the separator conventions used by upstream feeds into comma form.
///
/// This is also the text sent to the geocoding provider.
pub fn expand_separators(raw: &str) -> String {
    raw.replace('_', " ").replace('-', ", ")
}

/// Splits a raw location into trimmed, lowercase, non-empty segments.
pub fn normalize(raw: &str) -> Vec<String> {
    expand_separators(raw)
        .split(',')
        .map(|segment| segment.trim().to_lowercase())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Stateless matcher parameterized by segment order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationMatcher {
    order: SegmentOrder,
}

impl LocationMatcher {
    pub fn new(order: SegmentOrder) -> Self {
        Self { order }
    }

    /// The `len` coarsest segments of `segments`, in their original order.
    fn coarse_run<'a>(&self, segments: &'a [String], len: usize) -> &'a [String] {
        match self.order {
            SegmentOrder::FineToCoarse => &segments[segments.len() - len..],
            SegmentOrder::CoarseToFine => &segments[..len],
        }
    }

    /// Returns `true` when `selected` names `candidate` or a region containing it.
    pub fn matches(&self, candidate_raw: &str, selected_raw: &str) -> bool {
        let candidate = normalize(candidate_raw);
        let selected = normalize(selected_raw);
        if candidate.is_empty() || selected.is_empty() || selected.len() > candidate.len() {
            return false;
        }
        self.coarse_run(&candidate, selected.len()) == selected.as_slice()
    }

    /// Inclusive OR over selected filters and the artist's tour stops.
    ///
    /// No selection matches everything; blank selections are skipped.
    pub fn matches_any_location(
        &self,
        artist_id: u32,
        index: &LocationIndex,
        selected: &[String],
    ) -> bool {
        if selected.is_empty() {
            return true;
        }
        let artist_locations = index.get(&artist_id).map(Vec::as_slice).unwrap_or(&[]);
        selected
            .iter()
            .filter(|selection| !selection.trim().is_empty())
            .any(|selection| {
                artist_locations
                    .iter()
                    .any(|location| self.matches(location, selection))
            })
    }

    /// Every selectable region derived from the indexed tour stops, sorted.
    pub fn unique_location_options(&self, index: &LocationIndex) -> Vec<String> {
        let mut options = BTreeSet::new();
        for location in index.values().flatten() {
            let segments = normalize(location);
            for len in 1..=segments.len() {
                options.insert(self.coarse_run(&segments, len).join(", "));
            }
        }
        options.into_iter().collect()
    }
}

pub fn matches(candidate_raw: &str, selected_raw: &str) -> bool {
    LocationMatcher::default().matches(candidate_raw, selected_raw)
}

pub fn matches_any_location(artist_id: u32, index: &LocationIndex, selected: &[String]) -> bool {
    LocationMatcher::default().matches_any_location(artist_id, index, selected)
}

pub fn unique_location_options(index: &LocationIndex) -> Vec<String> {
    LocationMatcher::default().unique_location_options(index)
}

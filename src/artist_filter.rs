//! Multi-predicate artist filtering and name suggestions.

use chrono::NaiveDate;

use crate::filter_query::{parse_fixed_width_date, FilterQuery};
use crate::location_matcher::LocationMatcher;
use crate::protocol::{Artist, ArtistSuggestion, LocationIndex};

/// Date layout of `Artist::first_album` as published upstream.
pub const FIRST_ALBUM_DATE_FORMAT: &str = "%d-%m-%Y";

pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Everything a predicate may look at for one artist.
struct FilterContext<'a> {
    query: &'a FilterQuery,
    needle: String,
    index: &'a LocationIndex,
    matcher: LocationMatcher,
}

type ArtistPredicate = fn(&FilterContext<'_>, &Artist) -> bool;

/// Evaluated left to right; the first `false` rejects the artist.
const PREDICATES: [ArtistPredicate; 5] = [
    matches_search,
    within_creation_range,
    within_member_range,
    within_first_album_range,
    within_selected_locations,
];

pub fn parse_first_album(raw: &str) -> Option<NaiveDate> {
    parse_fixed_width_date(raw, FIRST_ALBUM_DATE_FORMAT)
}

fn within_bounds<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    if min.as_ref().is_some_and(|min| value < *min) {
        return false;
    }
    !max.as_ref().is_some_and(|max| value > *max)
}

fn matches_search(ctx: &FilterContext<'_>, artist: &Artist) -> bool {
    if ctx.needle.is_empty() {
        return true;
    }
    artist.name.to_lowercase().contains(&ctx.needle)
        || artist
            .members
            .iter()
            .any(|member| member.to_lowercase().contains(&ctx.needle))
}

fn within_creation_range(ctx: &FilterContext<'_>, artist: &Artist) -> bool {
    within_bounds(
        i64::from(artist.creation_date),
        ctx.query.creation_min,
        ctx.query.creation_max,
    )
}

fn within_member_range(ctx: &FilterContext<'_>, artist: &Artist) -> bool {
    let member_count = i64::try_from(artist.member_count()).unwrap_or(i64::MAX);
    within_bounds(member_count, ctx.query.members_min, ctx.query.members_max)
}

/// An unparsable first-album date never satisfies an active date range.
fn within_first_album_range(ctx: &FilterContext<'_>, artist: &Artist) -> bool {
    if !ctx.query.has_first_album_bounds() {
        return true;
    }
    parse_first_album(&artist.first_album).is_some_and(|released| {
        within_bounds(
            released,
            ctx.query.first_album_min,
            ctx.query.first_album_max,
        )
    })
}

fn within_selected_locations(ctx: &FilterContext<'_>, artist: &Artist) -> bool {
    ctx.matcher
        .matches_any_location(artist.id, ctx.index, &ctx.query.locations)
}

/// Filters `artists` with the default fine-to-coarse location matcher.
pub fn apply_filters(
    artists: &[Artist],
    index: &LocationIndex,
    query: &FilterQuery,
) -> Vec<Artist> {
    apply_filters_with(LocationMatcher::default(), artists, index, query)
}

/// Returns the artists passing every active predicate, in input order.
pub fn apply_filters_with(
    matcher: LocationMatcher,
    artists: &[Artist],
    index: &LocationIndex,
    query: &FilterQuery,
) -> Vec<Artist> {
    let ctx = FilterContext {
        query,
        needle: query.search.trim().to_lowercase(),
        index,
        matcher,
    };
    artists
        .iter()
        .filter(|artist| PREDICATES.iter().all(|predicate| predicate(&ctx, artist)))
        .cloned()
        .collect()
}

/// Case-insensitive name-prefix completion, in catalog order.
pub fn suggest_artists(artists: &[Artist], raw: &str, limit: usize) -> Vec<ArtistSuggestion> {
    let prefix = raw.trim().to_lowercase();
    if prefix.is_empty() {
        return Vec::new();
    }
    artists
        .iter()
        .filter(|artist| artist.name.to_lowercase().starts_with(&prefix))
        .take(limit)
        .map(|artist| ArtistSuggestion {
            id: artist.id,
            name: artist.name.clone(),
        })
        .collect()
}

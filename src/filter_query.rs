//! Request parameters to typed filter predicates.
//!
//! Every field parses independently: a malformed value only drops that one
//! constraint, it never fails the whole query.

use chrono::NaiveDate;

/// Date layout accepted for `first_album_min` / `first_album_max`.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive filter bounds for one request. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub search: String,
    pub creation_min: Option<i64>,
    pub creation_max: Option<i64>,
    pub members_min: Option<i64>,
    pub members_max: Option<i64>,
    pub first_album_min: Option<NaiveDate>,
    pub first_album_max: Option<NaiveDate>,
    pub locations: Vec<String>,
}

impl FilterQuery {
    /// Builds a query from decoded key/value pairs.
    ///
    /// Scalar keys take their first occurrence; `location` accumulates.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut search = None;
        let mut creation_min = None;
        let mut creation_max = None;
        let mut members_min = None;
        let mut members_max = None;
        let mut first_album_min = None;
        let mut first_album_max = None;
        let mut locations = Vec::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "q" => {
                    search.get_or_insert_with(|| value.trim().to_string());
                }
                "creation_min" => {
                    creation_min.get_or_insert(parse_optional_int(value));
                }
                "creation_max" => {
                    creation_max.get_or_insert(parse_optional_int(value));
                }
                "members_min" => {
                    members_min.get_or_insert(parse_optional_int(value));
                }
                "members_max" => {
                    members_max.get_or_insert(parse_optional_int(value));
                }
                "first_album_min" => {
                    first_album_min.get_or_insert(parse_optional_date(value));
                }
                "first_album_max" => {
                    first_album_max.get_or_insert(parse_optional_date(value));
                }
                "location" => locations.push(value.trim().to_string()),
                _ => {}
            }
        }

        Self {
            search: search.unwrap_or_default(),
            creation_min: creation_min.flatten(),
            creation_max: creation_max.flatten(),
            members_min: members_min.flatten(),
            members_max: members_max.flatten(),
            first_album_min: first_album_min.flatten(),
            first_album_max: first_album_max.flatten(),
            locations,
        }
    }

    /// Parses a raw `a=b&c=d` query string (leading `?` allowed).
    pub fn from_query_string(raw: &str) -> Self {
        Self::from_pairs(decode_query_pairs(raw))
    }

    pub fn has_first_album_bounds(&self) -> bool {
        self.first_album_min.is_some() || self.first_album_max.is_some()
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }
}

/// Splits and percent-decodes a query string. `+` reads as a space.
pub fn decode_query_pairs(raw: &str) -> Vec<(String, String)> {
    raw.trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Blank or non-integer input is absent, never zero.
pub fn parse_optional_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

pub fn parse_optional_date(raw: &str) -> Option<NaiveDate> {
    parse_fixed_width_date(raw, QUERY_DATE_FORMAT)
}

/// Parses `raw` only when it has exactly the zero-padded shape of `format`.
///
/// `format` may use `%Y` (four digits), `%m` and `%d` (two digits each) and
/// literal ASCII separators. Short years, unpadded fields and signed years are
/// rejected even where chrono alone would accept them.
pub fn parse_fixed_width_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let shape = format
        .replace("%Y", "####")
        .replace("%m", "##")
        .replace("%d", "##");
    if trimmed.len() != shape.len() {
        return None;
    }
    let shaped = trimmed
        .bytes()
        .zip(shape.bytes())
        .all(|(byte, expected)| match expected {
            b'#' => byte.is_ascii_digit(),
            literal => byte == literal,
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, format).ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        decode_query_pairs, parse_fixed_width_date, parse_optional_date, parse_optional_int,
        FilterQuery,
    };

    #[test]
    fn test_empty_input_is_unconstrained() {
        let query = FilterQuery::from_query_string("");
        assert!(query.is_unconstrained());
        assert!(!query.has_first_album_bounds());
    }

    #[test]
    fn test_search_is_trimmed() {
        let query = FilterQuery::from_pairs([("q", "  queen  ")]);
        assert_eq!(query.search, "queen");
    }

    #[test]
    fn test_integer_bounds_parse_and_invalid_becomes_absent() {
        let query = FilterQuery::from_pairs([
            ("creation_min", "1970"),
            ("creation_max", "abc"),
            ("members_min", " 4 "),
            ("members_max", ""),
        ]);
        assert_eq!(query.creation_min, Some(1970));
        assert_eq!(query.creation_max, None);
        assert_eq!(query.members_min, Some(4));
        assert_eq!(query.members_max, None);
    }

    #[test]
    fn test_zero_is_a_real_bound_not_absence() {
        assert_eq!(parse_optional_int("0"), Some(0));
        assert_eq!(parse_optional_int("-3"), Some(-3));
        assert_eq!(parse_optional_int("3.5"), None);
    }

    #[test]
    fn test_date_bounds_use_year_month_day() {
        let query = FilterQuery::from_pairs([
            ("first_album_min", "1990-01-31"),
            ("first_album_max", "31-01-1999"),
        ]);
        assert_eq!(
            query.first_album_min,
            NaiveDate::from_ymd_opt(1990, 1, 31)
        );
        assert_eq!(query.first_album_max, None);
        assert!(query.has_first_album_bounds());
    }

    #[test]
    fn test_invalid_calendar_date_is_absent() {
        assert_eq!(parse_optional_date("2021-02-30"), None);
        assert_eq!(parse_optional_date("   "), None);
    }

    #[test]
    fn test_date_bounds_require_zero_padded_full_year() {
        assert_eq!(parse_optional_date("2021-1-5"), None);
        assert_eq!(parse_optional_date("99-01-05"), None);
        assert_eq!(parse_optional_date("+2021-01-05"), None);
        assert_eq!(parse_optional_date("2021/01/05"), None);
        assert_eq!(
            parse_optional_date(" 2021-01-05 "),
            NaiveDate::from_ymd_opt(2021, 1, 5)
        );
    }

    #[test]
    fn test_fixed_width_date_follows_format_layout() {
        assert_eq!(
            parse_fixed_width_date("05-06-2002", "%d-%m-%Y"),
            NaiveDate::from_ymd_opt(2002, 6, 5)
        );
        assert_eq!(parse_fixed_width_date("5-6-2002", "%d-%m-%Y"), None);
        assert_eq!(parse_fixed_width_date("2002-06-05", "%d-%m-%Y"), None);
    }

    #[test]
    fn test_malformed_date_bound_is_absent_in_query() {
        let query = FilterQuery::from_pairs([("first_album_min", "99-01-05")]);
        assert_eq!(query.first_album_min, None);
        assert!(!query.has_first_album_bounds());
    }

    #[test]
    fn test_location_repeats_and_is_trimmed() {
        let query = FilterQuery::from_pairs([
            ("location", " Washington, USA "),
            ("location", "france"),
        ]);
        assert_eq!(query.locations, vec!["Washington, USA", "france"]);
    }

    #[test]
    fn test_first_scalar_occurrence_wins() {
        let query = FilterQuery::from_pairs([("members_min", "2"), ("members_min", "5")]);
        assert_eq!(query.members_min, Some(2));
    }

    #[test]
    fn test_first_scalar_occurrence_wins_even_when_unparsable() {
        let query = FilterQuery::from_pairs([("members_min", "x"), ("members_min", "5")]);
        assert_eq!(query.members_min, None);
    }

    #[test]
    fn test_query_string_is_percent_decoded() {
        let query = FilterQuery::from_query_string(
            "?q=the+beatles&location=Washington%2C%20USA&location=usa&creation_min=1960",
        );
        assert_eq!(query.search, "the beatles");
        assert_eq!(query.locations, vec!["Washington, USA", "usa"]);
        assert_eq!(query.creation_min, Some(1960));
    }

    #[test]
    fn test_decode_query_pairs_keeps_keys_without_values() {
        assert_eq!(
            decode_query_pairs("q&members_min=3"),
            vec![
                ("q".to_string(), String::new()),
                ("members_min".to_string(), "3".to_string()),
            ]
        );
    }
}

//! Favorite ids handed between views as a navigation parameter.
//!
//! The store stays authoritative. A well-formed parameter only overrides it
//! for deep links, and a disagreement between the two is reported, not merged.

use serde::Serialize;
use tracing::{debug, warn};

/// Name of the navigation parameter carrying the encoded ids.
pub const FAVORITES_PARAM: &str = "favoriteMovieIds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoritesSource {
    Store,
    Navigation,
}

/// JSON array of integers, e.g. `[550,13]`.
pub fn encode_ids(ids: &[i32]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Absent or malformed input decodes to no ids.
pub fn decode_ids(raw: Option<&str>) -> Vec<i32> {
    try_decode(raw).unwrap_or_default()
}

fn try_decode(raw: Option<&str>) -> Option<Vec<i32>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Vec<i32>>(raw) {
        Ok(ids) => Some(ids),
        Err(e) => {
            debug!("Ignoring malformed {} parameter: {}", FAVORITES_PARAM, e);
            None
        }
    }
}

/// Pick the ids a favorites view should show.
pub fn choose_source(stored: Vec<i32>, param: Option<&str>) -> (Vec<i32>, FavoritesSource) {
    let Some(passed) = try_decode(param) else {
        return (stored, FavoritesSource::Store);
    };
    if !same_members(&stored, &passed) {
        warn!(
            stored = %encode_ids(&stored),
            passed = %encode_ids(&passed),
            "Navigation snapshot disagrees with stored favorites; using the snapshot"
        );
    }
    (passed, FavoritesSource::Navigation)
}

fn same_members(a: &[i32], b: &[i32]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    a.dedup();
    b.sort_unstable();
    b.dedup();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ordered_ids() {
        for ids in [vec![], vec![7], vec![9, 3, 9, -4, i32::MAX, i32::MIN]] {
            let encoded = encode_ids(&ids);
            assert_eq!(decode_ids(Some(&encoded)), ids);
        }
        assert_eq!(encode_ids(&[550, 13]), "[550,13]");
    }

    #[test]
    fn encoding_is_compact() {
        assert_eq!(encode_ids(&[]), "[]");
        assert_eq!(encode_ids(&[1, -2, 300]), "[1,-2,300]");
    }

    #[test]
    fn malformed_or_absent_input_is_empty() {
        assert!(decode_ids(None).is_empty());
        assert!(decode_ids(Some("")).is_empty());
        assert!(decode_ids(Some("not json")).is_empty());
        assert!(decode_ids(Some("[1, \"two\"]")).is_empty());
        assert!(decode_ids(Some("{\"ids\":[1]}")).is_empty());
        assert!(decode_ids(Some("[1.5]")).is_empty());
        assert_eq!(decode_ids(Some(" [1, 2] ")), vec![1, 2]);
    }

    #[test]
    fn store_wins_without_a_usable_parameter() {
        let (ids, source) = choose_source(vec![1, 2], None);
        assert_eq!((ids, source), (vec![1, 2], FavoritesSource::Store));

        let (ids, source) = choose_source(vec![1, 2], Some("garbage"));
        assert_eq!((ids, source), (vec![1, 2], FavoritesSource::Store));
    }

    #[test]
    fn parameter_overrides_even_when_stale() {
        let (ids, source) = choose_source(vec![1, 2], Some("[2,1]"));
        assert_eq!((ids, source), (vec![2, 1], FavoritesSource::Navigation));

        let (ids, source) = choose_source(vec![1, 2], Some("[]"));
        assert_eq!((ids, source), (vec![], FavoritesSource::Navigation));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Wire sentinel for "no genre filter"
pub const ALL_GENRES: &str = "all";

/// Label older clients send for the sentinel
const LEGACY_ALL_GENRES: &str = "All Genres";

/// User-chosen search, genre and ordering for the catalog view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub genre: GenreFilter,
    #[serde(default)]
    pub sort: SortKey,
}

/// Genre selection: everything, or one exact (case-sensitive) genre
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenreFilter {
    #[default]
    All,
    Exact(String),
}

impl GenreFilter {
    pub fn matches(&self, genre: &str) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Exact(wanted) => wanted == genre,
        }
    }
}

impl From<String> for GenreFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == ALL_GENRES || value == LEGACY_ALL_GENRES {
            GenreFilter::All
        } else {
            GenreFilter::Exact(value)
        }
    }
}

impl From<GenreFilter> for String {
    fn from(value: GenreFilter) -> Self {
        match value {
            GenreFilter::All => ALL_GENRES.to_string(),
            GenreFilter::Exact(genre) => genre,
        }
    }
}

/// Ordering applied after filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Keep the store's creation-descending order
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
    #[serde(rename = "tempo-low", alias = "bpm-low")]
    TempoLow,
    #[serde(rename = "tempo-high", alias = "bpm-high")]
    TempoHigh,
}

/// Item ids suggested by the recommender; empty means no narrowing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet(HashSet<String>);

impl RecommendationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for RecommendationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_sentinels() {
        assert_eq!(GenreFilter::from("all".to_string()), GenreFilter::All);
        assert_eq!(GenreFilter::from("All Genres".to_string()), GenreFilter::All);
        assert_eq!(GenreFilter::from(String::new()), GenreFilter::All);
        assert_eq!(
            GenreFilter::from("Trap".to_string()),
            GenreFilter::Exact("Trap".to_string())
        );
    }

    #[test]
    fn test_genre_match_is_case_sensitive() {
        let filter = GenreFilter::Exact("Trap".to_string());
        assert!(filter.matches("Trap"));
        assert!(!filter.matches("trap"));
        assert!(GenreFilter::All.matches("anything"));
    }

    #[test]
    fn test_sort_key_serialization() {
        assert_eq!(serde_json::to_string(&SortKey::PriceLow).unwrap(), "\"price-low\"");
        let legacy: SortKey = serde_json::from_str("\"bpm-high\"").unwrap();
        assert_eq!(legacy, SortKey::TempoHigh);
    }

    #[test]
    fn test_filter_params_defaults() {
        let params: FilterParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, FilterParams::default());
        assert_eq!(params.sort, SortKey::Newest);
        assert_eq!(params.genre, GenreFilter::All);
    }

    #[test]
    fn test_recommendation_set_from_iter() {
        let set: RecommendationSet = ["a", "b", "a"].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        assert!(!set.contains("c"));
    }
}

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{CatalogItem, FilterParams, SortKey};

/// Derives the displayed catalog from a snapshot and the user's filters
///
/// Steps run in a fixed order: text filter on title/producer, exact genre
/// filter, then a stable sort. `SortKey::Newest` keeps the snapshot order,
/// which the store delivers newest first.
pub fn derive_view(items: &[CatalogItem], params: &FilterParams) -> Vec<CatalogItem> {
    let query = params.query.to_lowercase();

    let mut view: Vec<CatalogItem> = items
        .iter()
        .filter(|item| matches_query(item, &query))
        .filter(|item| params.genre.matches(&item.genre))
        .cloned()
        .collect();

    if let Some(compare) = comparator(params.sort) {
        // `sort_by` is stable: ties keep their snapshot order
        view.sort_by(compare);
    }

    view
}

/// Genres present in the snapshot, in order of first appearance
pub fn derive_genres(items: &[CatalogItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| seen.insert(item.genre.as_str()).then(|| item.genre.clone()))
        .collect()
}

/// `query` must already be lowercase
fn matches_query(item: &CatalogItem, query: &str) -> bool {
    query.is_empty()
        || item.title.to_lowercase().contains(query)
        || item.producer.to_lowercase().contains(query)
}

type Comparator = fn(&CatalogItem, &CatalogItem) -> Ordering;

fn comparator(sort: SortKey) -> Option<Comparator> {
    match sort {
        SortKey::Newest => None,
        SortKey::PriceLow => Some(price_ascending as Comparator),
        SortKey::PriceHigh => Some(price_descending as Comparator),
        SortKey::TempoLow => Some(tempo_ascending as Comparator),
        SortKey::TempoHigh => Some(tempo_descending as Comparator),
    }
}

fn price_ascending(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.price.cmp(&b.price)
}

fn price_descending(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    b.price.cmp(&a.price)
}

fn tempo_ascending(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.tempo.cmp(&b.tempo)
}

fn tempo_descending(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    b.tempo.cmp(&a.tempo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;
    use crate::models::GenreFilter;

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn params(query: &str, genre: GenreFilter, sort: SortKey) -> FilterParams {
        FilterParams {
            query: query.to_string(),
            genre,
            sort,
        }
    }

    fn mixed_catalog() -> Vec<CatalogItem> {
        vec![
            item("a", "Young King", "Trap", 300, 140),
            item("b", "Night Drive", "Drill", 100, 150),
            item("c", "Cold Summer", "Trap", 200, 90),
            item("d", "Ocean Eyes", "Afrobeat", 100, 105),
        ]
    }

    #[test]
    fn test_empty_params_is_identity() {
        let catalog = mixed_catalog();
        let view = derive_view(&catalog, &FilterParams::default());
        assert_eq!(view, catalog);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let view = derive_view(&[], &params("king", GenreFilter::All, SortKey::PriceHigh));
        assert!(view.is_empty());
    }

    #[test]
    fn test_derive_view_is_idempotent() {
        let catalog = mixed_catalog();
        let all_params = [
            params("", GenreFilter::All, SortKey::PriceLow),
            params("o", GenreFilter::All, SortKey::TempoHigh),
            params("", GenreFilter::Exact("Trap".to_string()), SortKey::PriceHigh),
            params("night", GenreFilter::Exact("Drill".to_string()), SortKey::Newest),
        ];

        for p in all_params {
            let once = derive_view(&catalog, &p);
            let twice = derive_view(&once, &p);
            assert_eq!(once, twice, "not idempotent for {:?}", p);
        }
    }

    #[test]
    fn test_price_low_is_stable_on_ties() {
        let catalog = vec![
            item("a", "A", "Trap", 100, 140),
            item("b", "B", "Trap", 200, 140),
            item("c", "C", "Trap", 100, 140),
        ];
        let view = derive_view(&catalog, &params("", GenreFilter::All, SortKey::PriceLow));
        assert_eq!(ids(&view), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_price_directions_reverse_distinct_prices() {
        let catalog = vec![
            item("a", "A", "Trap", 300, 140),
            item("b", "B", "Trap", 100, 140),
            item("c", "C", "Trap", 200, 140),
        ];
        let low = derive_view(&catalog, &params("", GenreFilter::All, SortKey::PriceLow));
        let high = derive_view(&catalog, &params("", GenreFilter::All, SortKey::PriceHigh));

        let mut reversed = ids(&high);
        reversed.reverse();
        assert_eq!(ids(&low), reversed);
    }

    #[test]
    fn test_price_high_keeps_tie_order() {
        let catalog = mixed_catalog();
        let view = derive_view(&catalog, &params("", GenreFilter::All, SortKey::PriceHigh));
        // b and d share a price; b comes first in the snapshot
        assert_eq!(ids(&view), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_tempo_sorts() {
        let catalog = mixed_catalog();
        let low = derive_view(&catalog, &params("", GenreFilter::All, SortKey::TempoLow));
        assert_eq!(ids(&low), vec!["c", "d", "a", "b"]);
        let high = derive_view(&catalog, &params("", GenreFilter::All, SortKey::TempoHigh));
        assert_eq!(ids(&high), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn test_genre_filter_keeps_relative_order() {
        let catalog = vec![
            item("a", "A", "Trap", 100, 140),
            item("b", "B", "Drill", 100, 140),
            item("c", "C", "Trap", 100, 140),
        ];
        let view = derive_view(
            &catalog,
            &params("", GenreFilter::Exact("Trap".to_string()), SortKey::Newest),
        );
        assert_eq!(ids(&view), vec!["a", "c"]);
    }

    #[test]
    fn test_query_matches_title_case_insensitively() {
        let catalog = mixed_catalog();
        let view = derive_view(&catalog, &params("king", GenreFilter::All, SortKey::Newest));
        assert_eq!(ids(&view), vec!["a"]);
    }

    #[test]
    fn test_query_matches_producer() {
        let mut catalog = mixed_catalog();
        catalog[1].producer = "Metro Ghost".to_string();
        let view = derive_view(&catalog, &params("GHOST", GenreFilter::All, SortKey::Newest));
        assert_eq!(ids(&view), vec!["b"]);
    }

    #[test]
    fn test_query_ignores_description_genre_and_mood() {
        let mut catalog = vec![item("x", "Ocean Eyes", "Kingston Dub", 100, 90)];
        catalog[0].description = "made for a king".to_string();
        catalog[0].mood = vec!["kingly".to_string()];

        let view = derive_view(&catalog, &params("king", GenreFilter::All, SortKey::Newest));
        assert!(view.is_empty());
    }

    #[test]
    fn test_derive_genres_first_occurrence_order() {
        let catalog = mixed_catalog();
        assert_eq!(derive_genres(&catalog), vec!["Trap", "Drill", "Afrobeat"]);
        assert!(derive_genres(&[]).is_empty());
    }
}

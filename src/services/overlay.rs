use std::borrow::Cow;

use crate::models::{CatalogItem, RecommendationSet};

/// Narrows a list to the recommended ids
///
/// An empty set means no narrowing and hands back the input untouched.
/// Recommended ids that are not in `items` are ignored.
pub fn apply_overlay<'a>(
    items: &'a [CatalogItem],
    recommended: &RecommendationSet,
) -> Cow<'a, [CatalogItem]> {
    if recommended.is_empty() {
        return Cow::Borrowed(items);
    }

    Cow::Owned(
        items
            .iter()
            .filter(|item| recommended.contains(&item.id))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            item("a", "A", "Trap", 100, 140),
            item("b", "B", "Drill", 100, 140),
            item("c", "C", "Trap", 100, 140),
        ]
    }

    #[test]
    fn test_empty_set_returns_input_unchanged() {
        let items = catalog();
        let view = apply_overlay(&items, &RecommendationSet::new());
        assert!(matches!(view, Cow::Borrowed(_)));
        assert!(std::ptr::eq(view.as_ptr(), items.as_ptr()));
    }

    #[test]
    fn test_preserves_item_order() {
        let items = catalog();
        let recommended: RecommendationSet = ["c", "a"].into_iter().collect();
        let view = apply_overlay(&items, &recommended);
        let ids: Vec<&str> = view.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let items = catalog();
        let recommended: RecommendationSet = ["b", "ghost", "phantom"].into_iter().collect();
        let view = apply_overlay(&items, &recommended);
        assert_eq!(view.len(), 1);
        assert!(view.iter().all(|i| items.iter().any(|orig| orig.id == i.id)));
    }

    #[test]
    fn test_only_unknown_ids_yields_empty() {
        let items = catalog();
        let recommended: RecommendationSet = ["ghost"].into_iter().collect();
        assert!(apply_overlay(&items, &recommended).is_empty());
    }
}

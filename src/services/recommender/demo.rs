use crate::{
    error::{AppError, AppResult},
    models::CatalogItem,
    services::recommender::{Recommender, DEMO_TAG, MAX_SUGGESTIONS},
};

const DEMO_LYRICS: &str = "[Hook]\n\
Running up the numbers while the city sleeps\n\
Every single bar I drop is something that I keep\n\n\
[Verse]\n\
Started from the bottom with a dream and a beat\n\
Now the whole block moving when the bass hit the street\n\n\
(Demo mode: connect an AI key for custom lyrics)";

/// Local stand-in used when no AI credential is configured
///
/// Matching is a plain keyword check: an item qualifies when its genre, one
/// of its moods, or its title appears in the lowercased prompt.
#[derive(Debug, Clone, Default)]
pub struct DemoRecommender;

impl DemoRecommender {
    pub fn new() -> Self {
        Self
    }

    fn matches(item: &CatalogItem, prompt: &str) -> bool {
        let hit = |word: &str| {
            let word = word.trim().to_lowercase();
            !word.is_empty() && prompt.contains(&word)
        };
        hit(item.genre.as_str())
            || item.mood.iter().any(|m| hit(m.as_str()))
            || hit(item.title.as_str())
    }
}

#[async_trait::async_trait]
impl Recommender for DemoRecommender {
    async fn match_items(&self, prompt: &str, catalog: &[CatalogItem]) -> AppResult<String> {
        let prompt = prompt.to_lowercase();
        let ids: Vec<&str> = catalog
            .iter()
            .filter(|item| Self::matches(item, &prompt))
            .take(MAX_SUGGESTIONS)
            .map(|item| item.id.as_str())
            .collect();

        Ok(format!(
            "{} AI is in Demo Mode. Picked beats whose genre, mood or title fit your request.\n\nIDs: [{}]",
            DEMO_TAG,
            ids.join(", ")
        ))
    }

    async fn generate_text(&self, _title: &str, _description: &str) -> AppResult<String> {
        Ok(DEMO_LYRICS.to_string())
    }

    async fn synthesize_speech(&self, _text: &str) -> AppResult<String> {
        Err(AppError::Unavailable(
            "Speech needs a live AI key".to_string(),
        ))
    }

    fn is_live(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;
    use crate::services::recommender::recommend;

    fn catalog() -> Vec<CatalogItem> {
        let mut moody = item("m", "Midnight", "Afrobeat", 100, 105);
        moody.mood = vec!["Chill".to_string()];
        vec![
            item("t1", "Young King", "Trap", 100, 140),
            item("d1", "Night Drive", "Drill", 100, 150),
            moody,
            item("t2", "Cold Summer", "Trap", 100, 90),
            item("t3", "Gold Rush", "Trap", 100, 130),
            item("t4", "Last One", "Trap", 100, 130),
        ]
    }

    #[tokio::test]
    async fn test_matches_genre_capped_at_three() {
        let suggestion = recommend(&DemoRecommender::new(), "Some hard TRAP please", &catalog())
            .await
            .unwrap();
        assert_eq!(suggestion.ids, vec!["t1", "t2", "t3"]);
        assert!(suggestion.text.starts_with("AI is in Demo Mode"));
    }

    #[tokio::test]
    async fn test_matches_mood_and_title() {
        let suggestion = recommend(&DemoRecommender::new(), "chill vibes like night drive", &catalog())
            .await
            .unwrap();
        assert_eq!(suggestion.ids, vec!["d1", "m"]);
    }

    #[tokio::test]
    async fn test_no_match_yields_no_ids() {
        let suggestion = recommend(&DemoRecommender::new(), "polka", &catalog())
            .await
            .unwrap();
        assert!(suggestion.ids.is_empty());
    }

    #[tokio::test]
    async fn test_speech_is_unavailable() {
        let err = DemoRecommender::new().synthesize_speech("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(!DemoRecommender::new().is_live());
    }

    #[tokio::test]
    async fn test_lyrics_are_canned() {
        let lyrics = DemoRecommender::new().generate_text("Any", "thing").await.unwrap();
        assert!(lyrics.contains("[Hook]"));
    }
}

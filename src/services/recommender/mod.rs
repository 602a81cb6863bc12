/// Generative-AI collaborator abstraction
///
/// A recommender matches a free-text "vibe" against the catalog, writes
/// lyrics for a beat, and reads lyrics aloud. The live implementation talks
/// to the Generative Language API; the demo implementation runs locally when
/// no credential is configured.
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{CatalogItem, RecommendationSet},
};

pub mod demo;
pub mod gemini;

pub use demo::DemoRecommender;
pub use gemini::GeminiRecommender;

/// Tag the demo recommender puts in front of its replies
pub const DEMO_TAG: &str = "[CATALOG CORE]";

/// Most items a single recommendation should name
pub const MAX_SUGGESTIONS: usize = 3;

/// Trait for generative-AI providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Recommender: Send + Sync {
    /// Raw reply to a matching request
    ///
    /// The reply ends with a line of the form `IDs: [id1, id2]`.
    async fn match_items(&self, prompt: &str, catalog: &[CatalogItem]) -> AppResult<String>;

    /// Writes a hook and verse for a beat
    async fn generate_text(&self, title: &str, description: &str) -> AppResult<String>;

    /// Reads text aloud
    ///
    /// Returns base64 of little-endian 16-bit PCM, 24 kHz mono. Fails with
    /// `Unavailable` when no live backend is configured.
    async fn synthesize_speech(&self, text: &str) -> AppResult<String>;

    /// Whether replies come from a live model rather than the local fallback
    fn is_live(&self) -> bool;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Parsed recommender reply
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Reply with the trailing id list and demo tag removed
    pub text: String,
    /// Suggested ids in the order the model listed them
    pub ids: Vec<String>,
}

impl Suggestion {
    pub fn recommendation_set(&self) -> RecommendationSet {
        self.ids.iter().cloned().collect()
    }
}

/// Picks the live recommender when a usable key is configured
pub fn from_config(config: &Config) -> Arc<dyn Recommender> {
    match config.live_ai_key() {
        Some(key) => {
            tracing::info!(model = %config.ai_text_model, "Using live recommender");
            Arc::new(GeminiRecommender::new(
                key.to_string(),
                config.ai_api_url.clone(),
                config.ai_text_model.clone(),
                config.ai_speech_model.clone(),
                config.ai_voice.clone(),
            ))
        }
        None => {
            tracing::warn!("No AI credential configured, recommender running in demo mode");
            Arc::new(DemoRecommender::new())
        }
    }
}

/// Asks the recommender for matches and splits the reply into text and ids
pub async fn recommend(
    recommender: &dyn Recommender,
    prompt: &str,
    catalog: &[CatalogItem],
) -> AppResult<Suggestion> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("Describe the sound you are after".to_string()));
    }

    let reply = recommender.match_items(prompt, catalog).await.map_err(|e| {
        tracing::warn!(provider = recommender.name(), error = %e, "Recommendation failed");
        e
    })?;
    let suggestion = parse_suggestion(&reply);

    tracing::info!(
        provider = recommender.name(),
        suggested = suggestion.ids.len(),
        "Recommendation completed"
    );

    Ok(suggestion)
}

static IDS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IDs:\s*\[?([\w\s,-]+)\]?").expect("id list pattern compiles"));

static TRAILER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IDs:.*$").expect("trailer pattern compiles"));

/// Extracts the `IDs: [...]` list and the display text from a reply
pub fn parse_suggestion(reply: &str) -> Suggestion {
    let ids = IDS_PATTERN
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|list| {
            list.as_str()
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let text = TRAILER_PATTERN
        .replace(reply, "")
        .replacen(DEMO_TAG, "", 1)
        .trim()
        .to_string();

    Suggestion { text, ids }
}

/// One line per item, used as context in prompts
pub(crate) fn catalog_context(catalog: &[CatalogItem]) -> String {
    catalog
        .iter()
        .map(|item| {
            format!(
                "{}: {} ({}, {}, {} BPM) - {}",
                item.id,
                item.title,
                item.genre,
                item.mood.join(", "),
                item.tempo,
                item.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::item;

    #[test]
    fn test_parse_bracketed_ids() {
        let suggestion =
            parse_suggestion("Try these dark trap joints.\n\nIDs: [beat_1, beat_2]");
        assert_eq!(suggestion.ids, vec!["beat_1", "beat_2"]);
        assert_eq!(suggestion.text, "Try these dark trap joints.");
    }

    #[test]
    fn test_parse_unbracketed_ids() {
        let suggestion = parse_suggestion("Here you go. IDs: a-1, b_2 ,c3");
        assert_eq!(suggestion.ids, vec!["a-1", "b_2", "c3"]);
        assert_eq!(suggestion.text, "Here you go.");
    }

    #[test]
    fn test_parse_without_ids() {
        let suggestion = parse_suggestion("Nothing fits that vibe, sorry.");
        assert!(suggestion.ids.is_empty());
        assert_eq!(suggestion.text, "Nothing fits that vibe, sorry.");
    }

    #[test]
    fn test_parse_empty_id_list() {
        let suggestion = parse_suggestion("No matches.\n\nIDs: []");
        assert!(suggestion.ids.is_empty());
        assert_eq!(suggestion.text, "No matches.");
    }

    #[test]
    fn test_parse_strips_demo_tag() {
        let reply = format!("{} Demo reply.\n\nIDs: [x]", DEMO_TAG);
        let suggestion = parse_suggestion(&reply);
        assert_eq!(suggestion.text, "Demo reply.");
        assert_eq!(suggestion.recommendation_set().len(), 1);
    }

    #[test]
    fn test_patterns_compile() {
        assert!(IDS_PATTERN.is_match("IDs: [a]"));
        assert!(TRAILER_PATTERN.is_match("IDs: [a]"));
    }

    #[test]
    fn test_catalog_context_lines() {
        let mut beat = item("b1", "Young King", "Trap", 100, 140);
        beat.mood = vec!["dark".to_string(), "hype".to_string()];
        beat.description = "Heavy 808s".to_string();
        assert_eq!(
            catalog_context(&[beat]),
            "b1: Young King (Trap, dark, hype, 140 BPM) - Heavy 808s"
        );
    }

    #[tokio::test]
    async fn test_recommend_rejects_blank_prompt() {
        let recommender = MockRecommender::new();
        let err = recommend(&recommender, "   ", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_recommend_parses_reply() {
        let mut recommender = MockRecommender::new();
        recommender
            .expect_match_items()
            .times(1)
            .returning(|_, _| Ok("Two heaters.\nIDs: [a, b]".to_string()));
        recommender.expect_name().return_const("mock");

        let suggestion = recommend(&recommender, "dark trap", &[]).await.unwrap();
        assert_eq!(suggestion.ids, vec!["a", "b"]);
        assert_eq!(suggestion.text, "Two heaters.");
    }

    #[tokio::test]
    async fn test_recommend_keeps_auth_rejection_distinct() {
        let mut recommender = MockRecommender::new();
        recommender
            .expect_match_items()
            .returning(|_, _| Err(AppError::AuthRejected("API key invalid".to_string())));
        recommender.expect_name().return_const("mock");

        let err = recommend(&recommender, "drill", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRejected(_)));
    }
}

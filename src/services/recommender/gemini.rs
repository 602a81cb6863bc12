/// Generative Language API recommender
///
/// All three operations go through `POST {api_url}/models/{model}:generateContent`
/// with the key in the `x-goog-api-key` header. Speech uses a separate model and
/// asks for an AUDIO response modality; the audio comes back as base64 PCM in
/// the first candidate's inline data.
use crate::{
    error::{AppError, AppResult},
    models::CatalogItem,
    services::recommender::{catalog_context, Recommender, MAX_SUGGESTIONS},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

const MATCH_INSTRUCTION: &str = "You are a beat curator for an online beat store. \
Only recommend beats from the list you are given and always finish with the ids you picked.";

const LYRICS_INSTRUCTION: &str = "You are a songwriter for an independent record label.";

const MATCH_TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct GeminiRecommender {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    text_model: String,
    speech_model: String,
    voice: String,
}

impl GeminiRecommender {
    pub fn new(
        api_key: String,
        api_url: String,
        text_model: String,
        speech_model: String,
        voice: String,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            text_model,
            speech_model,
            voice,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_url, model)
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> AppResult<GenerateResponse> {
        let response = self
            .http_client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("AI service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(model = %model, status = %status, body = %body, "AI request rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AppError::AuthRejected("AI service rejected the configured API key".to_string())
                }
                _ => AppError::ExternalApi(format!(
                    "AI service returned status {}: {}",
                    status, body
                )),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl Recommender for GeminiRecommender {
    async fn match_items(&self, prompt: &str, catalog: &[CatalogItem]) -> AppResult<String> {
        let text = format!(
            "User request: \"{}\". Beats:\n{}\nRecommend up to {}. End with IDs: [ID1, ID2].",
            prompt,
            catalog_context(catalog),
            MAX_SUGGESTIONS
        );

        let request = GenerateRequest {
            contents: vec![Content::user(text)],
            system_instruction: Some(Content::system(MATCH_INSTRUCTION)),
            generation_config: Some(GenerationConfig {
                temperature: Some(MATCH_TEMPERATURE),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.text_model, &request).await?;
        response
            .first_text()
            .ok_or_else(|| AppError::ExternalApi("AI reply had no text".to_string()))
    }

    async fn generate_text(&self, title: &str, description: &str) -> AppResult<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(lyrics_prompt(title, description))],
            system_instruction: Some(Content::system(LYRICS_INSTRUCTION)),
            generation_config: None,
        };

        let response = self.generate(&self.text_model, &request).await?;
        response
            .first_text()
            .ok_or_else(|| AppError::ExternalApi("AI reply had no lyrics".to_string()))
    }

    async fn synthesize_speech(&self, text: &str) -> AppResult<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(speech_prompt(text))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                }),
            }),
        };

        let response = self.generate(&self.speech_model, &request).await?;
        response
            .first_audio()
            .ok_or_else(|| AppError::ExternalApi("AI reply had no audio".to_string()))
    }

    fn is_live(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// The vibe line is only added when there is a description
fn lyrics_prompt(title: &str, description: &str) -> String {
    let mut prompt = format!("Write a hook and verse for a song called \"{}\".", title);
    let description = description.trim();
    if !description.is_empty() {
        prompt.push_str(" Vibe: ");
        prompt.push_str(description);
    }
    prompt
}

fn speech_prompt(text: &str) -> String {
    format!("Speak this lyrics: {}", text)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text.to_string())],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .into_iter()
            .flat_map(|candidate| candidate.content.parts.iter())
    }

    /// Concatenated text of the first candidate
    fn first_text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|part| part.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn first_audio(&self) -> Option<String> {
        self.parts()
            .find_map(|part| part.inline_data.as_ref())
            .map(|inline| inline.data.clone())
            .filter(|data| !data.is_empty())
    }
}

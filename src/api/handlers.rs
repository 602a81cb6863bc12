use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogItemDraft, FilterParams, GenreFilter, LicenseTier, SortKey, UserProfile},
    services::{
        accounts, apply_overlay, decode_pcm, derive_genres, derive_view, handoff_link, recommend,
        AssetUpload, Handoff, PcmAudio,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub profile: Option<UserProfile>,
    pub can_manage_catalog: bool,
}

#[derive(Debug, Deserialize)]
pub struct AdminSignInRequest {
    pub email: String,
    pub passcode: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub stage_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ArtistSignInRequest {
    pub email: String,
}

/// Catalog query string; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub genre: GenreFilter,
    #[serde(default)]
    pub sort: SortKey,
}

impl From<CatalogQuery> for FilterParams {
    fn from(q: CatalogQuery) -> Self {
        FilterParams {
            query: q.query,
            genre: q.genre,
            sort: q.sort,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// False until the first snapshot has arrived
    pub loaded: bool,
    /// True when a recommendation set narrowed `items`
    pub matched: bool,
    pub items: Vec<CatalogItem>,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(flatten)]
    pub draft: CatalogItemDraft,
    /// Base64 audio bytes, uploaded as MP3
    #[serde(default)]
    pub audio_base64: Option<String>,
    /// Base64 cover bytes, uploaded as JPEG
    #[serde(default)]
    pub cover_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssistantStatus {
    pub live: bool,
    pub provider: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub text: String,
    pub ids: Vec<String>,
    /// Snapshot items that survived the overlay
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize)]
pub struct LyricsRequest {
    pub item_id: String,
}

#[derive(Debug, Serialize)]
pub struct LyricsResponse {
    pub item_id: String,
    pub lyrics: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub item_id: String,
    #[serde(default)]
    pub tier: LicenseTier,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let inner = state.inner.read().await;
    let profile = inner.session.current().cloned();
    let can_manage_catalog = profile
        .as_ref()
        .is_some_and(|p| state.policy.can_manage_catalog(p));

    Json(SessionResponse {
        profile,
        can_manage_catalog,
    })
}

pub async fn sign_in_admin(
    State(state): State<AppState>,
    Json(request): Json<AdminSignInRequest>,
) -> AppResult<Json<UserProfile>> {
    let profile = accounts::sign_in_admin(
        state.policy.as_ref(),
        state.profiles.as_ref(),
        &request.email,
        &request.passcode,
    )
    .await?;

    state.sign_in(profile.clone()).await;
    Ok(Json(profile))
}

pub async fn register_artist(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile =
        accounts::register_artist(state.profiles.as_ref(), &request.stage_name, &request.email)
            .await?;

    state.sign_in(profile.clone()).await;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn sign_in_artist(
    State(state): State<AppState>,
    Json(request): Json<ArtistSignInRequest>,
) -> AppResult<Json<UserProfile>> {
    let profile = accounts::sign_in_artist(state.profiles.as_ref(), &request.email).await?;

    state.sign_in(profile.clone()).await;
    Ok(Json(profile))
}

pub async fn sign_out(State(state): State<AppState>) -> StatusCode {
    state.sign_out().await;
    StatusCode::NO_CONTENT
}

/// Filtered, sorted and (when a match is active) narrowed catalog
pub async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<CatalogResponse> {
    let snapshot = state.snapshot();
    let params = FilterParams::from(query);

    let view = derive_view(&snapshot.items, &params);
    let inner = state.inner.read().await;
    let items = apply_overlay(&view, &inner.recommended).into_owned();

    Json(CatalogResponse {
        loaded: snapshot.loaded,
        matched: !inner.recommended.is_empty(),
        items,
        genres: derive_genres(&snapshot.items),
    })
}

pub async fn get_genres(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(derive_genres(&state.snapshot().items))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    {
        let inner = state.inner.read().await;
        state.require_admin(&inner)?;
    }

    let audio = request.audio_base64.as_deref().map(decode_asset).transpose()?;
    let cover = request.cover_base64.as_deref().map(decode_asset).transpose()?;

    let id = state.sync.create_item(request.draft, audio, cover).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    {
        let inner = state.inner.read().await;
        state.require_admin(&inner)?;
    }

    state.sync.delete_item(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assistant_status(State(state): State<AppState>) -> Json<AssistantStatus> {
    Json(AssistantStatus {
        live: state.recommender.is_live(),
        provider: state.recommender.name(),
    })
}

/// Asks the recommender for matches and narrows the catalog to them
pub async fn match_catalog(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> AppResult<Json<MatchResponse>> {
    let requester = state.current_profile().await?;

    let snapshot = state.snapshot();
    let suggestion = recommend(state.recommender.as_ref(), &request.prompt, &snapshot.items).await?;
    let recommended = suggestion.recommendation_set();
    let items = apply_overlay(&snapshot.items, &recommended).into_owned();

    {
        // The session may have changed while the recommender was working
        let mut inner = state.inner.write().await;
        let still_current = AppState::require_profile(&inner)?;
        if still_current.id != requester.id {
            tracing::warn!(user_id = %requester.id, "Session changed during match, result dropped");
            return Err(AppError::AuthRejected(
                "Session changed while matching".to_string(),
            ));
        }
        inner.recommended = recommended;
    }

    Ok(Json(MatchResponse {
        text: suggestion.text,
        ids: suggestion.ids,
        items,
    }))
}

pub async fn clear_match(State(state): State<AppState>) -> AppResult<StatusCode> {
    let mut inner = state.inner.write().await;
    AppState::require_profile(&inner)?;
    inner.recommended.clear();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn generate_lyrics(
    State(state): State<AppState>,
    Json(request): Json<LyricsRequest>,
) -> AppResult<Json<LyricsResponse>> {
    state.current_profile().await?;

    let snapshot = state.snapshot();
    let item = snapshot
        .items
        .iter()
        .find(|item| item.id == request.item_id)
        .ok_or_else(|| AppError::NotFound(format!("Catalog item {}", request.item_id)))?;

    let lyrics = state
        .recommender
        .generate_text(&item.title, &item.description)
        .await?;

    Ok(Json(LyricsResponse {
        item_id: item.id.clone(),
        lyrics,
    }))
}

pub async fn synthesize_speech(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> AppResult<Json<PcmAudio>> {
    state.current_profile().await?;

    if request.text.trim().is_empty() {
        return Err(AppError::InvalidInput("Nothing to read aloud".to_string()));
    }

    let encoded = state.recommender.synthesize_speech(&request.text).await?;
    let audio = decode_pcm(&encoded)?;

    tracing::info!(samples = audio.samples.len(), "Speech synthesized");

    Ok(Json(audio))
}

pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<Handoff>> {
    let buyer = state.current_profile().await?;

    let snapshot = state.snapshot();
    let item = snapshot
        .items
        .iter()
        .find(|item| item.id == request.item_id)
        .ok_or_else(|| AppError::NotFound(format!("Catalog item {}", request.item_id)))?;

    let handoff = handoff_link(item, request.tier, &buyer.email, &state.checkout)?;
    Ok(Json(handoff))
}

/// Accepts plain base64 or a `data:<mime>;base64,` URL
fn decode_asset(encoded: &str) -> AppResult<AssetUpload> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::InvalidInput(format!("Asset is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::InvalidInput("Asset is empty".to_string()));
    }

    Ok(AssetUpload::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_asset() {
        let asset = decode_asset(&STANDARD.encode(b"ID3")).unwrap();
        assert_eq!(asset.bytes, b"ID3");
    }

    #[test]
    fn test_decode_data_url_asset() {
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode([0xff, 0xd8]));
        assert_eq!(decode_asset(&url).unwrap().bytes, vec![0xff, 0xd8]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_asset("%%%"), Err(AppError::InvalidInput(_))));
        assert!(matches!(decode_asset(""), Err(AppError::InvalidInput(_))));
    }
}

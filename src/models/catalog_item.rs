use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::AppError;

/// One licensable beat offered in the catalog
///
/// Equality treats `mood` as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    /// Producer label shown next to the title
    pub producer: String,
    pub genre: String,
    /// Mood tags; order carries no meaning
    pub mood: Vec<String>,
    /// Tempo in BPM
    pub tempo: u32,
    /// Base price in the smallest currency unit
    pub price: u64,
    /// Locator of the primary audio asset
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub description: String,
    #[serde(default)]
    pub is_hot: bool,
    #[serde(default)]
    pub is_trending: bool,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Compares mood tags as sets
    pub fn same_moods(&self, other: &CatalogItem) -> bool {
        let mine: HashSet<&str> = self.mood.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.mood.iter().map(String::as_str).collect();
        mine == theirs
    }
}

impl PartialEq for CatalogItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.producer == other.producer
            && self.genre == other.genre
            && self.same_moods(other)
            && self.tempo == other.tempo
            && self.price == other.price
            && self.audio_url == other.audio_url
            && self.cover_url == other.cover_url
            && self.description == other.description
            && self.is_hot == other.is_hot
            && self.is_trending == other.is_trending
            && self.created_at == other.created_at
    }
}

/// Admin-supplied metadata for a new catalog item
///
/// The id, timestamp and uploaded asset locators are filled in by the
/// sync adapter's write path.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItemDraft {
    pub title: String,
    pub producer: String,
    pub genre: String,
    /// Either a list of tags or the admin form's comma separated text
    #[serde(default, deserialize_with = "deserialize_moods")]
    pub mood: Vec<String>,
    pub tempo: u32,
    pub price: u64,
    /// Pre-existing audio locator, used when no audio bytes are uploaded
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_hot: bool,
    #[serde(default)]
    pub is_trending: bool,
}

impl CatalogItemDraft {
    /// Checks the fields that the store cannot check for us
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        if self.tempo == 0 {
            return Err(AppError::InvalidInput("Tempo must be positive".to_string()));
        }
        if self.price == 0 {
            return Err(AppError::InvalidInput("Price must be positive".to_string()));
        }
        Ok(())
    }

    /// Splits a comma separated mood field into trimmed, non-empty tags
    pub fn parse_moods(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MoodField {
    List(Vec<String>),
    Text(String),
}

fn deserialize_moods<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MoodField::deserialize(deserializer)? {
        MoodField::List(tags) => tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        MoodField::Text(raw) => CatalogItemDraft::parse_moods(&raw),
    })
}

/// Fully resolved row handed to the store on insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogItem {
    pub id: String,
    pub title: String,
    pub producer: String,
    pub genre: String,
    pub mood: Vec<String>,
    pub tempo: u32,
    pub price: u64,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub description: String,
    pub is_hot: bool,
    pub is_trending: bool,
}

impl NewCatalogItem {
    pub fn from_draft(
        id: String,
        draft: CatalogItemDraft,
        audio_url: String,
        cover_url: Option<String>,
    ) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            producer: draft.producer,
            genre: draft.genre,
            mood: draft.mood,
            tempo: draft.tempo,
            price: draft.price,
            audio_url,
            cover_url,
            description: draft.description,
            is_hot: draft.is_hot,
            is_trending: draft.is_trending,
        }
    }

    /// Materializes the row the way the store would report it back
    pub fn into_item(self, created_at: DateTime<Utc>) -> CatalogItem {
        CatalogItem {
            id: self.id,
            title: self.title,
            producer: self.producer,
            genre: self.genre,
            mood: self.mood,
            tempo: self.tempo,
            price: self.price,
            audio_url: self.audio_url,
            cover_url: self.cover_url,
            description: self.description,
            is_hot: self.is_hot,
            is_trending: self.is_trending,
            created_at,
        }
    }
}

// ============================================================================
// Database row types
// ============================================================================

/// Raw `catalog_items` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogRow {
    pub id: String,
    pub title: String,
    pub producer: String,
    pub genre: String,
    pub mood: Option<Vec<String>>,
    pub bpm: i32,
    pub price: i64,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub is_hot: Option<bool>,
    pub is_trending: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogItem {
    type Error = AppError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let tempo = u32::try_from(row.bpm)
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| AppError::Internal(format!("Item {} has invalid tempo {}", row.id, row.bpm)))?;
        let price = u64::try_from(row.price)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| AppError::Internal(format!("Item {} has invalid price {}", row.id, row.price)))?;

        Ok(CatalogItem {
            id: row.id,
            title: row.title,
            producer: row.producer,
            genre: row.genre,
            mood: row.mood.unwrap_or_default(),
            tempo,
            price,
            audio_url: row.audio_url,
            cover_url: row.cover_url.filter(|url| !url.is_empty()),
            description: row.description.unwrap_or_default(),
            is_hot: row.is_hot.unwrap_or(false),
            is_trending: row.is_trending.unwrap_or(false),
            created_at: row.created_at,
        })
    }
}

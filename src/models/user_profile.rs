use serde::{Deserialize, Serialize};

/// A registered artist or the catalog administrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    /// Display / stage name
    pub username: String,
    /// Natural dedup key; always stored lowercase
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: &str, is_admin: bool) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: normalize_email(email),
            is_admin,
        }
    }
}

/// Canonical form used for every email comparison and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

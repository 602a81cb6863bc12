use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// The first group mirrors the failure taxonomy the presentation layer
/// reacts to (network, auth, constraint, unavailable). The rest are
/// infrastructure errors converted from the collaborator crates.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable label sent alongside the message so clients can branch on it
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Network(_) | AppError::HttpClient(_) => "network_error",
            AppError::AuthRejected(_) => "auth_rejected",
            AppError::Constraint(_) => "constraint_error",
            AppError::Unavailable(_) => "unavailable",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ExternalApi(_) => "external_api",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthRejected(_) => StatusCode::UNAUTHORIZED,
            AppError::Constraint(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) | AppError::HttpClient(_) | AppError::ExternalApi(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::AuthRejected(msg)
            | AppError::Constraint(msg)
            | AppError::Unavailable(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidInput(msg)
            | AppError::Network(msg)
            | AppError::ExternalApi(msg) => msg.clone(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        }

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(AppError::AuthRejected("x".into()).kind(), "auth_rejected");
        assert_eq!(AppError::Constraint("x".into()).kind(), "constraint_error");
        assert_eq!(AppError::Unavailable("x".into()).kind(), "unavailable");
        assert_eq!(AppError::Network("x".into()).kind(), "network_error");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::AuthRejected("bad key".into()), StatusCode::UNAUTHORIZED),
            (AppError::Constraint("dup".into()), StatusCode::CONFLICT),
            (AppError::Unavailable("demo".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Network("down".into()), StatusCode::BAD_GATEWAY),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}

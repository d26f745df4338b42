// Shared type definitions and the request error taxonomy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Media attached to a blog post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Article,
    Video,
    Image,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Article => write!(f, "article"),
            MediaType::Video => write!(f, "video"),
            MediaType::Image => write!(f, "image"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UploadFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::kv::StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                (StatusCode::FORBIDDEN, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::UploadFailed(msg) => {
                tracing::error!("Upload failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MediaType::Article).unwrap(), "\"article\"");
        assert_eq!(serde_json::to_string(&MediaType::Video).unwrap(), "\"video\"");
        let parsed: MediaType = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(parsed, MediaType::Image);
    }

    #[test]
    fn error_statuses_match_taxonomy() {
        let cases = [
            (AppError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                AppError::UploadFailed("nope".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}

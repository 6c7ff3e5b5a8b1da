use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::BotError;

/// Failure of a dashboard API call
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    BadRequest(String),
    Game(BotError),
}

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        ApiError::Game(err)
    }
}

/// HTTP status for a game error
pub fn status_for(err: &BotError) -> StatusCode {
    match err {
        BotError::InvalidPack { .. }
        | BotError::InsufficientFunds { .. }
        | BotError::InvalidPage { .. }
        | BotError::ConfigValidation { .. } => StatusCode::BAD_REQUEST,
        BotError::MailNotFound { .. }
        | BotError::NewsNotFound { .. }
        | BotError::PlayerNotOwned { .. } => StatusCode::NOT_FOUND,
        BotError::AlreadyPlayedToday
        | BotError::MailAlreadyClaimed { .. }
        | BotError::PackSoldOut { .. } => StatusCode::CONFLICT,
        BotError::PermissionDenied { .. } | BotError::NotYourInteraction => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not authenticated" })),
            )
                .into_response(),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin access required" })),
            )
                .into_response(),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
            ApiError::Game(err) => {
                let status = status_for(&err);
                // Validation messages describe the request, so they are safe to echo
                let message = if err.is_user_facing() || status != StatusCode::INTERNAL_SERVER_ERROR
                {
                    err.to_string()
                } else {
                    error!("API request failed: {}", err);
                    "Internal server error".to_string()
                };
                (status, Json(json!({ "success": false, "error": message }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rarity;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&BotError::AlreadyPlayedToday), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&BotError::MailNotFound {
                mail_id: "m".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&BotError::InvalidPack {
                key: "x".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&BotError::NoPlayersForRarity {
                rarity: Rarity::Gold
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_echoed() {
        let response = ApiError::Game(BotError::Internal {
            message: "disk path /srv/secret".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
    }
}

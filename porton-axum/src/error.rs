use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use porton_core::error::{AuthError, Error};

/// Boundary error: one variant per externally distinct outcome.
///
/// Internally distinct denials (expired versus tampered tokens, unknown
/// username versus wrong password) are collapsed before they reach the wire;
/// the distinctions live only in logs and the audit trail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown username and wrong password map here identically; the
    /// remaining attempt budget stays in the audit trail, never on the wire,
    /// so the response shape cannot disclose whether the username existed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Forbidden")]
    Forbidden,

    #[error("Account is temporarily locked")]
    AccountLocked { locked_until: chrono::DateTime<chrono::Utc> },

    #[error("Too many login attempts")]
    TooManyRequests { retry_after_seconds: i64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(e) => ApiError::BadRequest(e.to_string()),
            Error::Auth(AuthError::InvalidCredentials { .. }) => ApiError::InvalidCredentials,
            Error::Auth(AuthError::AccountInactive) => ApiError::AccountInactive,
            Error::Auth(AuthError::AccountLocked { locked_until }) => {
                ApiError::AccountLocked { locked_until }
            }
            Error::Auth(AuthError::RateLimited { retry_after }) => ApiError::TooManyRequests {
                retry_after_seconds: retry_after.num_seconds().max(1),
            },
            Error::Auth(AuthError::PermissionDenied) => ApiError::Forbidden,
            Error::Token(_) => ApiError::InvalidToken,
            Error::Storage(e) => {
                tracing::error!(error = %e, "storage error at the http boundary");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            ApiError::InvalidCredentials | ApiError::InvalidToken | ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            ApiError::AccountInactive | ApiError::Forbidden => {
                (StatusCode::FORBIDDEN, json!({ "message": self.to_string() }))
            }
            ApiError::AccountLocked { locked_until } => {
                let remaining = (*locked_until - chrono::Utc::now()).num_minutes().max(0) + 1;
                (
                    StatusCode::LOCKED,
                    json!({
                        "message": "Account is temporarily locked",
                        "lockedUntil": locked_until.to_rfc3339(),
                        "remainingMinutes": remaining,
                    }),
                )
            }
            ApiError::TooManyRequests { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "message": "Too many login attempts, try again later",
                    "retryAfter": retry_after_seconds,
                }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use porton_core::error::{StorageError, TokenError};

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (
                porton_core::error::ValidationError::MissingField("username".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::InvalidCredentials {
                    remaining_attempts: Some(2),
                }
                .into(),
                StatusCode::UNAUTHORIZED,
            ),
            (TokenError::Expired.into(), StatusCode::UNAUTHORIZED),
            (TokenError::Revoked.into(), StatusCode::UNAUTHORIZED),
            (AuthError::AccountInactive.into(), StatusCode::FORBIDDEN),
            (
                AuthError::AccountLocked {
                    locked_until: Utc::now() + Duration::minutes(5),
                }
                .into(),
                StatusCode::LOCKED,
            ),
            (
                AuthError::RateLimited {
                    retry_after: Duration::minutes(15),
                }
                .into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                StorageError::Database("boom".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_credential_denials_collapse_to_one_variant() {
        // Whether the username existed (attempt budget present) or not, the
        // boundary error carries no distinguishing payload.
        let wrong_password: ApiError = Error::from(AuthError::InvalidCredentials {
            remaining_attempts: Some(4),
        })
        .into();
        let unknown_username: ApiError = Error::from(AuthError::InvalidCredentials {
            remaining_attempts: None,
        })
        .into();
        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_username, ApiError::InvalidCredentials));
    }

    #[test]
    fn test_storage_detail_not_leaked() {
        let api: ApiError = Error::Storage(StorageError::Database("secret dsn".into())).into();
        assert!(matches!(api, ApiError::Internal));
        assert!(!api.to_string().contains("secret dsn"));
    }
}

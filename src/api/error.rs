//! API error types rendered as the JSON error envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::db::DatabaseError;

/// `{"success": false, "code": ..., "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{message}")]
    PreconditionFailed { code: &'static str, message: String },
    #[error("Invalid email or password")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Database did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", detail)
            }
            ApiError::PreconditionFailed { code, message } => {
                (StatusCode::BAD_REQUEST, code, message)
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid email or password".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                "Method not allowed".to_string(),
            ),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "ALREADY_EXISTS", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Timeout(limit) => {
                tracing::warn!(?limit, "Request hit the database timeout");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    "The database did not answer in time".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            code,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DatabaseError::InvalidEnum { .. } | DatabaseError::Validation(_) => {
                ApiError::Validation(err.to_string())
            }
            DatabaseError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            DatabaseError::SlotUnavailable { .. } => ApiError::PreconditionFailed {
                code: "SLOT_UNAVAILABLE",
                message: err.to_string(),
            },
            DatabaseError::InsufficientBalance { .. } => ApiError::PreconditionFailed {
                code: "INSUFFICIENT_BALANCE",
                message: err.to_string(),
            },
            DatabaseError::PreconditionFailed(_) => ApiError::PreconditionFailed {
                code: "PRECONDITION_FAILED",
                message: err.to_string(),
            },
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
            CoreError::Timeout(limit) => ApiError::Timeout(limit),
            CoreError::TaskFailed(_) | CoreError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401_envelope() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn not_found_maps_from_database() {
        let err: ApiError = DatabaseError::not_found("Patient", "U0404").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("U0404"));
    }

    #[tokio::test]
    async fn slot_conflict_is_precondition_failure() {
        let err: ApiError = DatabaseError::SlotUnavailable {
            doctor_id: "U0002".into(),
            slot_id: "TS001".into(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "SLOT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn already_exists_returns_409() {
        let err: ApiError = DatabaseError::AlreadyExists("email a@b.c".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn validation_returns_400() {
        let err: ApiError = DatabaseError::Validation("name is required".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn timeout_returns_504() {
        let err: ApiError = CoreError::Timeout(Duration::from_millis(50)).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["code"], "TIMEOUT");
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let err: ApiError = DatabaseError::IdSpaceExhausted("U").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["message"], "An internal error occurred");
    }
}

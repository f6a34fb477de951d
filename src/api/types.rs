//! Shared types for the HTTP API layer.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Success envelope
// ═══════════════════════════════════════════════════════════

/// `{"success": true, "message"?: ..., <data fields>}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

/// A handler's successful reply: status plus enveloped body.
#[derive(Debug)]
pub struct ApiReply<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiReply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                message: None,
                data,
            },
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiReply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Data for replies that only carry a message.
#[derive(Debug, Serialize)]
pub struct Empty {}

// ═══════════════════════════════════════════════════════════
// Extractors with envelope rejections
// ═══════════════════════════════════════════════════════════

/// JSON body whose rejection renders as a 400 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection renders as a 400 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[derive(Serialize)]
    struct Payload {
        count: u32,
    }

    #[tokio::test]
    async fn ok_reply_flattens_data() {
        let response = ApiReply::ok(Payload { count: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "count": 3}));
    }

    #[tokio::test]
    async fn created_reply_carries_message() {
        let response = ApiReply::created(Empty {})
            .with_message("Created")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "Created"}));
    }
}

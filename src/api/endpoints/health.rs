//! Health check endpoint.

use axum::extract::State;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiReply};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /api/health`: liveness and database reachability.
pub async fn check(State(ctx): State<ApiContext>) -> Result<ApiReply<HealthResponse>, ApiError> {
    let database = ctx
        .core
        .run_db(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
        .await
        .is_ok();

    Ok(ApiReply::ok(HealthResponse {
        status: "ok",
        database,
        version: crate::config::APP_VERSION,
    }))
}

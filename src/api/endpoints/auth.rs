//! Authentication endpoints.
//!
//! - `POST /api/login`: check email and password, return the user
//! - `POST /api/register`: self-service patient registration

use axum::extract::State;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiReply};
use crate::models::{Registration, UserRecord};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Zeroizing<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserRecord,
}

/// `POST /api/login`
///
/// Unknown email and wrong password give the same 401.
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiReply<LoginResponse>, ApiError> {
    let user = ctx
        .core
        .run_db(move |conn| accounts::authenticate(conn, &request.email, &request.password))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(ApiReply::ok(LoginResponse { user }).with_message("Login successful"))
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub u_id: String,
    pub hc_id: String,
}

/// `POST /api/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<ApiReply<RegisterResponse>, ApiError> {
    let hash = ctx.core.hash_password(registration.password.clone()).await?;
    let (u_id, hc_id) = ctx
        .core
        .run_db(move |conn| accounts::register_patient(conn, &registration, &hash))
        .await?;

    Ok(ApiReply::created(RegisterResponse { u_id, hc_id }).with_message("Registration successful"))
}

//! Administration endpoints.
//!
//! - `GET /api/admin/users` / `POST /api/admin/users`
//! - `GET|PUT|DELETE /api/admin/users/:user_id`
//! - `PUT /api/admin/users/:user_id/role`
//! - `GET /api/admin/stats`

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiReply, Empty};
use crate::models::{NewUser, Role, SystemStats, UserRecord, UserUpdate};

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserRecord>,
}

/// `GET /api/admin/users`
pub async fn list_users(State(ctx): State<ApiContext>) -> Result<ApiReply<UsersResponse>, ApiError> {
    let users = ctx.core.run_db(|conn| accounts::list_users(conn)).await?;
    Ok(ApiReply::ok(UsersResponse { users }))
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub u_id: String,
}

/// `POST /api/admin/users`: any role, with optional role attributes.
pub async fn create_user(
    State(ctx): State<ApiContext>,
    ApiJson(user): ApiJson<NewUser>,
) -> Result<ApiReply<CreateUserResponse>, ApiError> {
    let hash = ctx.core.hash_password(user.password.clone()).await?;
    let u_id = ctx
        .core
        .run_db(move |conn| accounts::create_user(conn, &user, &hash))
        .await?;
    Ok(ApiReply::created(CreateUserResponse { u_id }).with_message("User created successfully"))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserRecord,
}

/// `GET /api/admin/users/:user_id`
pub async fn get_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<ApiReply<UserResponse>, ApiError> {
    let user = ctx
        .core
        .run_db(move |conn| accounts::get_user(conn, &user_id))
        .await?;
    Ok(ApiReply::ok(UserResponse { user }))
}

/// `PUT /api/admin/users/:user_id`: absent fields are left unchanged.
pub async fn update_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<ApiReply<UserResponse>, ApiError> {
    let hash = match update.password.clone() {
        Some(password) => Some(ctx.core.hash_password(password).await?),
        None => None,
    };
    let user = ctx
        .core
        .run_db(move |conn| {
            accounts::update_user_details(conn, &user_id, &update, hash.as_deref())
        })
        .await?;
    Ok(ApiReply::ok(UserResponse { user }).with_message("User updated successfully"))
}

/// `DELETE /api/admin/users/:user_id`: removes the user and every
/// record that depends on them.
pub async fn delete_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<ApiReply<Empty>, ApiError> {
    ctx.core
        .run_db(move |conn| accounts::delete_user(conn, &user_id))
        .await?;
    Ok(ApiReply::ok(Empty {}).with_message("User deleted successfully"))
}

#[derive(Deserialize)]
pub struct RoleChangeRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct RoleChangeResponse {
    pub u_id: String,
    #[serde(flatten)]
    pub role: Role,
}

/// `PUT /api/admin/users/:user_id/role`
pub async fn change_role(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<RoleChangeRequest>,
) -> Result<ApiReply<RoleChangeResponse>, ApiError> {
    let lookup = user_id.clone();
    let role = ctx
        .core
        .run_db(move |conn| accounts::update_user_role(conn, &lookup, &request.role))
        .await?;
    Ok(ApiReply::ok(RoleChangeResponse { u_id: user_id, role })
        .with_message("Role updated successfully"))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: SystemStats,
}

/// `GET /api/admin/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> Result<ApiReply<StatsResponse>, ApiError> {
    let stats = ctx.core.run_db(|conn| accounts::system_stats(conn)).await?;
    Ok(ApiReply::ok(StatsResponse { stats }))
}

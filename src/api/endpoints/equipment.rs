//! Medical equipment inventory endpoints.
//!
//! - `GET /api/equipment`: stock list
//! - `POST /api/equipment`: add an item
//! - `PUT /api/equipment`: overwrite an item's count by name
//! - `PATCH /api/equipment/:me_id`: apply a stock movement

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiReply, Empty};
use crate::inventory;
use crate::models::MedicalEquipment;

#[derive(Serialize)]
pub struct EquipmentListResponse {
    pub equipment: Vec<MedicalEquipment>,
}

/// `GET /api/equipment`
pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<ApiReply<EquipmentListResponse>, ApiError> {
    let equipment = ctx.core.run_db(|conn| inventory::list_equipment(conn)).await?;
    Ok(ApiReply::ok(EquipmentListResponse { equipment }))
}

#[derive(Deserialize)]
pub struct CreateEquipmentRequest {
    pub name: String,
    pub format: String,
    pub amount: i64,
}

#[derive(Serialize)]
pub struct EquipmentResponse {
    pub equipment: MedicalEquipment,
}

/// `POST /api/equipment`
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<CreateEquipmentRequest>,
) -> Result<ApiReply<EquipmentResponse>, ApiError> {
    let equipment = ctx
        .core
        .run_db(move |conn| {
            inventory::create_equipment(conn, &request.name, &request.format, request.amount)
        })
        .await?;
    Ok(ApiReply::created(EquipmentResponse { equipment }).with_message("Equipment added"))
}

#[derive(Deserialize)]
pub struct UpdateEquipmentRequest {
    pub name: String,
    pub amount: i64,
}

/// `PUT /api/equipment`: last write wins.
pub async fn update(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<UpdateEquipmentRequest>,
) -> Result<ApiReply<Empty>, ApiError> {
    ctx.core
        .run_db(move |conn| inventory::update_equipment(conn, &request.name, request.amount))
        .await?;
    Ok(ApiReply::ok(Empty {}).with_message("Equipment updated"))
}

#[derive(Deserialize)]
pub struct AdjustEquipmentRequest {
    pub delta: i64,
}

#[derive(Serialize)]
pub struct AdjustEquipmentResponse {
    pub me_id: String,
    pub amount: i64,
}

/// `PATCH /api/equipment/:me_id`: 400 when the count would go negative.
pub async fn adjust(
    State(ctx): State<ApiContext>,
    Path(me_id): Path<String>,
    ApiJson(request): ApiJson<AdjustEquipmentRequest>,
) -> Result<ApiReply<AdjustEquipmentResponse>, ApiError> {
    let lookup = me_id.clone();
    let amount = ctx
        .core
        .run_db(move |conn| inventory::adjust_equipment(conn, &lookup, request.delta))
        .await?;
    Ok(ApiReply::ok(AdjustEquipmentResponse { me_id, amount }))
}

//! Clinical record endpoints for staff and doctors.
//!
//! - `POST /api/blood-tests`: record a test on a patient's health card
//! - `GET /api/blood-tests/recent?limit=`: newest tests across patients
//! - `PUT /api/blood-tests/:bt_id`: replace a test's results
//! - `POST /api/prescriptions`: open a prescription
//! - `POST /api/prescriptions/:p_id/medications`: add a catalog medication

use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiQuery, ApiReply, Empty};
use crate::clinical;
use crate::models::{BloodPanel, BloodTest, RecentBloodTest};

#[derive(Deserialize)]
pub struct CreateBloodTestRequest {
    pub patient_id: String,
    #[serde(flatten)]
    pub panel: BloodPanel,
    pub test_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct CreateBloodTestResponse {
    pub bt_id: String,
}

/// `POST /api/blood-tests`: `test_date` defaults to today.
pub async fn create_blood_test(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<CreateBloodTestRequest>,
) -> Result<ApiReply<CreateBloodTestResponse>, ApiError> {
    let bt_id = ctx
        .core
        .run_db(move |conn| {
            clinical::create_blood_test(conn, &request.patient_id, &request.panel, request.test_date)
        })
        .await?;

    Ok(ApiReply::created(CreateBloodTestResponse { bt_id }).with_message("Blood test recorded"))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct RecentBloodTestsResponse {
    pub blood_tests: Vec<RecentBloodTest>,
}

/// `GET /api/blood-tests/recent`
pub async fn recent_blood_tests(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<ApiReply<RecentBloodTestsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(clinical::DEFAULT_RECENT_LIMIT);
    let blood_tests = ctx
        .core
        .run_db(move |conn| clinical::list_recent_blood_tests(conn, limit))
        .await?;
    Ok(ApiReply::ok(RecentBloodTestsResponse { blood_tests }))
}

#[derive(Deserialize)]
pub struct UpdateBloodTestRequest {
    #[serde(flatten)]
    pub panel: BloodPanel,
    pub test_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct BloodTestResponse {
    pub blood_test: BloodTest,
}

/// `PUT /api/blood-tests/:bt_id`: an absent `test_date` keeps the old one.
pub async fn update_blood_test(
    State(ctx): State<ApiContext>,
    Path(bt_id): Path<String>,
    ApiJson(request): ApiJson<UpdateBloodTestRequest>,
) -> Result<ApiReply<BloodTestResponse>, ApiError> {
    let blood_test = ctx
        .core
        .run_db(move |conn| {
            clinical::update_blood_test_results(conn, &bt_id, &request.panel, request.test_date)
        })
        .await?;

    Ok(ApiReply::ok(BloodTestResponse { blood_test }).with_message("Blood test updated"))
}

#[derive(Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub usage_info: String,
}

#[derive(Serialize)]
pub struct CreatePrescriptionResponse {
    pub p_id: String,
}

/// `POST /api/prescriptions`
pub async fn create_prescription(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<CreatePrescriptionRequest>,
) -> Result<ApiReply<CreatePrescriptionResponse>, ApiError> {
    let p_id = ctx
        .core
        .run_db(move |conn| {
            clinical::create_prescription(
                conn,
                &request.patient_id,
                &request.doctor_id,
                &request.usage_info,
            )
        })
        .await?;

    Ok(ApiReply::created(CreatePrescriptionResponse { p_id }).with_message("Prescription created"))
}

#[derive(Deserialize)]
pub struct PrescribeMedicationRequest {
    pub m_id: String,
}

/// `POST /api/prescriptions/:p_id/medications`
pub async fn prescribe_medication(
    State(ctx): State<ApiContext>,
    Path(p_id): Path<String>,
    ApiJson(request): ApiJson<PrescribeMedicationRequest>,
) -> Result<ApiReply<Empty>, ApiError> {
    ctx.core
        .run_db(move |conn| clinical::prescribe_medication(conn, &p_id, &request.m_id))
        .await?;

    Ok(ApiReply::created(Empty {}).with_message("Medication added to prescription"))
}

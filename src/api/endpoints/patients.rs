//! Patient-scoped endpoints.
//!
//! - `GET /api/patients/:patient_id/appointments`
//! - `GET /api/patients/:patient_id/balance`
//! - `GET /api/patients/:patient_id/health-card`: tests and prescriptions
//! - `GET /api/patients/:patient_id/blood-tests`

use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiReply};
use crate::models::{AppointmentDetail, BloodTest, HealthCard, Money};
use crate::{accounts, appointment, clinical};

#[derive(Serialize)]
pub struct PatientAppointmentsResponse {
    pub appointments: Vec<AppointmentDetail>,
}

/// `GET /api/patients/:patient_id/appointments`
pub async fn appointments(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<ApiReply<PatientAppointmentsResponse>, ApiError> {
    let appointments = ctx
        .core
        .run_db(move |conn| appointment::list_patient_appointments(conn, &patient_id))
        .await?;
    Ok(ApiReply::ok(PatientAppointmentsResponse { appointments }))
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub patient_id: String,
    pub balance: Money,
}

/// `GET /api/patients/:patient_id/balance`
pub async fn balance(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<ApiReply<BalanceResponse>, ApiError> {
    let lookup = patient_id.clone();
    let balance = ctx
        .core
        .run_db(move |conn| accounts::patient_balance(conn, &lookup))
        .await?;
    Ok(ApiReply::ok(BalanceResponse { patient_id, balance }))
}

#[derive(Serialize)]
pub struct HealthCardResponse {
    pub health_card: HealthCard,
}

/// `GET /api/patients/:patient_id/health-card`
pub async fn health_card(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<ApiReply<HealthCardResponse>, ApiError> {
    let health_card = ctx
        .core
        .run_db(move |conn| clinical::get_health_card(conn, &patient_id))
        .await?;
    Ok(ApiReply::ok(HealthCardResponse { health_card }))
}

#[derive(Serialize)]
pub struct PatientBloodTestsResponse {
    pub blood_tests: Vec<BloodTest>,
}

/// `GET /api/patients/:patient_id/blood-tests`
pub async fn blood_tests(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<ApiReply<PatientBloodTestsResponse>, ApiError> {
    let blood_tests = ctx
        .core
        .run_db(move |conn| clinical::list_patient_blood_tests(conn, &patient_id))
        .await?;
    Ok(ApiReply::ok(PatientBloodTestsResponse { blood_tests }))
}

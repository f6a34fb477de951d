//! Read-only catalog endpoints used when browsing for a booking.
//!
//! - `GET /api/departments`: departments with doctor counts
//! - `GET /api/doctors?dept_name=`: doctors, optionally by department
//! - `GET /api/timeslots`: the daily slot catalog
//! - `GET /api/medications`: the medication catalog

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiQuery, ApiReply};
use crate::models::{Department, DoctorListing, Medication, TimeSlot};
use crate::{accounts, availability, clinical};

#[derive(Serialize)]
pub struct DepartmentsResponse {
    pub departments: Vec<Department>,
}

/// `GET /api/departments`
pub async fn departments(
    State(ctx): State<ApiContext>,
) -> Result<ApiReply<DepartmentsResponse>, ApiError> {
    let departments = ctx.core.run_db(|conn| accounts::list_departments(conn)).await?;
    Ok(ApiReply::ok(DepartmentsResponse { departments }))
}

#[derive(Deserialize)]
pub struct DoctorsQuery {
    pub dept_name: Option<String>,
}

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<DoctorListing>,
}

/// `GET /api/doctors`: an absent or empty `dept_name` lists every doctor.
pub async fn doctors(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<DoctorsQuery>,
) -> Result<ApiReply<DoctorsResponse>, ApiError> {
    let doctors = ctx
        .core
        .run_db(move |conn| {
            let dept_name = query.dept_name.as_deref().map(str::trim).filter(|d| !d.is_empty());
            accounts::filter_doctors_by_department(conn, dept_name)
        })
        .await?;
    Ok(ApiReply::ok(DoctorsResponse { doctors }))
}

#[derive(Serialize)]
pub struct TimeSlotsResponse {
    pub timeslots: Vec<TimeSlot>,
}

/// `GET /api/timeslots`
pub async fn time_slots(
    State(ctx): State<ApiContext>,
) -> Result<ApiReply<TimeSlotsResponse>, ApiError> {
    let timeslots = ctx.core.run_db(|conn| availability::list_time_slots(conn)).await?;
    Ok(ApiReply::ok(TimeSlotsResponse { timeslots }))
}

#[derive(Serialize)]
pub struct MedicationsResponse {
    pub medications: Vec<Medication>,
}

/// `GET /api/medications`
pub async fn medications(
    State(ctx): State<ApiContext>,
) -> Result<ApiReply<MedicationsResponse>, ApiError> {
    let medications = ctx.core.run_db(|conn| clinical::list_medications(conn)).await?;
    Ok(ApiReply::ok(MedicationsResponse { medications }))
}

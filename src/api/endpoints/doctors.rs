//! Doctor-scoped endpoints.
//!
//! - `GET /api/doctors/:doctor_id/availability?date=`: free slots on a day
//! - `GET /api/doctors/:doctor_id/unavailability`: declared blocks
//! - `POST /api/doctors/:doctor_id/unavailability`: block a slot
//! - `GET /api/doctors/:doctor_id/appointments`: the doctor's bookings
//! - `GET /api/doctors/:doctor_id/feedback`: ratings received

use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiQuery, ApiReply};
use crate::models::{AppointmentDetail, Feedback, TimeSlot, Unavailability};
use crate::{appointment, availability, feedback};

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub available_slots: Vec<TimeSlot>,
}

/// `GET /api/doctors/:doctor_id/availability?date=YYYY-MM-DD`
pub async fn availability(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<ApiReply<AvailabilityResponse>, ApiError> {
    let date = query.date;
    let lookup = doctor_id.clone();
    let available_slots = ctx
        .core
        .run_db(move |conn| availability::list_available_slots(conn, &lookup, date))
        .await?;

    Ok(ApiReply::ok(AvailabilityResponse {
        doctor_id,
        date,
        available_slots,
    }))
}

#[derive(Serialize)]
pub struct UnavailabilityListResponse {
    pub unavailability: Vec<Unavailability>,
}

/// `GET /api/doctors/:doctor_id/unavailability`
pub async fn list_unavailability(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> Result<ApiReply<UnavailabilityListResponse>, ApiError> {
    let unavailability = ctx
        .core
        .run_db(move |conn| appointment::list_unavailability(conn, &doctor_id))
        .await?;
    Ok(ApiReply::ok(UnavailabilityListResponse { unavailability }))
}

#[derive(Deserialize)]
pub struct DeclareUnavailabilityRequest {
    pub ts_id: String,
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct DeclareUnavailabilityResponse {
    pub unavailability: Unavailability,
}

/// `POST /api/doctors/:doctor_id/unavailability`
pub async fn declare_unavailability(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
    ApiJson(request): ApiJson<DeclareUnavailabilityRequest>,
) -> Result<ApiReply<DeclareUnavailabilityResponse>, ApiError> {
    let unavailability = ctx
        .core
        .run_db(move |conn| {
            appointment::declare_unavailability(conn, &doctor_id, &request.ts_id, request.date)
        })
        .await?;

    Ok(ApiReply::created(DeclareUnavailabilityResponse { unavailability })
        .with_message("Unavailability recorded"))
}

#[derive(Serialize)]
pub struct DoctorAppointmentsResponse {
    pub appointments: Vec<AppointmentDetail>,
}

/// `GET /api/doctors/:doctor_id/appointments`
pub async fn appointments(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> Result<ApiReply<DoctorAppointmentsResponse>, ApiError> {
    let appointments = ctx
        .core
        .run_db(move |conn| appointment::list_doctor_appointments(conn, &doctor_id))
        .await?;
    Ok(ApiReply::ok(DoctorAppointmentsResponse { appointments }))
}

#[derive(Serialize)]
pub struct DoctorFeedbackResponse {
    pub feedback: Vec<Feedback>,
}

/// `GET /api/doctors/:doctor_id/feedback`
pub async fn list_feedback(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> Result<ApiReply<DoctorFeedbackResponse>, ApiError> {
    let feedback = ctx
        .core
        .run_db(move |conn| feedback::list_doctor_feedback(conn, &doctor_id))
        .await?;
    Ok(ApiReply::ok(DoctorFeedbackResponse { feedback }))
}

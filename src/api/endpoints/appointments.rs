//! Appointment booking endpoint.
//!
//! `POST /api/appointments`: book a free slot and debit the patient.

use axum::extract::State;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiReply};
use crate::appointment;
use crate::models::{AppointmentDetail, BookingRequest};

#[derive(Serialize)]
pub struct BookingResponse {
    pub appointment: AppointmentDetail,
}

/// `POST /api/appointments`
///
/// 400 `SLOT_UNAVAILABLE` when the slot is taken or blocked,
/// 400 `INSUFFICIENT_BALANCE` when the patient cannot pay.
pub async fn book(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<ApiReply<BookingResponse>, ApiError> {
    let appointment = ctx
        .core
        .run_db(move |conn| appointment::book(conn, &request))
        .await?;

    Ok(ApiReply::created(BookingResponse { appointment })
        .with_message("Appointment booked successfully"))
}

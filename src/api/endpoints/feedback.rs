//! `POST /api/feedback`: a patient rates a doctor they have seen.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiReply};
use crate::feedback;

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub rating: f64,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub f_id: String,
}

pub async fn give(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> Result<ApiReply<FeedbackResponse>, ApiError> {
    let f_id = ctx
        .core
        .run_db(move |conn| {
            feedback::give_feedback(
                conn,
                &request.patient_id,
                &request.doctor_id,
                request.rating,
                request.comment.as_deref(),
            )
        })
        .await?;

    Ok(ApiReply::created(FeedbackResponse { f_id }).with_message("Thank you for your feedback"))
}

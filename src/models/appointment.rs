use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One period of the fixed daily slot catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub ts_id: String,
    pub start_time: String,
    pub end_time: String,
}

/// Request to book a slot with a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub ts_id: String,
    pub date: NaiveDate,
}

/// Booked appointment joined with both parties and the slot times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetail {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialization: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub price: Money,
}

/// A doctor's declared block on one slot of one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unavailability {
    pub ua_id: String,
    pub doc_id: String,
    pub ts_id: String,
    pub date: NaiveDate,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub f_id: String,
    pub patient_id: String,
    pub doc_id: String,
    pub rating: f64,
    pub comment: Option<String>,
    pub created_at: String,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalEquipment {
    pub me_id: String,
    pub name: String,
    pub format: String,
    pub amount: i64,
}

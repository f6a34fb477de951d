use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Accept a measurement as a JSON number or a numeric string.
fn measurement<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid measurement: {s:?}"))),
    }
}

/// Measured values of one blood test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPanel {
    #[serde(deserialize_with = "measurement")]
    pub vitamins: f64,
    #[serde(deserialize_with = "measurement")]
    pub minerals: f64,
    #[serde(deserialize_with = "measurement")]
    pub cholesterol: f64,
    #[serde(deserialize_with = "measurement")]
    pub glucose: f64,
    #[serde(deserialize_with = "measurement")]
    pub hemoglobin: f64,
    #[serde(alias = "whiteBC", deserialize_with = "measurement")]
    pub white_blood_cells: f64,
    #[serde(alias = "redBC", deserialize_with = "measurement")]
    pub red_blood_cells: f64,
}

impl BloodPanel {
    pub(crate) fn values(&self) -> [(&'static str, f64); 7] {
        [
            ("vitamins", self.vitamins),
            ("minerals", self.minerals),
            ("cholesterol", self.cholesterol),
            ("glucose", self.glucose),
            ("hemoglobin", self.hemoglobin),
            ("white_blood_cells", self.white_blood_cells),
            ("red_blood_cells", self.red_blood_cells),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodTest {
    pub bt_id: String,
    pub hc_id: String,
    #[serde(flatten)]
    pub panel: BloodPanel,
    pub test_date: NaiveDate,
}

/// Blood test row with the owning patient, for the staff dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentBloodTest {
    pub patient_id: String,
    pub patient_name: String,
    #[serde(flatten)]
    pub test: BloodTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub m_id: String,
    pub name: String,
    pub format: String,
    pub dosage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub p_id: String,
    pub hc_id: String,
    pub doc_id: String,
    pub doctor_name: String,
    pub prescription_date: NaiveDate,
    pub usage_info: String,
    pub medications: Vec<Medication>,
}

/// Everything anchored on a patient's health card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCard {
    pub hc_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub blood_tests: Vec<BloodTest>,
    pub prescriptions: Vec<Prescription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_accepts_strings_and_short_names() {
        let panel: BloodPanel = serde_json::from_str(
            r#"{"vitamins":"30.5","minerals":4,"cholesterol":"180","glucose":90,
                "hemoglobin":"14.2","whiteBC":"6.1","redBC":4.9}"#,
        )
        .unwrap();
        assert_eq!(panel.vitamins, 30.5);
        assert_eq!(panel.white_blood_cells, 6.1);
        assert_eq!(panel.red_blood_cells, 4.9);
    }

    #[test]
    fn panel_rejects_non_numeric_text() {
        let result = serde_json::from_str::<BloodPanel>(
            r#"{"vitamins":"high","minerals":4,"cholesterol":1,"glucose":1,
                "hemoglobin":1,"white_blood_cells":1,"red_blood_cells":1}"#,
        );
        assert!(result.is_err());
    }
}

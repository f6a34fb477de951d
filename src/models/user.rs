use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::enums::RoleKind;
use super::money::Money;

/// Attributes carried by the patient role extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub hc_id: String,
    pub balance: Money,
}

/// Attributes carried by the doctor role extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub d_id: String,
    pub rating: f64,
    pub price: Money,
    pub specialization: String,
}

/// The single role extension a user holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
    Staff,
    Admin,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Patient(_) => RoleKind::Patient,
            Role::Doctor(_) => RoleKind::Doctor,
            Role::Staff => RoleKind::Staff,
            Role::Admin => RoleKind::Admin,
        }
    }
}

/// A user row together with its derived role.
///
/// `role` is `None` only for a user whose extension row is missing, which
/// the store never produces but a hand-edited database can.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub u_id: String,
    pub name: String,
    pub surname: String,
    pub email_address: String,
    pub phone_no: Option<String>,
    #[serde(flatten)]
    pub role: Option<Role>,
}

/// Optional role-specific attributes supplied on create.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleAttributes {
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub price: Option<Money>,
    pub balance: Option<Money>,
}

/// Admin-side user creation payload.
#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub phone: String,
    pub role: String,
    #[serde(flatten)]
    pub attributes: RoleAttributes,
}

/// Self-service patient registration payload.
#[derive(Debug, Deserialize)]
pub struct Registration {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: Zeroizing<String>,
    pub phone: String,
}

/// Sparse update: absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub price: Option<Money>,
    pub balance: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub d_id: String,
    pub dept_name: String,
    pub doctor_count: i64,
}

/// Doctor entry shown when browsing a department for booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListing {
    pub u_id: String,
    pub name: String,
    pub surname: String,
    pub specialization: String,
    pub rating: f64,
    pub price: Money,
    pub dept_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStats {
    pub total_users: i64,
    pub total_patients: i64,
    pub total_doctors: i64,
    pub total_staff: i64,
    pub total_admins: i64,
    pub total_appointments: i64,
}

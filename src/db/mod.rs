pub mod ids;
pub mod sqlite;

pub use ids::*;
pub use sqlite::*;

use chrono::NaiveDate;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

use crate::models::Money;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Time slot {slot_id} on {date} is not available for doctor {doctor_id}")]
    SlotUnavailable {
        doctor_id: String,
        slot_id: String,
        date: NaiveDate,
    },

    #[error("Insufficient balance. Need {required}, have {available}")]
    InsufficientBalance { required: Money, available: Money },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Identifier space exhausted for {0}")]
    IdSpaceExhausted(&'static str),

    #[error("Password hashing failed: {0}")]
    Password(String),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

/// Translate a UNIQUE / PRIMARY KEY violation into `AlreadyExists`.
/// Every other error passes through as `Sqlite`.
pub fn map_unique(err: rusqlite::Error, what: &str) -> DatabaseError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation
            && matches!(
                failure.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            )
        {
            return DatabaseError::AlreadyExists(what.to_string());
        }
    }
    DatabaseError::Sqlite(err)
}

/// Begin a write transaction that takes SQLite's write lock immediately.
///
/// Every read-then-write sequence (id generation, booking, feedback, role
/// change) runs inside one of these, so concurrent writers queue on the
/// lock instead of interleaving between the read and the write.
pub fn begin_immediate(conn: &Connection) -> Result<Transaction<'_>, DatabaseError> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Seed helpers shared by the store tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::{params, Connection};

    pub fn user(conn: &Connection, u_id: &str, name: &str) {
        conn.execute(
            "INSERT INTO users (u_id, name, surname, email_address, password_hash, phone_no)
             VALUES (?1, ?2, 'Test', lower(?1) || '@hospital.test', 'x', '555')",
            params![u_id, name],
        )
        .unwrap();
    }

    pub fn patient(conn: &Connection, u_id: &str, hc_id: &str, balance_cents: i64) {
        user(conn, u_id, "Patient");
        conn.execute("INSERT INTO health_cards (hc_id) VALUES (?1)", params![hc_id])
            .unwrap();
        conn.execute(
            "INSERT INTO patients (u_id, hc_id, balance_cents) VALUES (?1, ?2, ?3)",
            params![u_id, hc_id, balance_cents],
        )
        .unwrap();
    }

    pub fn doctor(conn: &Connection, u_id: &str, price_cents: i64) {
        user(conn, u_id, "Doctor");
        conn.execute(
            "INSERT INTO doctors (u_id, d_id, rating, price_cents, specialization)
             VALUES (?1, 'D0001', 0, ?2, 'Cardiology')",
            params![u_id, price_cents],
        )
        .unwrap();
    }

    pub fn appointment(conn: &Connection, patient: &str, doctor: &str, ts_id: &str, date: &str) {
        conn.execute(
            "INSERT INTO appointments (patient_id, doc_id, ts_id, date, price_cents)
             VALUES (?1, ?2, ?3, ?4, 5000)",
            params![patient, doctor, ts_id, date],
        )
        .unwrap();
    }
}

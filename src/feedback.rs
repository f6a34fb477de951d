//! Feedback Store: patient ratings of doctors they have seen.
//!
//! A doctor's `rating` column always equals the mean of their feedback
//! ratings (0 with no feedback). Every write that adds or removes feedback
//! recomputes it in the same transaction.

use rusqlite::{params, Connection};

use crate::accounts::{require_doctor, require_patient};
use crate::db::{self, next_id, DatabaseError, IdKind};
use crate::models::Feedback;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Recompute `doctors.rating` from the doctor's feedback rows.
pub(crate) fn refresh_rating(conn: &Connection, doctor_id: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE doctors
         SET rating = COALESCE((SELECT AVG(rating) FROM feedback WHERE doc_id = ?1), 0)
         WHERE u_id = ?1",
        params![doctor_id],
    )?;
    Ok(())
}

/// Record a rating from a patient who has at least one appointment with
/// the doctor. Returns the new feedback id.
pub fn give_feedback(
    conn: &Connection,
    patient_id: &str,
    doctor_id: &str,
    rating: f64,
    comment: Option<&str>,
) -> Result<String, DatabaseError> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(DatabaseError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());

    let tx = db::begin_immediate(conn)?;
    require_patient(&tx, patient_id)?;
    require_doctor(&tx, doctor_id)?;

    let visits: i64 = tx.query_row(
        "SELECT COUNT(*) FROM appointments WHERE patient_id = ?1 AND doc_id = ?2",
        params![patient_id, doctor_id],
        |row| row.get(0),
    )?;
    if visits == 0 {
        return Err(DatabaseError::PreconditionFailed(format!(
            "patient {patient_id} has no appointment with doctor {doctor_id}"
        )));
    }

    let f_id = next_id(&tx, IdKind::Feedback)?;
    tx.execute(
        "INSERT INTO feedback (f_id, patient_id, doc_id, rating, comment)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![f_id, patient_id, doctor_id, rating, comment],
    )?;
    refresh_rating(&tx, doctor_id)?;
    tx.commit()?;

    tracing::info!(f_id = %f_id, doctor_id = %doctor_id, rating, "Recorded feedback");
    Ok(f_id)
}

/// Feedback received by a doctor, newest first.
pub fn list_doctor_feedback(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Vec<Feedback>, DatabaseError> {
    require_doctor(conn, doctor_id)?;
    let mut stmt = conn.prepare(
        "SELECT f_id, patient_id, doc_id, rating, comment, created_at
         FROM feedback
         WHERE doc_id = ?1
         ORDER BY created_at DESC, f_id DESC",
    )?;
    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(Feedback {
            f_id: row.get(0)?,
            patient_id: row.get(1)?,
            doc_id: row.get(2)?,
            rating: row.get(3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

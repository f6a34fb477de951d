//! Appointment Ledger: bookings, declared unavailability, and schedules.
//!
//! Booking checks the slot, checks the patient's balance, inserts the
//! appointment and debits the doctor's price in one IMMEDIATE transaction.
//! The schema's UNIQUE (doc_id, ts_id, date) backs the slot check, so a
//! racing second booking fails instead of double-booking.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::accounts::{require_doctor, require_patient};
use crate::availability::is_slot_free;
use crate::db::{self, map_unique, next_id, DatabaseError, IdKind};
use crate::models::{AppointmentDetail, BookingRequest, TimeSlot, Unavailability};

// ─── Shared queries ───────────────────────────────────────────────────────────

const DETAIL_SELECT: &str = "
    SELECT a.patient_id, pu.name || ' ' || pu.surname,
           a.doc_id, du.name || ' ' || du.surname, d.specialization,
           a.date, ts.ts_id, ts.start_time, ts.end_time, a.price_cents
    FROM appointments a
    JOIN users pu ON pu.u_id = a.patient_id
    JOIN users du ON du.u_id = a.doc_id
    JOIN doctors d ON d.u_id = a.doc_id
    JOIN time_slots ts ON ts.ts_id = a.ts_id";

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentDetail> {
    Ok(AppointmentDetail {
        patient_id: row.get(0)?,
        patient_name: row.get(1)?,
        doctor_id: row.get(2)?,
        doctor_name: row.get(3)?,
        specialization: row.get(4)?,
        date: row.get(5)?,
        slot: TimeSlot {
            ts_id: row.get(6)?,
            start_time: row.get(7)?,
            end_time: row.get(8)?,
        },
        price: row.get(9)?,
    })
}

fn require_slot(conn: &Connection, slot_id: &str) -> Result<(), DatabaseError> {
    conn.query_row(
        "SELECT 1 FROM time_slots WHERE ts_id = ?1",
        params![slot_id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("TimeSlot", slot_id))
}

// ─── Booking ──────────────────────────────────────────────────────────────────

/// Book a slot and debit the doctor's price from the patient's balance.
///
/// Fails without writing anything when either party or the slot is
/// unknown, the slot is taken or blocked, or the balance is short.
pub fn book(conn: &Connection, request: &BookingRequest) -> Result<AppointmentDetail, DatabaseError> {
    let BookingRequest {
        patient_id,
        doctor_id,
        ts_id,
        date,
    } = request;

    let tx = db::begin_immediate(conn)?;
    let patient = require_patient(&tx, patient_id)?;
    let doctor = require_doctor(&tx, doctor_id)?;
    require_slot(&tx, ts_id)?;

    if !is_slot_free(&tx, doctor_id, ts_id, *date)? {
        return Err(DatabaseError::SlotUnavailable {
            doctor_id: doctor_id.clone(),
            slot_id: ts_id.clone(),
            date: *date,
        });
    }
    if patient.balance < doctor.price {
        return Err(DatabaseError::InsufficientBalance {
            required: doctor.price,
            available: patient.balance,
        });
    }

    tx.execute(
        "INSERT INTO appointments (patient_id, doc_id, ts_id, date, price_cents)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![patient_id, doctor_id, ts_id, date, doctor.price],
    )
    .map_err(|e| map_unique(e, &format!("appointment {doctor_id}/{ts_id}/{date}")))?;
    tx.execute(
        "UPDATE patients SET balance_cents = balance_cents - ?2 WHERE u_id = ?1",
        params![patient_id, doctor.price],
    )?;

    let detail = tx.query_row(
        &format!("{DETAIL_SELECT} WHERE a.doc_id = ?1 AND a.ts_id = ?2 AND a.date = ?3"),
        params![doctor_id, ts_id, date],
        detail_from_row,
    )?;
    tx.commit()?;

    tracing::info!(
        patient_id = %patient_id,
        doctor_id = %doctor_id,
        ts_id = %ts_id,
        date = %date,
        price = %doctor.price,
        "Booked appointment"
    );
    Ok(detail)
}

pub fn list_patient_appointments(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    require_patient(conn, patient_id)?;
    let mut stmt = conn.prepare(&format!(
        "{DETAIL_SELECT} WHERE a.patient_id = ?1 ORDER BY a.date, ts.start_time"
    ))?;
    let rows = stmt.query_map(params![patient_id], detail_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn list_doctor_appointments(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    require_doctor(conn, doctor_id)?;
    let mut stmt = conn.prepare(&format!(
        "{DETAIL_SELECT} WHERE a.doc_id = ?1 ORDER BY a.date, ts.start_time"
    ))?;
    let rows = stmt.query_map(params![doctor_id], detail_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

// ─── Unavailability ───────────────────────────────────────────────────────────

/// Block one slot of one day for a doctor.
///
/// An existing appointment in that slot is kept; the block only stops new
/// bookings. Declaring the same block twice is `AlreadyExists`.
pub fn declare_unavailability(
    conn: &Connection,
    doctor_id: &str,
    slot_id: &str,
    date: NaiveDate,
) -> Result<Unavailability, DatabaseError> {
    let tx = db::begin_immediate(conn)?;
    require_doctor(&tx, doctor_id)?;
    require_slot(&tx, slot_id)?;

    let booked: bool = tx.query_row(
        "SELECT EXISTS (SELECT 1 FROM appointments WHERE doc_id = ?1 AND ts_id = ?2 AND date = ?3)",
        params![doctor_id, slot_id, date],
        |row| row.get(0),
    )?;
    if booked {
        tracing::warn!(
            doctor_id = %doctor_id,
            ts_id = %slot_id,
            date = %date,
            "Declaring unavailability over a booked slot"
        );
    }

    let ua_id = next_id(&tx, IdKind::Unavailability)?;
    tx.execute(
        "INSERT INTO unavailability (ua_id, doc_id, ts_id, date) VALUES (?1, ?2, ?3, ?4)",
        params![ua_id, doctor_id, slot_id, date],
    )
    .map_err(|e| map_unique(e, &format!("unavailability {doctor_id}/{slot_id}/{date}")))?;
    tx.commit()?;

    tracing::info!(ua_id = %ua_id, doctor_id = %doctor_id, "Declared unavailability");
    Ok(Unavailability {
        ua_id,
        doc_id: doctor_id.to_string(),
        ts_id: slot_id.to_string(),
        date,
    })
}

pub fn list_unavailability(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Vec<Unavailability>, DatabaseError> {
    require_doctor(conn, doctor_id)?;
    let mut stmt = conn.prepare(
        "SELECT ua.ua_id, ua.doc_id, ua.ts_id, ua.date
         FROM unavailability ua
         JOIN time_slots ts ON ts.ts_id = ua.ts_id
         WHERE ua.doc_id = ?1
         ORDER BY ua.date, ts.start_time",
    )?;
    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(Unavailability {
            ua_id: row.get(0)?,
            doc_id: row.get(1)?,
            ts_id: row.get(2)?,
            date: row.get(3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

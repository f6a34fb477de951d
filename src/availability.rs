//! Availability Engine: which catalog slots a doctor can still take on a day.
//!
//! A slot is free for (doctor, date) when neither an appointment nor a
//! declared unavailability exists for that triple.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::accounts::require_doctor;
use crate::db::DatabaseError;
use crate::models::TimeSlot;

const FREE_FILTER: &str = "
    NOT EXISTS (SELECT 1 FROM appointments a
                WHERE a.doc_id = ?1 AND a.ts_id = ts.ts_id AND a.date = ?2)
    AND NOT EXISTS (SELECT 1 FROM unavailability ua
                    WHERE ua.doc_id = ?1 AND ua.ts_id = ts.ts_id AND ua.date = ?2)";

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimeSlot> {
    Ok(TimeSlot {
        ts_id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
    })
}

/// The fixed daily slot catalog, in time order.
pub fn list_time_slots(conn: &Connection) -> Result<Vec<TimeSlot>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT ts_id, start_time, end_time FROM time_slots ORDER BY start_time")?;
    let rows = stmt.query_map([], slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Slots with no appointment and no declared unavailability for the doctor
/// on `date`, in time order.
pub fn list_available_slots(
    conn: &Connection,
    doctor_id: &str,
    date: NaiveDate,
) -> Result<Vec<TimeSlot>, DatabaseError> {
    require_doctor(conn, doctor_id)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT ts.ts_id, ts.start_time, ts.end_time
         FROM time_slots ts
         WHERE {FREE_FILTER}
         ORDER BY ts.start_time"
    ))?;
    let rows = stmt.query_map(params![doctor_id, date], slot_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Whether one slot is open for the doctor on `date`.
///
/// An unknown slot id is never free.
pub fn is_slot_free(
    conn: &Connection,
    doctor_id: &str,
    slot_id: &str,
    date: NaiveDate,
) -> Result<bool, DatabaseError> {
    let free: bool = conn.query_row(
        &format!(
            "SELECT EXISTS (SELECT 1 FROM time_slots ts WHERE ts.ts_id = ?3 AND {FREE_FILTER})"
        ),
        params![doctor_id, date, slot_id],
        |row| row.get(0),
    )?;
    Ok(free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::db::sqlite::open_memory_database;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn setup_db() -> Connection {
        let conn = open_memory_database().unwrap();
        fixtures::patient(&conn, "U0001", "HC001", 0);
        fixtures::doctor(&conn, "U0002", 5_000);
        fixtures::doctor(&conn, "U0003", 5_000);
        conn
    }

    #[test]
    fn catalog_is_time_ordered() {
        let conn = setup_db();
        let slots = list_time_slots(&conn).unwrap();
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0].ts_id, "TS001");
        assert_eq!(slots[0].start_time, "09:00");
        assert!(slots.windows(2).all(|w| w[0].start_time < w[1].start_time));
    }

    #[test]
    fn free_doctor_has_every_slot() {
        let conn = setup_db();
        assert_eq!(list_available_slots(&conn, "U0002", day()).unwrap().len(), 7);
    }

    #[test]
    fn booked_and_blocked_slots_are_excluded() {
        let conn = setup_db();
        fixtures::appointment(&conn, "U0001", "U0002", "TS001", "2026-03-02");
        conn.execute(
            "INSERT INTO unavailability VALUES ('UA0001', 'U0002', 'TS004', '2026-03-02')",
            [],
        )
        .unwrap();

        let slots = list_available_slots(&conn, "U0002", day()).unwrap();
        let ids: Vec<&str> = slots.iter().map(|s| s.ts_id.as_str()).collect();
        assert_eq!(ids.len(), 5);
        assert!(!ids.contains(&"TS001"));
        assert!(!ids.contains(&"TS004"));

        assert!(!is_slot_free(&conn, "U0002", "TS001", day()).unwrap());
        assert!(!is_slot_free(&conn, "U0002", "TS004", day()).unwrap());
        assert!(is_slot_free(&conn, "U0002", "TS002", day()).unwrap());
    }

    #[test]
    fn blocks_are_per_doctor_and_per_day() {
        let conn = setup_db();
        fixtures::appointment(&conn, "U0001", "U0002", "TS001", "2026-03-02");

        assert!(is_slot_free(&conn, "U0003", "TS001", day()).unwrap());
        let next_day = day().succ_opt().unwrap();
        assert!(is_slot_free(&conn, "U0002", "TS001", next_day).unwrap());
    }

    #[test]
    fn unknown_slot_is_never_free() {
        let conn = setup_db();
        assert!(!is_slot_free(&conn, "U0002", "TS999", day()).unwrap());
    }

    #[test]
    fn unknown_doctor_is_not_found() {
        let conn = setup_db();
        assert!(matches!(
            list_available_slots(&conn, "U0001", day()),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}

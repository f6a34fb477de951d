//! Human-readable primary keys (`U0001`, `HC001`, `ME001`, ...).
//!
//! The next id is `prefix + zero-padded(max existing suffix + 1)`, scanning
//! only rows whose id matches the exact pattern. Callers must generate ids
//! inside the same `IMMEDIATE` transaction as the insert that uses them:
//! SQLite then holds the write lock from the scan through the insert, so
//! two concurrent generations cannot observe the same maximum.

use rusqlite::{params, Connection};

use super::DatabaseError;

/// Every id pattern the store issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    User,
    HealthCard,
    Equipment,
    BloodTest,
    Prescription,
    Feedback,
    Unavailability,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::User => "U",
            Self::HealthCard => "HC",
            Self::Equipment => "ME",
            Self::BloodTest => "BT",
            Self::Prescription => "P",
            Self::Feedback => "F",
            Self::Unavailability => "UA",
        }
    }

    pub fn width(self) -> usize {
        match self {
            Self::HealthCard | Self::Equipment => 3,
            _ => 4,
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::HealthCard => "health_cards",
            Self::Equipment => "medical_equipment",
            Self::BloodTest => "blood_tests",
            Self::Prescription => "prescriptions",
            Self::Feedback => "feedback",
            Self::Unavailability => "unavailability",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::User => "u_id",
            Self::HealthCard => "hc_id",
            Self::Equipment => "me_id",
            Self::BloodTest => "bt_id",
            Self::Prescription => "p_id",
            Self::Feedback => "f_id",
            Self::Unavailability => "ua_id",
        }
    }

    /// GLOB pattern matching exactly `prefix` followed by `width` digits.
    fn glob(self) -> String {
        format!("{}{}", self.prefix(), "[0-9]".repeat(self.width()))
    }

    fn label(self) -> &'static str {
        self.table()
    }
}

/// Format `n` in the display pattern of `kind`.
pub fn format_id(kind: IdKind, n: u32) -> String {
    format!("{}{:0width$}", kind.prefix(), n, width = kind.width())
}

/// Issue the next id for `kind`.
pub fn next_id(conn: &Connection, kind: IdKind) -> Result<String, DatabaseError> {
    let sql = format!(
        "SELECT COALESCE(MAX(CAST(substr({col}, ?1) AS INTEGER)), 0)
         FROM {table} WHERE {col} GLOB ?2",
        col = kind.column(),
        table = kind.table(),
    );
    let start = kind.prefix().len() as i64 + 1;
    let max: i64 = conn.query_row(&sql, params![start, kind.glob()], |row| row.get(0))?;

    let limit = 10_i64.pow(kind.width() as u32) - 1;
    if max >= limit {
        return Err(DatabaseError::IdSpaceExhausted(kind.label()));
    }
    Ok(format_id(kind, (max + 1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn insert_user(conn: &Connection, id: &str) {
        conn.execute(
            "INSERT INTO users (u_id, name, surname, email_address, password_hash)
             VALUES (?1, 'N', 'S', ?1 || '@example.com', 'x')",
            params![id],
        )
        .unwrap();
    }

    #[test]
    fn first_ids_are_pattern_minimum() {
        let conn = open_memory_database().unwrap();
        assert_eq!(next_id(&conn, IdKind::User).unwrap(), "U0001");
        assert_eq!(next_id(&conn, IdKind::HealthCard).unwrap(), "HC001");
        assert_eq!(next_id(&conn, IdKind::Equipment).unwrap(), "ME001");
        assert_eq!(next_id(&conn, IdKind::Unavailability).unwrap(), "UA0001");
    }

    #[test]
    fn next_user_after_three_is_u0004() {
        let conn = open_memory_database().unwrap();
        for id in ["U0001", "U0002", "U0003"] {
            insert_user(&conn, id);
        }
        assert_eq!(next_id(&conn, IdKind::User).unwrap(), "U0004");
    }

    #[test]
    fn gaps_continue_from_maximum() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, "U0002");
        insert_user(&conn, "U0017");
        assert_eq!(next_id(&conn, IdKind::User).unwrap(), "U0018");
    }

    #[test]
    fn ids_outside_the_pattern_are_ignored() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, "U0005");
        insert_user(&conn, "U99999");
        insert_user(&conn, "ADMIN");
        insert_user(&conn, "UX123");
        assert_eq!(next_id(&conn, IdKind::User).unwrap(), "U0006");
    }

    #[test]
    fn exhausted_space_is_an_error() {
        let conn = open_memory_database().unwrap();
        conn.execute("INSERT INTO health_cards (hc_id) VALUES ('HC999')", [])
            .unwrap();
        let err = next_id(&conn, IdKind::HealthCard).unwrap_err();
        assert!(matches!(err, DatabaseError::IdSpaceExhausted("health_cards")));
    }

    #[test]
    fn format_pads_to_width() {
        assert_eq!(format_id(IdKind::Prescription, 7), "P0007");
        assert_eq!(format_id(IdKind::Equipment, 42), "ME042");
    }
}

//! Inventory Store: medical equipment stock levels.
//!
//! `update_equipment` overwrites a count (last write wins). Concurrent stock
//! movements go through `adjust_equipment`, which applies a delta in a
//! single statement and never lets the count drop below zero.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{self, map_unique, next_id, DatabaseError, IdKind};
use crate::models::MedicalEquipment;

fn non_negative_amount(amount: i64) -> Result<i64, DatabaseError> {
    if amount < 0 {
        return Err(DatabaseError::Validation(format!(
            "amount cannot be negative, got {amount}"
        )));
    }
    Ok(amount)
}

pub fn list_equipment(conn: &Connection) -> Result<Vec<MedicalEquipment>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT me_id, name, format, amount FROM medical_equipment ORDER BY me_id")?;
    let rows = stmt.query_map([], |row| {
        Ok(MedicalEquipment {
            me_id: row.get(0)?,
            name: row.get(1)?,
            format: row.get(2)?,
            amount: row.get(3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Add a new item. Names are unique.
pub fn create_equipment(
    conn: &Connection,
    name: &str,
    format: &str,
    amount: i64,
) -> Result<MedicalEquipment, DatabaseError> {
    let name = name.trim();
    let format = format.trim();
    if name.is_empty() || format.is_empty() {
        return Err(DatabaseError::Validation("name and format are required".into()));
    }
    let amount = non_negative_amount(amount)?;

    let tx = db::begin_immediate(conn)?;
    let me_id = next_id(&tx, IdKind::Equipment)?;
    tx.execute(
        "INSERT INTO medical_equipment (me_id, name, format, amount) VALUES (?1, ?2, ?3, ?4)",
        params![me_id, name, format, amount],
    )
    .map_err(|e| map_unique(e, &format!("equipment {name}")))?;
    tx.commit()?;

    tracing::info!(me_id = %me_id, name = %name, amount, "Created equipment");
    Ok(MedicalEquipment {
        me_id,
        name: name.to_string(),
        format: format.to_string(),
        amount,
    })
}

/// Set the stock count of the item called `name`.
pub fn update_equipment(conn: &Connection, name: &str, amount: i64) -> Result<(), DatabaseError> {
    let amount = non_negative_amount(amount)?;
    let changed = conn.execute(
        "UPDATE medical_equipment SET amount = ?2 WHERE name = ?1",
        params![name.trim(), amount],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Equipment", name));
    }
    Ok(())
}

/// Add `delta` (possibly negative) to an item's count. Returns the new count.
pub fn adjust_equipment(conn: &Connection, me_id: &str, delta: i64) -> Result<i64, DatabaseError> {
    let updated: Option<i64> = conn
        .query_row(
            "UPDATE medical_equipment SET amount = amount + ?2
             WHERE me_id = ?1 AND amount + ?2 >= 0
             RETURNING amount",
            params![me_id, delta],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(amount) = updated {
        return Ok(amount);
    }

    let current: Option<i64> = conn
        .query_row(
            "SELECT amount FROM medical_equipment WHERE me_id = ?1",
            params![me_id],
            |row| row.get(0),
        )
        .optional()?;
    match current {
        None => Err(DatabaseError::not_found("Equipment", me_id)),
        Some(current) => Err(DatabaseError::PreconditionFailed(format!(
            "{me_id} has {current} in stock, cannot remove {}",
            delta.unsigned_abs()
        ))),
    }
}

//! Clinical Records Store: blood tests and prescriptions on a patient's
//! health card, plus the medication catalog.

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::accounts::{require_doctor, require_patient};
use crate::db::{self, map_unique, next_id, DatabaseError, IdKind};
use crate::models::{BloodPanel, BloodTest, HealthCard, Medication, Prescription, RecentBloodTest};

/// Rows returned by `list_recent_blood_tests` when no limit is given.
pub const DEFAULT_RECENT_LIMIT: u32 = 20;

fn validate_panel(panel: &BloodPanel) -> Result<(), DatabaseError> {
    for (field, value) in panel.values() {
        if !value.is_finite() || value < 0.0 {
            return Err(DatabaseError::Validation(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

// ─── Blood tests ──────────────────────────────────────────────────────────────

const BLOOD_TEST_COLUMNS: &str = "bt.bt_id, bt.hc_id, bt.vitamins, bt.minerals, bt.cholesterol,
     bt.glucose, bt.hemoglobin, bt.white_blood_cells, bt.red_blood_cells, bt.test_date";

fn blood_test_from_row(row: &Row<'_>) -> rusqlite::Result<BloodTest> {
    Ok(BloodTest {
        bt_id: row.get(0)?,
        hc_id: row.get(1)?,
        panel: BloodPanel {
            vitamins: row.get(2)?,
            minerals: row.get(3)?,
            cholesterol: row.get(4)?,
            glucose: row.get(5)?,
            hemoglobin: row.get(6)?,
            white_blood_cells: row.get(7)?,
            red_blood_cells: row.get(8)?,
        },
        test_date: row.get(9)?,
    })
}

/// Record a blood test on the patient's health card. Returns the test id.
pub fn create_blood_test(
    conn: &Connection,
    patient_id: &str,
    panel: &BloodPanel,
    test_date: Option<NaiveDate>,
) -> Result<String, DatabaseError> {
    validate_panel(panel)?;
    let test_date = test_date.unwrap_or_else(|| Local::now().date_naive());

    let tx = db::begin_immediate(conn)?;
    let patient = require_patient(&tx, patient_id)?;
    let bt_id = next_id(&tx, IdKind::BloodTest)?;
    tx.execute(
        "INSERT INTO blood_tests (bt_id, hc_id, vitamins, minerals, cholesterol, glucose,
                                  hemoglobin, white_blood_cells, red_blood_cells, test_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            bt_id,
            patient.hc_id,
            panel.vitamins,
            panel.minerals,
            panel.cholesterol,
            panel.glucose,
            panel.hemoglobin,
            panel.white_blood_cells,
            panel.red_blood_cells,
            test_date,
        ],
    )?;
    tx.commit()?;

    tracing::info!(bt_id = %bt_id, hc_id = %patient.hc_id, "Recorded blood test");
    Ok(bt_id)
}

/// Overwrite a test's panel. The date is kept unless a new one is given.
pub fn update_blood_test_results(
    conn: &Connection,
    bt_id: &str,
    panel: &BloodPanel,
    test_date: Option<NaiveDate>,
) -> Result<BloodTest, DatabaseError> {
    validate_panel(panel)?;

    let tx = db::begin_immediate(conn)?;
    let changed = tx.execute(
        "UPDATE blood_tests SET
             vitamins = ?2, minerals = ?3, cholesterol = ?4, glucose = ?5,
             hemoglobin = ?6, white_blood_cells = ?7, red_blood_cells = ?8,
             test_date = COALESCE(?9, test_date)
         WHERE bt_id = ?1",
        params![
            bt_id,
            panel.vitamins,
            panel.minerals,
            panel.cholesterol,
            panel.glucose,
            panel.hemoglobin,
            panel.white_blood_cells,
            panel.red_blood_cells,
            test_date,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("BloodTest", bt_id));
    }
    let updated = tx.query_row(
        &format!("SELECT {BLOOD_TEST_COLUMNS} FROM blood_tests bt WHERE bt.bt_id = ?1"),
        params![bt_id],
        blood_test_from_row,
    )?;
    tx.commit()?;
    Ok(updated)
}

fn blood_tests_for_card(conn: &Connection, hc_id: &str) -> Result<Vec<BloodTest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOOD_TEST_COLUMNS} FROM blood_tests bt
         WHERE bt.hc_id = ?1
         ORDER BY bt.test_date DESC, bt.bt_id DESC"
    ))?;
    let rows = stmt.query_map(params![hc_id], blood_test_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// A patient's blood tests, newest first.
pub fn list_patient_blood_tests(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<BloodTest>, DatabaseError> {
    let patient = require_patient(conn, patient_id)?;
    blood_tests_for_card(conn, &patient.hc_id)
}

/// Latest blood tests across all patients.
pub fn list_recent_blood_tests(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<RecentBloodTest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOOD_TEST_COLUMNS}, p.u_id, u.name || ' ' || u.surname
         FROM blood_tests bt
         JOIN patients p ON p.hc_id = bt.hc_id
         JOIN users u ON u.u_id = p.u_id
         ORDER BY bt.test_date DESC, bt.bt_id DESC
         LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(RecentBloodTest {
            test: blood_test_from_row(row)?,
            patient_id: row.get(10)?,
            patient_name: row.get(11)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

// ─── Prescriptions ────────────────────────────────────────────────────────────

/// Open a prescription written by `doctor_id` on the patient's health card.
pub fn create_prescription(
    conn: &Connection,
    patient_id: &str,
    doctor_id: &str,
    usage_info: &str,
) -> Result<String, DatabaseError> {
    let usage_info = usage_info.trim();
    if usage_info.is_empty() {
        return Err(DatabaseError::Validation("usage_info is required".into()));
    }

    let tx = db::begin_immediate(conn)?;
    let patient = require_patient(&tx, patient_id)?;
    require_doctor(&tx, doctor_id)?;
    let p_id = next_id(&tx, IdKind::Prescription)?;
    tx.execute(
        "INSERT INTO prescriptions (p_id, hc_id, doc_id, prescription_date, usage_info)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![p_id, patient.hc_id, doctor_id, Local::now().date_naive(), usage_info],
    )?;
    tx.commit()?;

    tracing::info!(p_id = %p_id, hc_id = %patient.hc_id, doctor_id = %doctor_id, "Created prescription");
    Ok(p_id)
}

/// Attach a catalog medication to a prescription.
pub fn prescribe_medication(
    conn: &Connection,
    prescription_id: &str,
    medication_id: &str,
) -> Result<(), DatabaseError> {
    let tx = db::begin_immediate(conn)?;
    tx.query_row(
        "SELECT 1 FROM prescriptions WHERE p_id = ?1",
        params![prescription_id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Prescription", prescription_id))?;
    tx.query_row(
        "SELECT 1 FROM medications WHERE m_id = ?1",
        params![medication_id],
        |_| Ok(()),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Medication", medication_id))?;

    tx.execute(
        "INSERT INTO prescribed_medications (p_id, m_id) VALUES (?1, ?2)",
        params![prescription_id, medication_id],
    )
    .map_err(|e| map_unique(e, &format!("medication {medication_id} on {prescription_id}")))?;
    tx.commit()?;
    Ok(())
}

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        m_id: row.get(0)?,
        name: row.get(1)?,
        format: row.get(2)?,
        dosage: row.get(3)?,
    })
}

pub fn list_medications(conn: &Connection) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT m_id, name, format, dosage FROM medications ORDER BY name")?;
    let rows = stmt.query_map([], medication_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn prescriptions_for_card(conn: &Connection, hc_id: &str) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pr.p_id, pr.hc_id, pr.doc_id, u.name || ' ' || u.surname,
                pr.prescription_date, pr.usage_info
         FROM prescriptions pr
         JOIN users u ON u.u_id = pr.doc_id
         WHERE pr.hc_id = ?1
         ORDER BY pr.prescription_date DESC, pr.p_id DESC",
    )?;
    let mut prescriptions = stmt
        .query_map(params![hc_id], |row| {
            Ok(Prescription {
                p_id: row.get(0)?,
                hc_id: row.get(1)?,
                doc_id: row.get(2)?,
                doctor_name: row.get(3)?,
                prescription_date: row.get(4)?,
                usage_info: row.get(5)?,
                medications: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut meds = conn.prepare(
        "SELECT m.m_id, m.name, m.format, m.dosage
         FROM prescribed_medications pm
         JOIN medications m ON m.m_id = pm.m_id
         WHERE pm.p_id = ?1
         ORDER BY m.name",
    )?;
    for prescription in &mut prescriptions {
        prescription.medications = meds
            .query_map(params![prescription.p_id], medication_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(prescriptions)
}

// ─── Health card ──────────────────────────────────────────────────────────────

/// Everything recorded on a patient's health card.
pub fn get_health_card(conn: &Connection, patient_id: &str) -> Result<HealthCard, DatabaseError> {
    let patient = require_patient(conn, patient_id)?;
    let patient_name: String = conn.query_row(
        "SELECT name || ' ' || surname FROM users WHERE u_id = ?1",
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(HealthCard {
        blood_tests: blood_tests_for_card(conn, &patient.hc_id)?,
        prescriptions: prescriptions_for_card(conn, &patient.hc_id)?,
        hc_id: patient.hc_id,
        patient_id: patient_id.to_string(),
        patient_name,
    })
}

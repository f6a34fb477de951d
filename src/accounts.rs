//! User & Role Store.
//!
//! A user's role is the one extension table (patients, doctors, staff,
//! admins) holding a row for its id. The role is resolved by a single joined
//! read (`USER_SELECT`) into the `Role` union and never stored on `users`.
//!
//! Role changes and deletes purge role-owned rows in dependency order inside
//! one IMMEDIATE transaction, so a failure leaves nothing half-removed.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::crypto;
use crate::db::{self, map_unique, next_id, DatabaseError, IdKind};
use crate::feedback::refresh_rating;
use crate::models::{
    Department, DoctorListing, DoctorProfile, Money, NewUser, PatientProfile, Registration, Role,
    RoleAttributes, RoleKind, SystemStats, UserRecord, UserUpdate,
};

/// Department assigned to a doctor when none is given.
pub const DEFAULT_DEPARTMENT: &str = "D0010";
pub const DEFAULT_SPECIALIZATION: &str = "General";
pub const DEFAULT_DOCTOR_PRICE: Money = Money::from_units(50);

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

// ─── Reads ────────────────────────────────────────────────────────────────────

const USER_SELECT: &str = "
    SELECT u.u_id, u.name, u.surname, u.email_address, u.phone_no,
           p.hc_id, p.balance_cents,
           d.d_id, d.rating, d.price_cents, d.specialization,
           s.u_id IS NOT NULL, a.u_id IS NOT NULL
    FROM users u
    LEFT JOIN patients p ON p.u_id = u.u_id
    LEFT JOIN doctors d ON d.u_id = u.u_id
    LEFT JOIN staff s ON s.u_id = u.u_id
    LEFT JOIN admins a ON a.u_id = u.u_id";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let hc_id: Option<String> = row.get(5)?;
    let d_id: Option<String> = row.get(7)?;
    let is_staff: bool = row.get(11)?;
    let is_admin: bool = row.get(12)?;

    let role = if let Some(hc_id) = hc_id {
        Some(Role::Patient(PatientProfile {
            hc_id,
            balance: row.get(6)?,
        }))
    } else if let Some(d_id) = d_id {
        Some(Role::Doctor(DoctorProfile {
            d_id,
            rating: row.get(8)?,
            price: row.get(9)?,
            specialization: row.get(10)?,
        }))
    } else if is_staff {
        Some(Role::Staff)
    } else if is_admin {
        Some(Role::Admin)
    } else {
        None
    };

    Ok(UserRecord {
        u_id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        email_address: row.get(3)?,
        phone_no: row.get(4)?,
        role,
    })
}

/// Fetch one user with its derived role.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<UserRecord, DatabaseError> {
    conn.query_row(
        &format!("{USER_SELECT} WHERE u.u_id = ?1"),
        params![user_id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("User", user_id))
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{USER_SELECT} ORDER BY u.u_id"))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Current role of an existing user. `NotFound` when the user is absent.
pub fn load_role(conn: &Connection, user_id: &str) -> Result<Option<Role>, DatabaseError> {
    Ok(get_user(conn, user_id)?.role)
}

pub fn system_stats(conn: &Connection) -> Result<SystemStats, DatabaseError> {
    let stats = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM patients),
                (SELECT COUNT(*) FROM doctors),
                (SELECT COUNT(*) FROM staff),
                (SELECT COUNT(*) FROM admins),
                (SELECT COUNT(*) FROM appointments)",
        [],
        |row| {
            Ok(SystemStats {
                total_users: row.get(0)?,
                total_patients: row.get(1)?,
                total_doctors: row.get(2)?,
                total_staff: row.get(3)?,
                total_admins: row.get(4)?,
                total_appointments: row.get(5)?,
            })
        },
    )?;
    Ok(stats)
}

/// Departments with the number of doctors assigned to each.
pub fn list_departments(conn: &Connection) -> Result<Vec<Department>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT dp.d_id, dp.dept_name, COUNT(doc.u_id)
         FROM departments dp
         LEFT JOIN doctors doc ON doc.d_id = dp.d_id
         GROUP BY dp.d_id, dp.dept_name
         ORDER BY dp.dept_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Department {
            d_id: row.get(0)?,
            dept_name: row.get(1)?,
            doctor_count: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Doctors offered for booking, optionally restricted to one department
/// (matched by name, ignoring case). An unknown department yields no rows.
pub fn filter_doctors_by_department(
    conn: &Connection,
    dept_name: Option<&str>,
) -> Result<Vec<DoctorListing>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT u.u_id, u.name, u.surname, d.specialization, d.rating, d.price_cents, dp.dept_name
         FROM doctors d
         JOIN users u ON u.u_id = d.u_id
         JOIN departments dp ON dp.d_id = d.d_id
         WHERE ?1 IS NULL OR dp.dept_name = ?1 COLLATE NOCASE
         ORDER BY d.rating DESC, u.surname, u.name",
    )?;
    let rows = stmt.query_map(params![dept_name.map(str::trim)], |row| {
        Ok(DoctorListing {
            u_id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            specialization: row.get(3)?,
            rating: row.get(4)?,
            price: row.get(5)?,
            dept_name: row.get(6)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn patient_balance(conn: &Connection, patient_id: &str) -> Result<Money, DatabaseError> {
    Ok(require_patient(conn, patient_id)?.balance)
}

/// The patient extension of `patient_id`, or `NotFound`.
pub(crate) fn require_patient(conn: &Connection, patient_id: &str) -> Result<PatientProfile, DatabaseError> {
    conn.query_row(
        "SELECT hc_id, balance_cents FROM patients WHERE u_id = ?1",
        params![patient_id],
        |row| {
            Ok(PatientProfile {
                hc_id: row.get(0)?,
                balance: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Patient", patient_id))
}

/// The doctor extension of `doctor_id`, or `NotFound`.
pub(crate) fn require_doctor(conn: &Connection, doctor_id: &str) -> Result<DoctorProfile, DatabaseError> {
    conn.query_row(
        "SELECT d_id, rating, price_cents, specialization FROM doctors WHERE u_id = ?1",
        params![doctor_id],
        |row| {
            Ok(DoctorProfile {
                d_id: row.get(0)?,
                rating: row.get(1)?,
                price: row.get(2)?,
                specialization: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Doctor", doctor_id))
}

// ─── Login and registration ───────────────────────────────────────────────────

/// Check credentials. `None` for an unknown email or a wrong password.
pub fn authenticate(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Option<UserRecord>, DatabaseError> {
    let stored: Option<(String, String)> = conn
        .query_row(
            "SELECT u_id, password_hash FROM users WHERE email_address = ?1",
            params![email.trim()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((user_id, hash)) = stored else {
        return Ok(None);
    };
    if !crypto::verify_password(password, &hash)? {
        tracing::debug!(user_id = %user_id, "Rejected login: wrong password");
        return Ok(None);
    }
    get_user(conn, &user_id).map(Some)
}

/// Self-service sign-up. Always creates a patient with a zero balance.
///
/// `password_hash` is the PHC string of `registration.password`. Returns
/// the new user id and health-card id.
pub fn register_patient(
    conn: &Connection,
    registration: &Registration,
    password_hash: &str,
) -> Result<(String, String), DatabaseError> {
    let fields = BaseFields::validate(
        &registration.name,
        &registration.surname,
        &registration.email,
        &registration.phone,
        &registration.password,
    )?;

    let tx = db::begin_immediate(conn)?;
    let user_id = insert_user(&tx, &fields, password_hash)?;
    let role = insert_role_extension(&tx, &user_id, RoleKind::Patient, &RoleAttributes::default())?;
    tx.commit()?;

    let hc_id = match role {
        Role::Patient(profile) => profile.hc_id,
        _ => String::new(),
    };
    tracing::info!(user_id = %user_id, hc_id = %hc_id, "Registered patient");
    Ok((user_id, hc_id))
}

// ─── Creation ─────────────────────────────────────────────────────────────────

struct BaseFields<'a> {
    name: &'a str,
    surname: &'a str,
    email: &'a str,
    phone: &'a str,
}

impl<'a> BaseFields<'a> {
    fn validate(
        name: &'a str,
        surname: &'a str,
        email: &'a str,
        phone: &'a str,
        password: &str,
    ) -> Result<Self, DatabaseError> {
        let fields = Self {
            name: required("name", name)?,
            surname: required("surname", surname)?,
            email: valid_email(email)?,
            phone: required("phone", phone)?,
        };
        required("password", password)?;
        Ok(fields)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn valid_email(email: &str) -> Result<&str, DatabaseError> {
    let email = required("email", email)?;
    if !EMAIL_PATTERN.is_match(email) {
        return Err(DatabaseError::Validation(format!("invalid email address: {email}")));
    }
    Ok(email)
}

fn non_negative(field: &str, amount: Money) -> Result<Money, DatabaseError> {
    if amount.is_negative() {
        return Err(DatabaseError::Validation(format!("{field} cannot be negative")));
    }
    Ok(amount)
}

fn insert_user(conn: &Connection, fields: &BaseFields<'_>, hash: &str) -> Result<String, DatabaseError> {
    let user_id = next_id(conn, IdKind::User)?;
    conn.execute(
        "INSERT INTO users (u_id, name, surname, email_address, password_hash, phone_no)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, fields.name, fields.surname, fields.email, hash, fields.phone],
    )
    .map_err(|e| map_unique(e, &format!("email address {}", fields.email)))?;
    Ok(user_id)
}

/// Resolve a department given by id (`D0001`) or by name (`Cardiology`).
fn resolve_department(conn: &Connection, department: &str) -> Result<String, DatabaseError> {
    let department = department.trim();
    conn.query_row(
        "SELECT d_id FROM departments WHERE d_id = ?1 OR dept_name = ?1 COLLATE NOCASE",
        params![department],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("Department", department))
}

/// Insert the single extension row for `kind`, filling unset attributes
/// with the role defaults. A patient also gets a fresh health card.
fn insert_role_extension(
    conn: &Connection,
    user_id: &str,
    kind: RoleKind,
    attrs: &RoleAttributes,
) -> Result<Role, DatabaseError> {
    let role = match kind {
        RoleKind::Patient => {
            let balance = non_negative("balance", attrs.balance.unwrap_or(Money::ZERO))?;
            let hc_id = next_id(conn, IdKind::HealthCard)?;
            conn.execute("INSERT INTO health_cards (hc_id) VALUES (?1)", params![hc_id])?;
            conn.execute(
                "INSERT INTO patients (u_id, hc_id, balance_cents) VALUES (?1, ?2, ?3)",
                params![user_id, hc_id, balance],
            )?;
            Role::Patient(PatientProfile { hc_id, balance })
        }
        RoleKind::Doctor => {
            let d_id = resolve_department(
                conn,
                attrs.department.as_deref().unwrap_or(DEFAULT_DEPARTMENT),
            )?;
            let specialization = attrs
                .specialization
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SPECIALIZATION)
                .to_string();
            let price = non_negative("price", attrs.price.unwrap_or(DEFAULT_DOCTOR_PRICE))?;
            conn.execute(
                "INSERT INTO doctors (u_id, d_id, rating, price_cents, specialization)
                 VALUES (?1, ?2, 0, ?3, ?4)",
                params![user_id, d_id, price, specialization],
            )?;
            Role::Doctor(DoctorProfile {
                d_id,
                rating: 0.0,
                price,
                specialization,
            })
        }
        RoleKind::Staff => {
            conn.execute("INSERT INTO staff (u_id) VALUES (?1)", params![user_id])?;
            Role::Staff
        }
        RoleKind::Admin => {
            conn.execute("INSERT INTO admins (u_id) VALUES (?1)", params![user_id])?;
            Role::Admin
        }
    };
    Ok(role)
}

/// Admin-side creation of a user with any role. Returns the new user id.
pub fn create_user(
    conn: &Connection,
    user: &NewUser,
    password_hash: &str,
) -> Result<String, DatabaseError> {
    let fields = BaseFields::validate(&user.name, &user.surname, &user.email, &user.phone, &user.password)?;
    let kind = RoleKind::from_str(&user.role)?;

    let tx = db::begin_immediate(conn)?;
    let user_id = insert_user(&tx, &fields, password_hash)?;
    insert_role_extension(&tx, &user_id, kind, &user.attributes)?;
    tx.commit()?;

    tracing::info!(user_id = %user_id, role = %kind, "Created user");
    Ok(user_id)
}

// ─── Role change and deletion ─────────────────────────────────────────────────

/// Remove everything a patient owns, then the patient row and health card.
fn purge_patient(conn: &Connection, user_id: &str, hc_id: &str) -> Result<(), DatabaseError> {
    let rated: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT DISTINCT doc_id FROM feedback WHERE patient_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    conn.execute("DELETE FROM feedback WHERE patient_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM appointments WHERE patient_id = ?1", params![user_id])?;
    conn.execute(
        "DELETE FROM prescribed_medications
         WHERE p_id IN (SELECT p_id FROM prescriptions WHERE hc_id = ?1)",
        params![hc_id],
    )?;
    conn.execute("DELETE FROM prescriptions WHERE hc_id = ?1", params![hc_id])?;
    conn.execute("DELETE FROM blood_tests WHERE hc_id = ?1", params![hc_id])?;
    conn.execute("DELETE FROM patients WHERE u_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM health_cards WHERE hc_id = ?1", params![hc_id])?;

    for doctor_id in &rated {
        refresh_rating(conn, doctor_id)?;
    }
    Ok(())
}

/// Remove a doctor's schedule, feedback and prescriptions, then the doctor row.
fn purge_doctor(conn: &Connection, user_id: &str) -> Result<(), DatabaseError> {
    let booked = conn.execute("DELETE FROM appointments WHERE doc_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM unavailability WHERE doc_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM feedback WHERE doc_id = ?1", params![user_id])?;
    conn.execute(
        "DELETE FROM prescribed_medications
         WHERE p_id IN (SELECT p_id FROM prescriptions WHERE doc_id = ?1)",
        params![user_id],
    )?;
    conn.execute("DELETE FROM prescriptions WHERE doc_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM doctors WHERE u_id = ?1", params![user_id])?;
    if booked > 0 {
        tracing::warn!(user_id = %user_id, appointments = booked, "Cancelled doctor's appointments");
    }
    Ok(())
}

fn purge_role(conn: &Connection, user_id: &str, role: Option<&Role>) -> Result<(), DatabaseError> {
    match role {
        Some(Role::Patient(profile)) => purge_patient(conn, user_id, &profile.hc_id)?,
        Some(Role::Doctor(_)) => purge_doctor(conn, user_id)?,
        Some(Role::Staff) | Some(Role::Admin) | None => {}
    }
    for table in ["patients", "doctors", "staff", "admins"] {
        conn.execute(&format!("DELETE FROM {table} WHERE u_id = ?1"), params![user_id])?;
    }
    Ok(())
}

/// Move a user to `new_role`, purging whatever the old role owned.
///
/// Assigning the role the user already holds keeps the existing extension
/// row untouched. The new extension row takes default attributes.
pub fn update_user_role(
    conn: &Connection,
    user_id: &str,
    new_role: &str,
) -> Result<Role, DatabaseError> {
    let kind = RoleKind::from_str(new_role)?;

    let tx = db::begin_immediate(conn)?;
    let current = load_role(&tx, user_id)?;

    if let Some(role) = current.as_ref().filter(|r| r.kind() == kind) {
        let role = role.clone();
        tx.commit()?;
        return Ok(role);
    }

    purge_role(&tx, user_id, current.as_ref())?;
    let role = insert_role_extension(&tx, user_id, kind, &RoleAttributes::default())?;
    tx.commit()?;

    tracing::info!(
        user_id = %user_id,
        from = current.as_ref().map(|r| r.kind().as_str()).unwrap_or("none"),
        to = %kind,
        "Changed user role"
    );
    Ok(role)
}

/// Delete a user and every row that depends on it, all or nothing.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<(), DatabaseError> {
    let tx = db::begin_immediate(conn)?;
    let role = load_role(&tx, user_id)?;
    purge_role(&tx, user_id, role.as_ref())?;
    tx.execute("DELETE FROM users WHERE u_id = ?1", params![user_id])?;
    tx.commit()?;

    tracing::info!(user_id = %user_id, "Deleted user");
    Ok(())
}

// ─── Sparse update ────────────────────────────────────────────────────────────

/// Apply only the supplied fields. Role-specific fields apply to the role
/// the user currently holds and are ignored otherwise. `password_hash` is
/// written only when `update.password` is present.
pub fn update_user_details(
    conn: &Connection,
    user_id: &str,
    update: &UserUpdate,
    password_hash: Option<&str>,
) -> Result<UserRecord, DatabaseError> {
    let name = update.name.as_deref().map(|v| required("name", v)).transpose()?;
    let surname = update.surname.as_deref().map(|v| required("surname", v)).transpose()?;
    let email = update.email.as_deref().map(valid_email).transpose()?;
    let phone = update.phone.as_deref().map(str::trim);
    let price = update.price.map(|p| non_negative("price", p)).transpose()?;
    let balance = update.balance.map(|b| non_negative("balance", b)).transpose()?;
    let hash = match update.password.as_ref() {
        Some(password) => {
            required("password", password)?;
            password_hash
        }
        None => None,
    };

    let tx = db::begin_immediate(conn)?;
    let role = load_role(&tx, user_id)?;

    tx.execute(
        "UPDATE users SET
             name = COALESCE(?2, name),
             surname = COALESCE(?3, surname),
             email_address = COALESCE(?4, email_address),
             phone_no = COALESCE(?5, phone_no),
             password_hash = COALESCE(?6, password_hash)
         WHERE u_id = ?1",
        params![user_id, name, surname, email, phone, hash],
    )
    .map_err(|e| map_unique(e, &format!("email address {}", email.unwrap_or_default())))?;

    match role {
        Some(Role::Doctor(_)) => {
            let d_id = update
                .department
                .as_deref()
                .map(|dept| resolve_department(&tx, dept))
                .transpose()?;
            let specialization = update
                .specialization
                .as_deref()
                .map(|v| required("specialization", v))
                .transpose()?;
            tx.execute(
                "UPDATE doctors SET
                     d_id = COALESCE(?2, d_id),
                     specialization = COALESCE(?3, specialization),
                     price_cents = COALESCE(?4, price_cents)
                 WHERE u_id = ?1",
                params![user_id, d_id, specialization, price],
            )?;
        }
        Some(Role::Patient(_)) => {
            if let Some(balance) = balance {
                tx.execute(
                    "UPDATE patients SET balance_cents = ?2 WHERE u_id = ?1",
                    params![user_id, balance],
                )?;
            }
        }
        Some(Role::Staff) | Some(Role::Admin) | None => {}
    }

    let updated = get_user(&tx, user_id)?;
    tx.commit()?;
    tracing::debug!(user_id = %user_id, "Updated user details");
    Ok(updated)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

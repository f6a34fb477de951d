//! Shared application state and the per-operation connection provider.
//!
//! `CoreState` is created once at startup from an `AppConfig`, wrapped in
//! `Arc`, and handed to every HTTP handler. Store operations never share a
//! connection: each one opens its own, runs on the blocking pool, and drops
//! the connection on the same thread before returning.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;
use tokio::task::JoinError;
use zeroize::Zeroizing;

use crate::config::AppConfig;
use crate::crypto;
use crate::db;

pub struct CoreState {
    config: AppConfig,
}

impl CoreState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    /// Create the database file if needed and bring the schema up to date.
    ///
    /// Runs once at process start, before the server accepts requests.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Io(format!("creating {}: {e}", parent.display()))
                })?;
            }
        }
        let conn = db::open_database(&self.config.database_path, self.config.busy_timeout)?;
        let tables = db::count_tables(&conn)?;
        tracing::info!(
            path = %self.config.database_path.display(),
            tables,
            "Database ready"
        );
        Ok(())
    }

    /// Open a fresh connection for one operation.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        db::open_connection(&self.config.database_path, self.config.busy_timeout)
            .map_err(CoreError::Database)
    }

    /// Run one store operation on its own connection, bounded by `db_timeout`.
    ///
    /// Every commit on the connection passes through a `Deadline`. Once the
    /// deadline expires no further commit can succeed, the running statement
    /// is interrupted and the caller gets `Timeout` with nothing written. If a
    /// commit already went through when the deadline passes, the operation's
    /// own result is awaited and returned instead.
    pub async fn run_db<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, db::DatabaseError> + Send + 'static,
    {
        let mut conn = self.open_db()?;
        let deadline = Arc::new(Deadline::default());
        let gate = Arc::clone(&deadline);
        conn.commit_hook(Some(move || gate.veto_commit()));
        let interrupt = conn.get_interrupt_handle();
        let limit = self.config.db_timeout;

        let mut task = tokio::task::spawn_blocking(move || op(&mut conn));

        match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => finish(joined),
            Err(_) if deadline.expire() => {
                interrupt.interrupt();
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "Store operation timed out");
                Err(CoreError::Timeout(limit))
            }
            Err(_) => {
                tracing::debug!(
                    timeout_ms = limit.as_millis() as u64,
                    "Deadline passed after commit, waiting for the operation"
                );
                finish(task.await)
            }
        }
    }

    /// Hash a password with the configured work factor on the blocking pool.
    ///
    /// Kept apart from `run_db` so hashing never spends a database deadline.
    pub async fn hash_password(&self, password: Zeroizing<String>) -> Result<String, CoreError> {
        let iterations = self.config.password_iterations;
        let hashed = tokio::task::spawn_blocking(move || crypto::hash_password(&password, iterations))
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))?;
        hashed.map_err(|e| CoreError::Database(e.into()))
    }
}

fn finish<T>(joined: Result<Result<T, db::DatabaseError>, JoinError>) -> Result<T, CoreError> {
    match joined {
        Ok(result) => result.map_err(CoreError::Database),
        Err(join_err) => Err(CoreError::TaskFailed(join_err.to_string())),
    }
}

const RUNNING: u8 = 0;
const COMMITTED: u8 = 1;
const EXPIRED: u8 = 2;

/// One-way race between an operation's first commit and its deadline.
///
/// Whichever side moves the state off `RUNNING` first wins; the loser sees
/// the winner's state and backs off.
#[derive(Default)]
struct Deadline(AtomicU8);

impl Deadline {
    /// SQLite commit hook. `true` turns the commit into a rollback.
    fn veto_commit(&self) -> bool {
        match self
            .0
            .compare_exchange(RUNNING, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(COMMITTED) => false,
            Err(_) => true,
        }
    }

    /// Mark the deadline as passed. `false` when a commit already won.
    fn expire(&self) -> bool {
        match self
            .0
            .compare_exchange(RUNNING, EXPIRED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(EXPIRED) => true,
            Err(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Store operation exceeded {0:?}")]
    Timeout(Duration),
    #[error("Store task failed: {0}")]
    TaskFailed(String),
    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::db::DatabaseError;
    use crate::models::Registration;

    fn state_in(dir: &tempfile::TempDir, timeout: Duration) -> CoreState {
        let config = AppConfig {
            database_path: dir.path().join("nested").join("hospital.db"),
            db_timeout: timeout,
            ..AppConfig::default()
        };
        CoreState::new(config)
    }

    #[test]
    fn initialize_creates_parent_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_secs(5));
        state.initialize().unwrap();
        assert!(state.database_path().exists());

        let conn = state.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 17);
    }

    #[test]
    fn initialize_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_secs(5));
        state.initialize().unwrap();
        state.initialize().unwrap();
    }

    #[test]
    fn open_db_enables_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_secs(5));
        state.initialize().unwrap();
        let conn = state.open_db().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn run_db_returns_operation_result() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_secs(5));
        state.initialize().unwrap();

        let slots: i64 = state
            .run_db(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM time_slots", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(slots, 7);
    }

    #[tokio::test]
    async fn run_db_passes_store_errors_through() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_secs(5));
        state.initialize().unwrap();

        let err = state
            .run_db(|_| -> Result<(), DatabaseError> { Err(DatabaseError::not_found("User", "U9999")) })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn run_db_times_out_slow_operations() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_millis(50));
        state.initialize().unwrap();

        let err = state
            .run_db(|_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn timed_out_transaction_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_millis(100));
        state.initialize().unwrap();

        let err = state
            .run_db(|conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO departments (d_id, dept_name) VALUES ('D0099', 'Slow')",
                    [],
                )?;
                // Long-running statement; interrupted when the deadline passes.
                tx.query_row(
                    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c)
                     SELECT COUNT(*) FROM c",
                    [],
                    |row| row.get::<_, i64>(0),
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));

        // Give the blocking task a moment to unwind after the interrupt.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let conn = state.open_db().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM departments WHERE d_id = 'D0099'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    fn count_rows(state: &CoreState, sql: &str) -> i64 {
        let conn = state.open_db().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[tokio::test]
    async fn slow_work_before_commit_leaves_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_millis(50));
        state.initialize().unwrap();
        let hash = crypto::hash_password("pw-123456", 1_000).unwrap();

        let err = state
            .run_db(move |conn| {
                // Rust-side work with no statement running for the interrupt to hit.
                std::thread::sleep(Duration::from_millis(200));
                let registration = Registration {
                    name: "Elif".into(),
                    surname: "Sahin".into(),
                    email: "elif@example.com".into(),
                    password: Zeroizing::new("pw-123456".into()),
                    phone: "5550".into(),
                };
                accounts::register_patient(conn, &registration, &hash)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(count_rows(&state, "SELECT COUNT(*) FROM users"), 0);
        assert_eq!(count_rows(&state, "SELECT COUNT(*) FROM health_cards"), 0);
    }

    #[tokio::test]
    async fn committed_work_is_reported_even_past_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, Duration::from_millis(50));
        state.initialize().unwrap();

        let inserted = state
            .run_db(|conn| {
                conn.execute(
                    "INSERT INTO departments (d_id, dept_name) VALUES ('D0098', 'Late')",
                    [],
                )?;
                std::thread::sleep(Duration::from_millis(200));
                Ok("D0098")
            })
            .await
            .unwrap();
        assert_eq!(inserted, "D0098");
        assert_eq!(
            count_rows(&state, "SELECT COUNT(*) FROM departments WHERE d_id = 'D0098'"),
            1
        );
    }

    #[test]
    fn deadline_and_commit_exclude_each_other() {
        let expired = Deadline::default();
        assert!(expired.expire());
        assert!(expired.veto_commit());
        assert!(expired.expire());

        let committed = Deadline::default();
        assert!(!committed.veto_commit());
        assert!(!committed.veto_commit());
        assert!(!committed.expire());
    }

    #[tokio::test]
    async fn hash_password_uses_configured_work_factor() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("hospital.db"),
            password_iterations: 1_000,
            ..AppConfig::default()
        };
        let state = CoreState::new(config);

        let hash = state
            .hash_password(Zeroizing::new("pw-123456".into()))
            .await
            .unwrap();
        assert!(hash.starts_with("$pbkdf2-sha256$i=1000,"));
        assert!(crypto::verify_password("pw-123456", &hash).unwrap());
    }
}

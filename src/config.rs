use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "HospitalDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,hms_lib=debug"
}

/// Get the application data directory
/// (`<platform data dir>/HospitalDesk`, falling back to the working directory).
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the SQLite database
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("hospital.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// Upper bound on one store operation, connection open to commit.
    pub db_timeout: Duration,
    /// How long SQLite waits on a locked database before failing a statement.
    pub busy_timeout: Duration,
    pub password_iterations: u32,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            database_path: default_database_path(),
            db_timeout: Duration::from_millis(DEFAULT_DB_TIMEOUT_MS),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            password_iterations: PBKDF2_ITERATIONS,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

impl AppConfig {
    /// Read `HMS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr: SocketAddr = parse_var(&lookup, "HMS_BIND_ADDR", defaults.bind_addr)?;
        let database_path = lookup("HMS_DATABASE_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let db_timeout_ms: u64 = parse_var(&lookup, "HMS_DB_TIMEOUT_MS", DEFAULT_DB_TIMEOUT_MS)?;
        let busy_timeout_ms: u64 =
            parse_var(&lookup, "HMS_BUSY_TIMEOUT_MS", DEFAULT_BUSY_TIMEOUT_MS)?;
        let password_iterations: u32 =
            parse_var(&lookup, "HMS_PASSWORD_ITERATIONS", PBKDF2_ITERATIONS)?;
        let cors_origins = match lookup("HMS_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.cors_origins,
        };

        if db_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "HMS_DB_TIMEOUT_MS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if password_iterations < 1_000 {
            return Err(ConfigError::Invalid {
                var: "HMS_PASSWORD_ITERATIONS",
                value: password_iterations.to_string(),
                reason: "must be at least 1000".into(),
            });
        }

        Ok(Self {
            bind_addr,
            database_path,
            db_timeout: Duration::from_millis(db_timeout_ms),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            password_iterations,
            cors_origins,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.db_timeout, Duration::from_secs(5));
        assert_eq!(config.password_iterations, PBKDF2_ITERATIONS);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.database_path.ends_with("hospital.db"));
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HMS_BIND_ADDR", "0.0.0.0:9000"),
            ("HMS_DATABASE_PATH", "/tmp/h.db"),
            ("HMS_DB_TIMEOUT_MS", "250"),
            ("HMS_CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/h.db"));
        assert_eq!(config.db_timeout, Duration::from_millis(250));
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("HMS_BIND_ADDR", "nowhere")]))
            .unwrap_err();
        assert!(err.to_string().contains("HMS_BIND_ADDR"));
    }

    #[test]
    fn rejects_zero_timeout_and_weak_iterations() {
        assert!(AppConfig::from_lookup(lookup_from(&[("HMS_DB_TIMEOUT_MS", "0")])).is_err());
        assert!(
            AppConfig::from_lookup(lookup_from(&[("HMS_PASSWORD_ITERATIONS", "10")])).is_err()
        );
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}

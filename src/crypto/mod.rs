pub mod password;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    HashFailed(String),

    #[error("Stored password hash is corrupted")]
    CorruptedHash,
}

impl From<CryptoError> for crate::db::DatabaseError {
    fn from(err: CryptoError) -> Self {
        crate::db::DatabaseError::Password(err.to_string())
    }
}

//! Salted PBKDF2-HMAC-SHA256 password hashes in PHC string format.
//!
//! The PHC string (`$pbkdf2-sha256$i=...,l=32$<salt>$<hash>`) records the
//! iteration count and salt, so hashes made with an older iteration count
//! keep verifying after the configured count changes.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hash `password` with a fresh salt.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, CryptoError> {
    let salt = SaltString::encode_b64(&generate_salt())
        .map_err(|e| CryptoError::HashFailed(e.to_string()))?;
    let params = Params {
        rounds: iterations,
        output_length: HASH_LENGTH,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| CryptoError::HashFailed(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string.
///
/// `Ok(false)` means a well-formed hash that does not match.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(stored).map_err(|_| CryptoError::CorruptedHash)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn hash_verifies_with_same_password() {
        let hash = hash_password("pass123", TEST_ITERATIONS).unwrap();
        assert!(verify_password("pass123", &hash).unwrap());
        assert!(!verify_password("pass124", &hash).unwrap());
    }

    #[test]
    fn hash_is_salted() {
        let a = hash_password("same", TEST_ITERATIONS).unwrap();
        let b = hash_password("same", TEST_ITERATIONS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("plain-secret", TEST_ITERATIONS).unwrap();
        assert!(!hash.contains("plain-secret"));
        assert!(hash.starts_with("$pbkdf2-sha256$"));
    }

    #[test]
    fn iteration_count_is_recorded() {
        let hash = hash_password("pw", 2_000).unwrap();
        assert!(hash.contains("i=2000"));
        assert!(verify_password("pw", &hash).unwrap());
    }

    #[test]
    fn corrupted_hash_is_an_error() {
        assert!(matches!(
            verify_password("pw", "plaintext-from-old-rows"),
            Err(CryptoError::CorruptedHash)
        ));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}

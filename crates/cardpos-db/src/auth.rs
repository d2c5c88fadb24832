//! Password hashing for operator accounts.
//!
//! Argon2id with a random per-hash salt, stored as a PHC string
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`). Anything that does not
//! parse as a PHC string, such as a bare SHA-256 hex digest, never verifies.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{DbError, DbResult};

/// Hashes `password` for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks `password` against a stored hash. Malformed hashes fail.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pikachu").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("pikachu", &hash));
        assert!(!verify_password("raichu", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plain_digest_never_verifies() {
        // sha256("admin")
        let legacy = "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918";
        assert!(!verify_password("admin", legacy));
        assert!(!verify_password("admin", ""));
    }
}

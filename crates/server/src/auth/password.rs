use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::thread_rng;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let salt = SaltString::generate(&mut thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::internal(format!("Password hashing failed: {err}")))?
        .to_string();
    Ok(hash)
}

/// A stored hash that cannot be parsed never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash is malformed");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("decoy-password-never-issued").ok());

/// Verifies `password` against a throwaway hash so a missing account costs
/// the same argon2 work as a wrong password.
pub fn verify_against_decoy(password: &str) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::{DECOY_HASH, hash_password, verify_password};

    #[test]
    fn hash_verifies_only_original_password() {
        let hash = hash_password("correct horse").expect("hash should succeed");

        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let err = hash_password("short").expect_err("short password should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn decoy_hash_is_real_argon2_that_matches_nothing_submitted() {
        let decoy = DECOY_HASH.as_deref().expect("decoy hash should build");

        assert!(decoy.starts_with("$argon2"));
        assert!(!verify_password("password123", decoy));
    }
}

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier};

use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Argon2id hashing with a fresh random salt per password.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::WeakPassword(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// A malformed stored hash verifies as false rather than erroring.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Unreadable password hash: {}", e);
                false
            }
        }
    }
}

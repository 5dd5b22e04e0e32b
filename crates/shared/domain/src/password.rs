//! Password value object.
//!
//! Hashes with argon2id and a fresh random salt per call, so the same
//! plaintext never produces the same stored value twice.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{DomainError, DomainResult};

/// Hashed password in PHC string format.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext password.
    ///
    /// # Errors
    /// Returns a validation error for an empty or whitespace-only password,
    /// or a password error if argon2 rejects the input.
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        if plain_text.trim().is_empty() {
            return Err(DomainError::validation("Password is required."));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::password(format!("hash failed: {}", e)))?;

        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Check a plaintext password against this hash.
    ///
    /// A stored value that is not a valid PHC string never verifies.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Self::argon2()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    #[inline]
    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }
}

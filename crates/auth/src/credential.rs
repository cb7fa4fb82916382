//! One-way credential hashing (Argon2id) and initial password provisioning.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;

use crate::CredentialHash;

/// Length of generated one-time passwords.
pub const INITIAL_PASSWORD_LEN: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential hashing failed: {0}")]
    Hashing(String),

    #[error("stored credential is malformed: {0}")]
    Malformed(String),
}

/// Password hashing service.
///
/// Plaintext goes in, an opaque credential comes out; nothing here ever
/// yields the plaintext back.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<CredentialHash, CredentialError>;

    /// `Ok(false)` on mismatch, `Err` only if the stored credential is unreadable.
    fn verify(&self, plaintext: &str, credential: &CredentialHash) -> Result<bool, CredentialError>;
}

/// Argon2id hasher with an optional server-side pepper.
///
/// The pepper is prepended to the plaintext before hashing and must be the
/// same on verification.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    pepper: Option<String>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pepper(pepper: impl Into<String>) -> Self {
        Self {
            pepper: Some(pepper.into()),
        }
    }

    fn peppered(&self, plaintext: &str) -> String {
        match &self.pepper {
            Some(p) => format!("{p}{plaintext}"),
            None => plaintext.to_string(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<CredentialHash, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(self.peppered(plaintext).as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();
        Ok(CredentialHash::from_phc(phc))
    }

    fn verify(&self, plaintext: &str, credential: &CredentialHash) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(credential.as_phc())
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        match Argon2::default().verify_password(self.peppered(plaintext).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::Malformed(e.to_string())),
        }
    }
}

/// Random one-time password handed to a newly provisioned account holder.
pub fn generate_initial_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INITIAL_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

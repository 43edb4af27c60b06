// security/src/lib.rs
//! Credential collaborator: password digests and signed session tokens.

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::{Argon2Digest, PasswordDigest};
pub use token::{Claims, TokenIssuer};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Password hashing error: {0}")]
    Hashing(String),
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("JWT error: {0}")]
    Jwt(String),
    #[error("System time error: {0}")]
    Clock(String),
}

impl From<CredentialError> for models::ClinicalError {
    fn from(err: CredentialError) -> Self {
        models::ClinicalError::Credential(err.to_string())
    }
}

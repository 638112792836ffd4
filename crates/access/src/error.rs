use thiserror::Error;

/// Errors raised by the access control gate.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The presented credential is missing, malformed, expired or forged.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A token could not be signed.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The signing secret is too short to be used.
    #[error("Signing secret must be at least {min} bytes")]
    WeakSecret { min: usize },

    /// The token lifetime is out of bounds, or the expiry it yields cannot
    /// be represented.
    #[error("Token lifetime must be between 1 and {max_minutes} minutes")]
    InvalidTtl { max_minutes: i64 },

    /// Password hashing or hash parsing failed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

impl From<argon2::password_hash::Error> for AccessError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AccessError::PasswordHash(err.to_string())
    }
}

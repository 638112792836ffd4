//! Access control for the store backend.
//!
//! - [`TokenAuthority`] issues and validates signed, time-bounded bearer
//!   tokens from a secret injected once at startup.
//! - [`password`] hashes and verifies customer credentials.

pub mod error;
pub mod password;
pub mod token;

pub use error::AccessError;
pub use password::{hash_password, verify_password};
pub use token::{
    AuthConfig, Claims, DEFAULT_TOKEN_TTL_MINUTES, IssuedToken, MAX_TOKEN_TTL_MINUTES,
    MIN_SECRET_LEN, TokenAuthority,
};

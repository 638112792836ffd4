//! Service error types.

use access::AccessError;
use common::CustomerId;
use schema::ValidationError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in the application services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The order names a customer that does not exist.
    #[error("Customer with ID {0} not found")]
    CustomerNotFound(CustomerId),

    /// Login failed. Deliberately does not say which half was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An error occurred in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hashing or token handling failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// A blocking task (password hashing) panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Store(StoreError::Validation(err))
    }
}

impl ServiceError {
    /// True when the failure was caused by a key that does not resolve or a
    /// restricted delete, including an unknown customer on an order.
    pub fn is_referential_integrity(&self) -> bool {
        match self {
            ServiceError::CustomerNotFound(_) => true,
            ServiceError::Store(err) => err.is_referential_integrity(),
            _ => false,
        }
    }
}

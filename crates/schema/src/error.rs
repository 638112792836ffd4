use thiserror::Error;

/// Why a field failed its constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("is required")]
    Required,

    #[error("must be at most {max} characters")]
    TooLong { max: usize },

    #[error("must not be negative")]
    Negative,

    #[error("must be an absolute http(s) URL")]
    NotAUrl,
}

/// A write model violated a field constraint.
///
/// Raised before any storage operation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity}.{field} {reason}")]
pub struct ValidationError {
    pub entity: &'static str,
    pub field: &'static str,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(entity: &'static str, field: &'static str, reason: ValidationReason) -> Self {
        Self {
            entity,
            field,
            reason,
        }
    }
}

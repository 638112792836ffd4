//! Field constraint checks shared by the write models.

use crate::{ValidationError, ValidationReason};

/// Implemented by every write model; checked before storage is touched.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn required(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            entity,
            field,
            ValidationReason::Required,
        ));
    }
    bounded(entity, field, value, max)
}

pub(crate) fn bounded(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            entity,
            field,
            ValidationReason::TooLong { max },
        ));
    }
    Ok(())
}

pub(crate) fn url(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !host.contains(' ') => Ok(()),
        _ => Err(ValidationError::new(
            entity,
            field,
            ValidationReason::NotAUrl,
        )),
    }
}

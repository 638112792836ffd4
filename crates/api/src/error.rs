//! API error types with HTTP response mapping.

use access::AccessError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ordering::ServiceError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or rejected credentials.
    Unauthorized(String),
    /// Application service error.
    Service(ServiceError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Service(err) => service_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let mut response = (status, axum::Json(serde_json::json!({ "error": message })))
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    let status = match &err {
        ServiceError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ServiceError::Access(AccessError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
        ServiceError::Store(store_err) => match store_err {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::DanglingReference { .. }
            | StoreError::DeleteRestricted { .. }
            | StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Database(_) | StoreError::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
        return (status, "Internal server error".to_string());
    }
    (status, err.to_string())
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized(reason) => ApiError::Unauthorized(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{CustomerId, EntityKind, ValidationError, ValidationReason};

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let validation = ValidationError::new("Item", "name", ValidationReason::Required);
        assert_eq!(
            status_of(ServiceError::from(validation)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Store(StoreError::not_found(EntityKind::Order, 4))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Store(StoreError::DeleteRestricted {
                kind: EntityKind::Item,
                id: 1,
                dependent: EntityKind::Menu,
                count: 2,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Store(StoreError::Conflict("email".into()))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            status_of(ServiceError::CustomerNotFound(CustomerId::new(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::from(AccessError::Unauthorized("token expired".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[axum::http::header::WWW_AUTHENTICATE],
            "Bearer"
        );
    }

    #[test]
    fn hashing_failures_are_internal() {
        assert_eq!(
            status_of(AccessError::PasswordHash("bad salt".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

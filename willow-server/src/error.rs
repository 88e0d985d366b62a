//! Unified service-layer error type
//!
//! `ServiceError` bridges storage and infrastructure errors and the
//! API-layer error (`AppError`), so handlers can use `?` throughout.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::BoxError;
use crate::db::StoreError;

/// Service-layer error
///
/// - `Db`: storage/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServiceError::App(AppError::new(ErrorCode::NotFound)),
            StoreError::NotEnoughStars { .. } => {
                ServiceError::App(AppError::new(ErrorCode::NotEnoughStars))
            }
            other => ServiceError::Db(other.into()),
        }
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ErrorCode> for ServiceError {
    fn from(code: ErrorCode) -> Self {
        ServiceError::App(AppError::new(code))
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service storage error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl ServiceError {
    /// Business error code, if this is one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ServiceError::App(e) => Some(e.code),
            ServiceError::Db(_) => None,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Db(e) => write!(f, "storage error: {e}"),
            ServiceError::App(e) => write!(f, "{e}"),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_store_errors_map_to_codes() {
        let e: ServiceError = StoreError::NotEnoughStars { balance: 5, cost: 10 }.into();
        assert_eq!(e.code(), Some(ErrorCode::NotEnoughStars));

        let e: ServiceError = StoreError::Internal("boom".into()).into();
        assert_eq!(e.code(), None);
        let app: AppError = e.into();
        assert_eq!(app.code, ErrorCode::InternalError);
        assert_eq!(app.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::core::{feedback, BookingError, ReorderError};
use crate::models::ErrorResponse;
use crate::services::{BackendError, PaymentError, PostgresError};

/// Errors surfaced by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid session token")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Database(#[from] PostgresError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Reorder(#[from] ReorderError),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl ApiError {
    /// Short machine-readable code for the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Conflict(_) => "conflict",
            ApiError::Backend(BackendError::NotFound(_)) => "not_found",
            ApiError::Backend(BackendError::Unauthorized { .. }) => "backend_unauthorized",
            ApiError::Backend(BackendError::Conflict(_)) => "conflict",
            ApiError::Backend(_) => "backend_error",
            ApiError::Payment(PaymentError::InvalidAmount(_)) => "invalid_amount",
            ApiError::Payment(PaymentError::SignatureMismatch(_)) => "invalid_signature",
            ApiError::Payment(_) => "payment_error",
            ApiError::Database(_) => "database_error",
            ApiError::Booking(_) => "booking_rejected",
            ApiError::Reorder(_) => "invalid_order",
        }
    }

    /// Text safe to show an end user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend(e) => backend_message(e).to_string(),
            ApiError::Payment(PaymentError::InvalidAmount(_) | PaymentError::SignatureMismatch(_)) => self.to_string(),
            ApiError::Payment(PaymentError::RequestError(e)) => request_message(e).to_string(),
            ApiError::Payment(_) => feedback::MSG_PAYMENT.to_string(),
            ApiError::Database(_) => feedback::MSG_GENERIC.to_string(),
            other => other.to_string(),
        }
    }
}

/// The upstream status picks the text; the heuristics only ever see the
/// upstream body, never our own rendering of the request.
fn backend_message(err: &BackendError) -> &'static str {
    match err {
        BackendError::RequestError(e) => request_message(e),
        BackendError::NotFound(_) => feedback::MSG_NOT_FOUND,
        BackendError::Unauthorized { status: 401, .. } => feedback::MSG_SESSION,
        BackendError::Unauthorized { body, .. } => {
            // A 403 only means an expired session when the body says so
            if feedback::user_message(body) == feedback::MSG_SESSION {
                feedback::MSG_SESSION
            } else {
                feedback::MSG_FORBIDDEN
            }
        }
        BackendError::Conflict(_) => feedback::MSG_DUPLICATE,
        BackendError::ApiError { body, .. } => feedback::user_message(body),
        BackendError::UnfilteredWrite(..) | BackendError::InvalidResponse(_) => feedback::MSG_GENERIC,
    }
}

fn request_message(err: &reqwest::Error) -> &'static str {
    if err.is_decode() {
        feedback::MSG_GENERIC
    } else {
        feedback::MSG_CONNECTION
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Backend(e) => match e {
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Unauthorized { status: 401, .. } => StatusCode::UNAUTHORIZED,
                BackendError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::UnfilteredWrite(..) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Payment(e) => match e {
                PaymentError::InvalidAmount(_) | PaymentError::SignatureMismatch(_) => StatusCode::BAD_REQUEST,
                PaymentError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Booking(e) => match e {
                BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
                BookingError::NotPermitted { .. } => StatusCode::FORBIDDEN,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Reorder(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.user_message(),
            status_code: status.as_u16(),
        })
    }
}

/// Malformed JSON bodies get the same error shape as handler failures
pub fn json_error_handler(err: actix_web::error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::Validation(format!("Invalid JSON: {}", err)).into()
}

pub fn query_error_handler(err: actix_web::error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    ApiError::Validation(format!("Invalid query: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_get_friendly_text() {
        let err = ApiError::Backend(BackendError::Unauthorized {
            status: 401,
            body: "JWT expired".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), feedback::MSG_SESSION);

        let err = ApiError::Backend(BackendError::ApiError {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "backend_error");
    }

    #[test]
    fn test_row_level_denial_is_not_a_session_problem() {
        let err = ApiError::Backend(BackendError::Unauthorized {
            status: 403,
            body: "new row violates row-level security policy for table \"bookings\"".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), feedback::MSG_FORBIDDEN);

        let err = ApiError::Backend(BackendError::Unauthorized {
            status: 403,
            body: r#"{"message":"JWT expired"}"#.to_string(),
        });
        assert_eq!(err.user_message(), feedback::MSG_SESSION);
    }

    #[test]
    fn test_ids_in_queries_do_not_steer_the_message() {
        // 401, 403 and 409 all appear in this id
        let err = ApiError::Backend(BackendError::NotFound(
            "no row in models for id=eq.7a401c2e-4030-4409-8403-000000000409&limit=1".to_string(),
        ));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), feedback::MSG_NOT_FOUND);

        let err = ApiError::Backend(BackendError::Conflict(
            r#"{"message":"duplicate key value violates unique constraint \"favorites_pkey\""}"#.to_string(),
        ));
        assert_eq!(err.user_message(), feedback::MSG_DUPLICATE);
    }

    #[test]
    fn test_gateway_failures_get_payment_text() {
        let err = ApiError::Payment(PaymentError::GatewayError {
            status: 500,
            body: "upstream 401 from acquirer".to_string(),
        });
        assert_eq!(err.user_message(), feedback::MSG_PAYMENT);
    }

    #[test]
    fn test_booking_error_statuses() {
        use crate::models::BookingStatus;

        let err = ApiError::from(BookingError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Pending,
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(BookingError::StartsInPast).status_code(), StatusCode::BAD_REQUEST);
    }
}

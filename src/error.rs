//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a request can hit, from a rejected bearer token to a store outage,
//! ends up as one of its variants and is rendered as a JSON body of the form
//! `{"error": "<message>"}`.
//!
//! `AppError` implements `actix_web::error::ResponseError`, and provides `From`
//! implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, `bcrypt::BcryptError` and `serde_json::Error`
//! so that handlers and services can use the `?` operator freely.
//!
//! Internal failures never leak their detail to the client: the detail is logged
//! and the response body is a generic message.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Body sent with every 401 response.
pub const UNAUTHORIZED_MESSAGE: &str = "Please authenticate.";

/// Body sent with every 500 response.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// A field failed validation (HTTP 400).
    Validation(String),
    /// The request would violate a uniqueness rule, e.g. a duplicate email (HTTP 400).
    Conflict(String),
    /// The request was malformed or not allowed in its current shape (HTTP 400).
    BadRequest(String),
    /// Authentication is missing, malformed, expired or revoked (HTTP 401).
    /// Carries no detail on purpose; the response body is always the same.
    Unauthorized,
    /// An owner-scoped lookup found nothing (HTTP 404).
    NotFound(String),
    /// Store, hashing or other upstream failure (HTTP 500).
    /// The detail is logged, the client only sees a generic message.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl AppError {
    /// The message presented to the client for this error.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg) => msg,
            AppError::Unauthorized => UNAUTHORIZED_MESSAGE,
            AppError::Internal(_) => INTERNAL_MESSAGE,
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = self {
            log::error!("request failed: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.client_message()
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// A unique-constraint violation can only come from the users' email index, so it
/// is reported as the same conflict the explicit pre-check produces.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return AppError::Conflict(crate::models::user::DUPLICATE_EMAIL_MESSAGE.into());
            }
        }
        AppError::Internal(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// Field messages are joined in field-name order so the output is stable.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, err.code),
                })
            })
            .collect();

        AppError::Validation(messages.join(", "))
    }
}

/// Any JWT failure (bad signature, malformed, expired) is an authentication failure.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        log::debug!("token rejected: {}", error);
        AppError::Unauthorized
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(format!("password hashing failed: {}", error))
    }
}

/// Raised when a JSON value does not fit the expected shape, e.g. `"age": "old"`.
impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_error_responses() {
        let error = AppError::Unauthorized;
        assert_eq!(error.error_response().status(), 401);

        let error = AppError::Validation("name: required".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::Conflict("duplicate".into());
        assert_eq!(error.error_response().status(), 400);

        let error = AppError::NotFound("Task Not Found!".into());
        assert_eq!(error.error_response().status(), 404);

        let error = AppError::Internal("connection reset".into());
        assert_eq!(error.error_response().status(), 500);
    }

    #[actix_rt::test]
    async fn test_internal_detail_is_not_leaked() {
        let error = AppError::Internal("password authentication failed for user app".into());
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], INTERNAL_MESSAGE);
    }

    #[actix_rt::test]
    async fn test_unauthorized_body_is_generic() {
        let body = to_bytes(AppError::Unauthorized.error_response().into_body())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], UNAUTHORIZED_MESSAGE);
    }

    #[test]
    fn test_validation_errors_are_joined_in_field_order() {
        let mut errors = ValidationErrors::new();
        let mut password = validator::ValidationError::new("length");
        password.message = Some("too short".into());
        errors.add("password", password);
        errors.add("email", validator::ValidationError::new("email"));

        match AppError::from(errors) {
            AppError::Validation(msg) => assert_eq!(msg, "email: email, password: too short"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

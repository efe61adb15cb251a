use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthErrorKind, ProviderError};
use crate::logging::SecurityEvent;
use crate::media::LookupError;
use crate::validation::form::FormErrors;

/// Centralized application error type that encompasses all error variants
/// across different modules and provides consistent error responses.
#[derive(Debug, Error)]
pub enum AppError {
    // Form validation
    #[error("the form contains invalid fields")]
    InvalidForm(FormErrors),

    #[error("invalid request: {0}")]
    BadRequest(String),

    // Auth provider and sessions
    #[error("{}", .0.user_message())]
    Auth(#[source] ProviderError),

    #[error("authorization header is missing")]
    MissingAuthHeader,

    #[error("authorization header is malformed")]
    InvalidAuthHeader,

    #[error("session is unknown or has ended")]
    InvalidSession,

    #[error("session not found in request context")]
    MissingSession,

    // Media lookups
    #[error("not found")]
    NotFound,

    #[error("media service error")]
    Lookup(#[source] LookupError),

    // Rate limiting
    #[error("rate limit exceeded; please try again later")]
    RateLimitExceeded { retry_after: Option<Duration> },

    // Request parsing errors
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("unsupported media type: expected application/json")]
    UnsupportedMediaType,

    #[error("request body too large")]
    PayloadTooLarge,
}

/// Standard JSON error response structure
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FormErrors>,
}

impl AppError {
    /// Determines the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client errors
            AppError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::MissingAuthHeader => StatusCode::UNAUTHORIZED,
            AppError::InvalidAuthHeader => StatusCode::UNAUTHORIZED,
            AppError::InvalidSession => StatusCode::UNAUTHORIZED,
            AppError::Auth(err) => match err {
                ProviderError::Rejected { .. } => match err.kind() {
                    AuthErrorKind::EmailAlreadyInUse => StatusCode::CONFLICT,
                    _ => StatusCode::UNAUTHORIZED,
                },
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 5xx Server errors
            AppError::Lookup(_) => StatusCode::BAD_GATEWAY,
            AppError::MissingSession => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Determines if error details should be exposed to the client
    /// In production (release builds), we hide internal error details
    fn should_expose_details(&self) -> bool {
        cfg!(debug_assertions) || self.status_code().is_client_error()
    }

    /// Gets the user-facing error message
    fn user_message(&self) -> String {
        if self.should_expose_details() {
            return self.to_string();
        }

        match self {
            AppError::Lookup(_) => "media service unavailable".to_string(),
            AppError::MissingSession => "authentication error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Source error text, only included in debug builds
    fn error_details(&self) -> Option<String> {
        if !cfg!(debug_assertions) {
            return None;
        }

        match self {
            AppError::Auth(err) => Some(format!("auth provider: {err}")),
            AppError::Lookup(err) => Some(format!("media service: {err}")),
            _ => None,
        }
    }

    /// Logs the error with appropriate context
    fn log_error(&self) {
        match self.status_code() {
            code if code.is_client_error() => match self {
                // Form failures are rendered inline and never logged.
                AppError::InvalidForm(_) => {}
                AppError::InvalidSession
                | AppError::InvalidAuthHeader
                | AppError::MissingAuthHeader => {
                    crate::log_security_event!(
                        SecurityEvent::SessionRejected,
                        error = %self,
                        status_code = %code,
                        "Request without a valid session"
                    );
                }
                _ => {
                    tracing::warn!(
                        error = %self,
                        status_code = %code,
                        "Client error"
                    );
                }
            },
            code if code.is_server_error() => match self {
                AppError::Auth(err) => {
                    crate::log_security_event!(
                        SecurityEvent::ProviderUnavailable,
                        error = %err,
                        status_code = %code,
                        "Auth provider unavailable"
                    );
                }
                _ => {
                    tracing::error!(
                        error = %self,
                        status_code = %code,
                        source = ?self.source().map(|source| source.to_string()),
                        "Server error"
                    );
                }
            },
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before converting to response
        self.log_error();

        let status = self.status_code();
        let user_message = self.user_message();
        let details = self.error_details();

        let retry_after = match &self {
            AppError::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        };

        let fields = match self {
            AppError::InvalidForm(errors) => Some(errors),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: user_message,
            details,
            fields,
        });

        let mut response = (status, body).into_response();
        if let Some(retry_after) = retry_after
            && let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string())
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        AppError::Auth(error)
    }
}

impl From<LookupError> for AppError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::NotFound => AppError::NotFound,
            LookupError::UnknownCategory(category) => {
                AppError::BadRequest(format!("unknown category '{category}'"))
            }
            other => AppError::Lookup(other),
        }
    }
}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        AppError::InvalidForm(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{EMAIL_IN_USE_MESSAGE, GENERIC_MESSAGE, WRONG_PASSWORD_MESSAGE};

    #[test]
    fn test_not_found_error_status() {
        let error = AppError::from(LookupError::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.user_message(), "not found");
    }

    #[test]
    fn test_rate_limit_error_status() {
        let error = AppError::RateLimitExceeded { retry_after: None };
        assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_provider_rejections_carry_french_message() {
        let error = AppError::from(ProviderError::rejected("auth/wrong-password"));
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.user_message(), WRONG_PASSWORD_MESSAGE);

        let error = AppError::from(ProviderError::rejected("EMAIL_EXISTS"));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.user_message(), EMAIL_IN_USE_MESSAGE);
    }

    #[test]
    fn test_unreachable_provider_is_bad_gateway_with_generic_message() {
        let error = AppError::from(ProviderError::Transport("timeout".to_string()));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(error.to_string(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_failing_provider_is_bad_gateway_not_unauthorized() {
        let error = AppError::from(ProviderError::Unavailable(503));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(error.to_string(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_unknown_category_is_client_error() {
        let error = AppError::from(LookupError::UnknownCategory("music".to_string()));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(error.user_message().contains("music"));
    }

    #[test]
    fn test_rate_limit_response_sets_retry_after() {
        let response = AppError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(42)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).map(|v| v.as_bytes()),
            Some("42".as_bytes())
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_internal_errors_exposed_in_debug() {
        let error = AppError::Lookup(LookupError::Status(500));
        assert!(error.should_expose_details());
        assert!(error.error_details().is_some());
    }
}

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_valid::{ValidRejection, ValidationRejection};
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

/// Why an authentication attempt or session lookup was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is not active")]
    AccountInactive,
    #[error("Session is missing or expired")]
    SessionInvalid,
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::SessionInvalid => "SESSION_INVALID",
        }
    }
}

/// Error types returned by portal services and rendered by the HTTP layer
#[derive(Error, Debug)]
pub enum PortalError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Unknown id or username
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username, or a transition the current state does not allow
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// Bad credentials or session
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PortalError::NotFound(message.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        PortalError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortalError::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict { .. } => StatusCode::CONFLICT,
            PortalError::Auth(_) => StatusCode::UNAUTHORIZED,
            PortalError::Database(_) | PortalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "VALIDATION_ERROR",
            PortalError::NotFound(_) => "NOT_FOUND",
            PortalError::Conflict { code, .. } => code,
            PortalError::Auth(auth) => auth.code(),
            PortalError::Database(_) => "DATABASE_ERROR",
            PortalError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for PortalError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort_unstable();
        PortalError::Validation(format!("Invalid or missing fields: {}", fields.join(", ")))
    }
}

impl From<JsonRejection> for PortalError {
    fn from(rejection: JsonRejection) -> Self {
        PortalError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for PortalError {
    fn from(rejection: QueryRejection) -> Self {
        PortalError::Validation(rejection.body_text())
    }
}

impl From<ValidRejection<PortalError>> for PortalError {
    fn from(rejection: ValidRejection<PortalError>) -> Self {
        match rejection {
            ValidationRejection::Valid(errors) => errors.into(),
            ValidationRejection::Inner(error) => error,
        }
    }
}

impl From<tokio::task::JoinError> for PortalError {
    fn from(error: tokio::task::JoinError) -> Self {
        PortalError::Internal(format!("Background task failed: {}", error))
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged in full; callers only get a generic message.
        let message = if status.is_server_error() {
            error!(error = %self, code = self.code(), "Request failed");
            "Internal server error".to_string()
        } else {
            warn!(error = %self, code = self.code(), "Request rejected");
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: self.code().to_string(),
            success: false,
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for Result with PortalError
pub type Result<T> = std::result::Result<T, PortalError>;

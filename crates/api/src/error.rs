//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; every failure is rendered as the
//! standard `{status: false, message}` envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use emporium_core::CartError;

use crate::db::RepositoryError;
use crate::response::ApiResponse;
use crate::services::auth::AuthError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Registration, login, or token verification failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Malformed ID, missing field, or out-of-range value.
    #[error("{0}")]
    InvalidArgument(String),

    /// Authenticated caller does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (or soft-deleted).
    #[error("{0}")]
    NotFound(String),

    /// The request is valid but the resource is in the wrong state for it.
    #[error("{0}")]
    InvalidState(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::InvalidPhone(_)
                | AuthError::MissingField(_)
                | AuthError::WeakPassword(_)
                | AuthError::UserAlreadyExists(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenEncoding => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::InvalidArgument(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Client-facing message. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(e) => format!("Invalid email: {e}"),
                AuthError::InvalidPhone(e) => format!("Invalid phone number: {e}"),
                AuthError::MissingField(field) => format!("{field} is required!"),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::UserAlreadyExists(field) => format!("{field} already exists!"),
                AuthError::InvalidCredentials => "Invalid email or password!".to_string(),
                AuthError::MissingToken => "No token provided!".to_string(),
                AuthError::InvalidToken => "Invalid token!".to_string(),
                AuthError::TokenExpired => "Token has expired!".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenEncoding => {
                    "Internal server error".to_string()
                }
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        ApiResponse::<()>::failure(status, self.public_message()).into_response()
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound(_) => Self::NotFound("Item not found in cart!".to_string()),
            CartError::EmptyCart => {
                Self::InvalidState("Cart is empty! Add items before placing an order.".to_string())
            }
            CartError::QuantityOverflow { max } => {
                Self::InvalidArgument(format!("Quantity cannot exceed {max}!"))
            }
            CartError::PriceOverflow => {
                Self::InvalidArgument("Cart total is too large!".to_string())
            }
            CartError::Inconsistent(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so errors are associated with the caller.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

//! Authentication error types.

use thiserror::Error;

use emporium_core::{EmailError, PhoneError};

use crate::db::RepositoryError;

/// Errors that can occur during registration, login, or token checks.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid phone number format.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// A required registration or login field was absent or blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Password does not meet the strength rules.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Email or phone already registered. Carries the display name of the field.
    #[error("user already exists ({0})")]
    UserAlreadyExists(&'static str),

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No bearer token on the request.
    #[error("no token provided")]
    MissingToken,

    /// Token is malformed or its signature does not match.
    #[error("invalid token")]
    InvalidToken,

    /// Token signature is valid but the expiry has passed.
    #[error("token expired")]
    TokenExpired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be produced.
    #[error("token encoding error")]
    TokenEncoding,
}

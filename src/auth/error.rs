//! Authentication Errors
//! Mission: One error type per request, mapped to HTTP exactly once

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{jwt::TokenError, user_store::StoreError};

/// Coarse classification every [`AuthError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input
    Validation,
    /// Bad credentials, invalid or expired token
    Authentication,
    /// Missing token or role mismatch
    Authorization,
    /// Duplicate email
    Conflict,
    /// Unexpected store or crypto failure
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors returned by auth endpoints and middleware
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Malformed request body")]
    MalformedBody,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No refresh token provided")]
    MissingToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("No token provided")]
    NoToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingField(_)
            | AuthError::MissingCredentials
            | AuthError::MalformedBody => ErrorKind::Validation,
            AuthError::DuplicateEmail => ErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidToken => ErrorKind::Authentication,
            AuthError::MissingToken | AuthError::NoToken | AuthError::Forbidden => {
                ErrorKind::Authorization
            }
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Internal(err)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => AuthError::DuplicateEmail,
            other => AuthError::Internal(other.into()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::InvalidToken
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Display of Internal is the generic message; the cause only goes to the log.
        if let AuthError::Internal(cause) = &self {
            error!("Internal auth failure: {:#}", cause);
        }

        let status = self.status_code();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

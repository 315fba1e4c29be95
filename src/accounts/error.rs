//! Error taxonomy for the account orchestrators.
//!
//! Errors are surfaced to the caller with their mapped status code; nothing
//! is retried inside the orchestrators. Collaborator errors carry only the
//! message the collaborator itself returned.

use axum::http::StatusCode;
use thiserror::Error;

use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Malformed/expired token or a bad request body.
    #[error("{0}")]
    Validation(String),
    /// Grace-period lockout, bad credentials, or re-auth failure.
    #[error("{0}")]
    Authorization(String),
    /// No matching account.
    #[error("{0}")]
    NotFound(String),
    /// Store or mail collaborator failure.
    #[error("{0}")]
    Collaborator(String),
}

impl AccountError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        match err {
            // One message for both failure kinds so the response does not act
            // as an oracle for token structure or expiry.
            TokenError::Malformed | TokenError::Expired => {
                Self::Validation("invalid or expired token".to_string())
            }
            TokenError::InvalidKey => Self::Collaborator("token key misconfigured".to_string()),
        }
    }
}

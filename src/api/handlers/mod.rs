//! Route handlers for the account API.

pub mod confirm;
pub mod health;
pub mod login;
pub mod me;
pub mod password;
pub mod register;
pub mod root;
pub mod session;
pub mod types;

use axum::http::StatusCode;
use tracing::{debug, error};

use crate::accounts::error::AccountError;

/// Map a domain error to its `(status, message)` pair.
///
/// Collaborator failures are logged at error level; everything else is a
/// client outcome and only logged for debugging.
pub fn error_response(err: &AccountError) -> (StatusCode, String) {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("collaborator failure: {err}");
    } else {
        debug!(status = %status, "request rejected: {err}");
    }
    (status, err.to_string())
}

/// Service over in-memory collaborators for handler tests.
#[cfg(test)]
pub(super) fn test_service(
) -> axum::Extension<std::sync::Arc<crate::accounts::service::AccountService>> {
    use std::sync::Arc;

    use crate::accounts::config::AccountConfig;
    use crate::accounts::service::AccountService;
    use crate::email::LogEmailSender;
    use crate::store::memory::{MemoryAccountStore, MemoryCredentialStore, MemoryGrantStore};

    axum::Extension(Arc::new(AccountService::new(
        Arc::new(MemoryAccountStore::new()),
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(MemoryGrantStore::new()),
        Arc::new(LogEmailSender),
        AccountConfig::new(),
    )))
}

#[cfg(test)]
pub(super) fn test_sessions() -> axum::Extension<std::sync::Arc<session::SessionStore>> {
    axum::Extension(std::sync::Arc::new(session::SessionStore::new(
        std::time::Duration::from_secs(60),
        false,
    )))
}

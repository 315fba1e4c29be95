use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use crate::accounts::service::AccountService;

use super::{error_response, password::resolve_session, session::SessionStore, types::RoleResponse};

#[utoipa::path(
    get,
    path = "/v1/accounts/me",
    responses(
        (status = 200, description = "Current account", body = crate::access::AccountView),
        (status = 204, description = "No active session")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, sessions, headers))]
pub async fn me(
    headers: HeaderMap,
    service: Extension<Arc<AccountService>>,
    sessions: Extension<Arc<SessionStore>>,
) -> impl IntoResponse {
    // A missing or stale session is "no content", not an error.
    let Some(account_id) = resolve_session(&headers, &sessions).await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match service.account_view(account_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/accounts/me/roles/{role}",
    params(
        ("role" = String, Path, description = "Role name to test membership for")
    ),
    responses(
        (status = 200, description = "Membership result", body = RoleResponse)
    ),
    tag = "accounts"
)]
#[instrument(skip(service, sessions, headers))]
pub async fn me_in_role(
    headers: HeaderMap,
    Path(role): Path<String>,
    service: Extension<Arc<AccountService>>,
    sessions: Extension<Arc<SessionStore>>,
) -> impl IntoResponse {
    // Without a session the answer is simply "not a member".
    let Some(account_id) = resolve_session(&headers, &sessions).await else {
        return (
            StatusCode::OK,
            Json(RoleResponse {
                role,
                member: false,
            }),
        )
            .into_response();
    };

    match service.is_in_role(account_id, &role).await {
        Ok(member) => (StatusCode::OK, Json(RoleResponse { role, member })).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

use crate::accounts::service::AccountService;

use super::{
    error_response,
    session::{SessionStore, extract_session_token},
    types::{ChangePasswordRequest, ForgotPasswordRequest, ResetPasswordRequest},
};

#[utoipa::path(
    post,
    path = "/v1/accounts/reset-password-request",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset token sent"),
        (status = 400, description = "Password reset is not enabled"),
        (status = 404, description = "Unknown email"),
        (status = 500, description = "Store or notification failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn reset_password_request(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.reset_password_request(&request.email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/accounts/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password reset"),
        (status = 400, description = "Invalid or expired token"),
        (status = 404, description = "Token subject no longer exists"),
        (status = 500, description = "Store failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn reset_password(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.reset_password(&request.token, &request.password).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/accounts/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 403, description = "No active session or re-authentication failed"),
        (status = 500, description = "Store failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, sessions, headers, payload))]
pub async fn change_password(
    headers: HeaderMap,
    service: Extension<Arc<AccountService>>,
    sessions: Extension<Arc<SessionStore>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let account_id = match resolve_session(&headers, &sessions).await {
        Some(id) => id,
        None => {
            return (StatusCode::FORBIDDEN, "No active session".to_string()).into_response();
        }
    };

    match service
        .change_password(account_id, &request.old_password, &request.new_password)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

pub(super) async fn resolve_session(
    headers: &HeaderMap,
    sessions: &SessionStore,
) -> Option<uuid::Uuid> {
    let token = extract_session_token(headers)?;
    sessions.resolve(&token).await
}

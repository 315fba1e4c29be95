use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::accounts::service::AccountService;

use super::{
    error_response,
    session::{SessionStore, clear_session_cookie, extract_session_token, session_cookie},
    types::LoginRequest,
};

#[utoipa::path(
    post,
    path = "/v1/accounts/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::access::AccountView),
        (status = 403, description = "Invalid credentials or unconfirmed past grace period"),
        (status = 404, description = "Unknown email"),
        (status = 500, description = "Store failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, sessions, payload))]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    sessions: Extension<Arc<SessionStore>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let view = match service.login(&request.email, &request.password).await {
        Ok(view) => view,
        Err(err) => return error_response(&err).into_response(),
    };

    // The session only exists once the gate has passed.
    let token = sessions.create(view.id).await;
    let mut headers = HeaderMap::new();
    match session_cookie(&token, sessions.ttl_seconds(), sessions.cookie_secure()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to establish session".to_string(),
            )
                .into_response();
        }
    }

    (StatusCode::OK, headers, Json(view)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/accounts/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "accounts"
)]
pub async fn logout(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionStore>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        sessions.revoke(&token).await;
    }

    // Always clear the cookie, even without a live session.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(sessions.cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

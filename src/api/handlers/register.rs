use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::accounts::service::{AccountService, Registration};

use super::{error_response, types::RegisterRequest};

#[utoipa::path(
    post,
    path = "/v1/accounts/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::access::AccountView),
        (status = 400, description = "Invalid input or email already registered"),
        (status = 500, description = "Store or notification failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let registration = Registration {
        email: request.email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
    };

    match service.register(registration).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

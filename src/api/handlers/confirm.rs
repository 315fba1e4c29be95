use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::accounts::service::AccountService;

use super::{
    error_response,
    types::{ConfirmEmailRequest, ResendConfirmationRequest},
};

#[utoipa::path(
    post,
    path = "/v1/accounts/confirm-email-request",
    request_body = ResendConfirmationRequest,
    responses(
        (status = 204, description = "Confirmation token sent"),
        (status = 400, description = "Confirmation disabled or account already confirmed"),
        (status = 404, description = "Unknown email"),
        (status = 500, description = "Store or notification failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn confirm_email_request(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ResendConfirmationRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.confirm_email_request(&request.email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/accounts/confirm-email",
    request_body = ConfirmEmailRequest,
    responses(
        (status = 204, description = "Account confirmed"),
        (status = 400, description = "Invalid or expired token"),
        (status = 404, description = "Token subject no longer exists"),
        (status = 500, description = "Store failure")
    ),
    tag = "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn confirm_email(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ConfirmEmailRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.confirm_email(&request.token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_service;
    use super::*;

    #[tokio::test]
    async fn confirm_request_missing_payload_is_a_bad_request() {
        let response = confirm_email_request(test_service(), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn confirm_missing_payload_is_a_bad_request() {
        let response = confirm_email(test_service(), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

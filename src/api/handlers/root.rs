use axum::{http::StatusCode, response::IntoResponse};

/// Undocumented landing route; useful as a liveness probe behind proxies.
pub async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
    )
}

use axum::{Json, http::StatusCode};

use crate::models::ErrorBody;

pub mod auth;
pub mod blogs;
pub mod profile;
pub mod site_settings;
pub mod users;

/// health
///
/// Liveness probe. Answers "ok" as long as the process serves requests.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// Router fallback. Runs after the gateway, so anonymous requests to unknown
/// non-public paths are redirected to the login page before they get here.
pub async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}

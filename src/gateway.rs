use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::session_claims,
    error::ApiError,
    policy::{self, Decision},
};

/// gateway
///
/// Middleware wrapped around the whole router, unmatched paths included. It
/// resolves the token (if any), asks [`policy::decide`] about the request path
/// and either forwards the request, or answers with a temporary redirect.
///
/// The gateway only knows about pages: admin API handlers still check the role
/// themselves through the `AdminUser` extractor.
pub async fn gateway(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let claims = session_claims(request.headers(), &state.tokens);

    let decision = policy::decide(claims.as_ref(), &path);
    match decision {
        Decision::Allow => next.run(request).await,
        Decision::RejectUnauthorized => ApiError::Unauthorized.into_response(),
        Decision::RedirectToLogin { .. } | Decision::RedirectToDashboard => {
            let Some(location) = decision.location() else {
                return ApiError::Unauthorized.into_response();
            };
            tracing::debug!(%path, %location, "gateway redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}

use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user, whatever the role. The router is wrapped in
/// `auth_middleware` by `create_router`, and the handlers additionally take
/// the `AuthUser` extractor to learn who is calling.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PATCH /api/profile
        // The caller's own account and profile. The user id always comes from
        // the token, never from the request body.
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
}

use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart boundaries and part headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Admin Router Module
///
/// Nested under `/api/admin`. The gateway lets these paths through for any
/// signed-in user (they are API paths, not `/admin` pages), so every handler
/// here takes the `AdminUser` extractor and answers 401 to non-admins on its own.
///
/// The one exception is `GET /site-settings`, which public pages read without
/// a session.
pub fn admin_routes(max_logo_bytes: usize) -> Router<AppState> {
    Router::new()
        // --- Users ---
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // DELETE refuses the last admin and any user who still authors posts.
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // --- Posts ---
        .route(
            "/blogs",
            get(handlers::blogs::list_posts).post(handlers::blogs::create_post),
        )
        .route(
            "/blogs/{id}",
            get(handlers::blogs::get_post)
                .patch(handlers::blogs::update_post)
                .delete(handlers::blogs::delete_post),
        )
        // --- Site settings ---
        .route(
            "/site-settings",
            get(handlers::site_settings::get_site_settings)
                .put(handlers::site_settings::update_site_settings),
        )
        // POST /upload
        // Multipart logo upload. The body limit is raised from axum's 2 MB
        // default to the configured image size.
        .route(
            "/upload",
            post(handlers::site_settings::upload_logo)
                .layer(DefaultBodyLimit::max(max_logo_bytes + MULTIPART_OVERHEAD)),
        )
}

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Every path here is also public in
/// the gateway policy, so anonymous callers are never redirected away from them.
///
/// Security Mandate:
/// The blog handlers only ever read through the repository's published-only
/// queries; drafts never leave the admin API.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers and container orchestration.
        .route("/health", get(handlers::health))
        // --- Authentication ---
        // POST /api/auth/register
        // Self-service sign-up; always creates a USER.
        .route("/api/auth/register", post(handlers::auth::register))
        // POST /api/auth/login
        // Issues the session token (body + `session_token` cookie).
        .route("/api/auth/login", post(handlers::auth::login))
        // GET /api/auth/session
        // Token introspection. Returns `{"user": null}` instead of failing.
        .route("/api/auth/session", get(handlers::auth::session))
        // --- Public blog ---
        .route("/api/blogs", get(handlers::blogs::list_published))
        .route("/api/blogs/{slug}", get(handlers::blogs::get_published))
        // GET /api/logo-image
        // Branding image for public pages, served with a one-hour cache header.
        .route("/api/logo-image", get(handlers::site_settings::logo_image))
}

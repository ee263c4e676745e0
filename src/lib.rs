use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod password;
pub mod policy;
pub mod repository;
pub mod slug;

// Routing split by access level (public, authenticated, admin).
pub mod routes;
use auth::{AuthUser, TokenIssuer};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register, handlers::auth::login, handlers::auth::session,
        handlers::blogs::list_published, handlers::blogs::get_published,
        handlers::blogs::list_posts, handlers::blogs::create_post, handlers::blogs::get_post,
        handlers::blogs::update_post, handlers::blogs::delete_post,
        handlers::users::list_users, handlers::users::create_user, handlers::users::get_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::profile::get_profile, handlers::profile::update_profile,
        handlers::site_settings::get_site_settings, handlers::site_settings::update_site_settings,
        handlers::site_settings::upload_logo, handlers::site_settings::logo_image,
    ),
    components(
        schemas(
            models::Role, models::User, models::Profile, models::Post,
            models::UserWithProfile, models::UserListItem, models::UserDetail, models::PostSummary,
            models::AuthorSummary, models::PostWithAuthor, models::PublicAuthor, models::PublicPost,
            models::SiteSettings, models::LoginResponse, models::SessionUser, models::SessionResponse,
            models::SuccessResponse, models::ErrorBody,
            models::RegisterRequest, models::LoginRequest, models::CreateUserRequest,
            models::UpdateUserRequest, models::UpdateProfileRequest, models::CreatePostRequest,
            models::UpdatePostRequest, models::UpdateSiteSettingsRequest,
            handlers::site_settings::LogoUploadForm,
        )
    ),
    tags(
        (name = "inkwell-cms", description = "Blog CMS API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services, cloned into every
/// request. Handlers pull only the pieces they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres or in-memory).
    pub repo: RepositoryState,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Token signer/validator, built once from `config.jwt_secret`.
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        Self {
            repo,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`: the `AuthUser` extractor rejects with 401
/// before the handler runs when no valid token is present.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, the gateway, and the observability layers,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest("/api/admin", admin::admin_routes(state.config.max_logo_bytes))
        .fallback(handlers::not_found)
        // The gateway wraps the fallback too, so unknown paths are policed like known ones.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gateway::gateway,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id`, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

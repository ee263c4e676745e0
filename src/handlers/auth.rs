use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::{self, session_claims, session_cookie},
    error::ApiError,
    models::{
        ErrorBody, LoginRequest, LoginResponse, NewUser, RegisterRequest, Role, SessionResponse,
        SessionUser, User,
    },
    password,
};

/// register
///
/// [Public Route] Self-service sign-up. The account always gets the USER role
/// and an empty profile.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Missing email or password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    if state.repo.find_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            password_hash,
            role: Role::User,
            bio: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Exchanges credentials for a session token. The token is
/// returned in the body and also set as the `session_token` cookie so that
/// page navigation carries it.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let (token, user) = auth::issue(
        state.repo.as_ref(),
        &state.tokens,
        state.config.bcrypt_cost,
        &payload.email,
        &payload.password,
    )
    .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, Json(LoginResponse { token, user })))
}

/// session
///
/// [Public Route] Reports who the presented token belongs to. Never fails:
/// an absent or invalid token yields `{"user": null}`.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    let user = session_claims(&headers, &state.tokens).map(|claims| SessionUser {
        id: claims.sub,
        role: claims.role,
    });
    Json(SessionResponse { user })
}

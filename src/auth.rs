use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, User},
    password,
    policy::{self, Decision},
    repository::Repository,
};

/// Name of the cookie that carries the session token for browser navigation.
pub const SESSION_COOKIE: &str = "session_token";

/// Claims
///
/// Payload of a session token. The token is the only session state: nothing is
/// persisted server-side, so identity and role travel inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// The role at the time the token was issued.
    pub role: Role,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp). Validation always enforces it.
    pub exp: usize,
}

/// TokenIssuer
///
/// Signs and validates HS256 session tokens with the process-wide secret.
/// Built once from `AppConfig` at startup and shared read-only through `AppState`.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    /// Signs a token for `user_id` carrying `role`.
    pub fn sign(&self, user_id: Uuid, role: Role) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            role,
            iat: now,
            exp: now.saturating_add(usize::try_from(self.ttl_secs).unwrap_or(usize::MAX)),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to sign session token: {}", e);
            ApiError::Internal
        })
    }

    /// Validates signature and expiry.
    ///
    /// Fails open to `None`: a malformed, forged or expired token is treated
    /// exactly like no token at all, and never surfaces as an error.
    pub fn validate(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("rejected session token: {:?}", e.kind());
                None
            }
        }
    }
}

/// Pulls the raw token from `Authorization: Bearer ...`, falling back to the
/// session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

/// Token lookup plus validation in one step: `None` for absent or invalid tokens.
pub fn session_claims(headers: &HeaderMap, tokens: &TokenIssuer) -> Option<Claims> {
    token_from_headers(headers).and_then(|token| tokens.validate(&token))
}

/// Builds the `session_token` cookie set by a successful login.
/// The cookie lives for the browser session; the token inside still expires on its own.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// issue
///
/// The login flow: look the user up by email, verify the password against the
/// stored hash, and sign a token. Unknown email and wrong password are
/// indistinguishable to the caller, in the response and in its timing: an
/// unknown email still pays one bcrypt round at `bcrypt_cost`.
pub async fn issue(
    repo: &dyn Repository,
    tokens: &TokenIssuer,
    bcrypt_cost: u32,
    email: &str,
    password: &str,
) -> Result<(String, User), ApiError> {
    let Some(record) = repo.find_user_by_email(email).await? else {
        let _ = password::hash_password(password.to_string(), bcrypt_cost).await;
        tracing::warn!("Failed login attempt for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(password.to_string(), record.password.clone()).await {
        tracing::warn!(user_id = %record.id, "Failed login attempt");
        return Err(ApiError::InvalidCredentials);
    }

    let token = tokens.sign(record.id, record.role)?;
    Ok((token, User::from(record)))
}

/// AuthUser
///
/// The resolved identity of an authenticated request, re-derived from the
/// token by every handler that takes it. Rejects with 401 when the token is
/// missing or invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenIssuer::from_ref(state);

        session_claims(&parts.headers, &tokens)
            .map(AuthUser::from)
            .ok_or(ApiError::Unauthorized)
    }
}

/// AdminUser
///
/// Handler-level admin check. Every admin API handler takes this extractor, so
/// the role is re-validated independently of the gateway and a non-admin gets
/// a 401 `{"error": "Unauthorized"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenIssuer::from_ref(state);
        let claims = session_claims(&parts.headers, &tokens);

        match (policy::require_admin(claims.as_ref()), claims) {
            (Decision::Allow, Some(claims)) => Ok(AdminUser(claims.into())),
            (_, claims) => {
                if let Some(c) = claims {
                    tracing::warn!(user_id = %c.sub, path = %parts.uri.path(), "non-admin token on admin API");
                }
                Err(ApiError::Unauthorized)
            }
        }
    }
}

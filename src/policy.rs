//! Authorization policy.
//!
//! A pure decision function over `(token, path)`: no I/O, no state. The
//! gateway consults [`decide`] once per inbound request; admin API handlers
//! consult [`require_admin`] again through the `AdminUser` extractor, because
//! the gateway only guards page-level access and never rejects API calls by role.

use url::form_urlencoded;

use crate::auth::Claims;
use crate::models::Role;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Pages anyone may open.
const PUBLIC_PAGES: &[&str] = &["/", "/login", "/register", "/blogs"];

/// Prefixes reachable without a session: public blog pages, the auth API and
/// the public blog API.
const PUBLIC_PREFIXES: &[&str] = &["/blogs/", "/api/auth", "/api/blogs"];

/// Paths outside the page/API model that must never bounce to the login page:
/// branding read by public pages, liveness, and API docs. Matching is by path
/// only, so `PUT /api/admin/site-settings` still meets the handler's admin check.
const INFRASTRUCTURE_PATHS: &[&str] = &["/api/logo-image", "/api/admin/site-settings", "/health"];
const INFRASTRUCTURE_PREFIXES: &[&str] = &["/swagger-ui", "/api-docs"];

/// Decision
///
/// Outcome of evaluating a request against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Unauthenticated: go to the login page, then come back to `callback`.
    RedirectToLogin { callback: String },
    /// Authenticated but not allowed into the admin area.
    RedirectToDashboard,
    RejectUnauthorized,
}

impl Decision {
    /// Redirect target for the two redirecting outcomes.
    pub fn location(&self) -> Option<String> {
        match self {
            Decision::RedirectToLogin { callback } => Some(login_url(callback)),
            Decision::RedirectToDashboard => Some(DASHBOARD_PATH.to_string()),
            Decision::Allow | Decision::RejectUnauthorized => None,
        }
    }
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_PAGES.contains(&path)
        || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || INFRASTRUCTURE_PATHS.contains(&path)
        || INFRASTRUCTURE_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// Gateway rules, evaluated in order:
/// 1. public path: allow, token or not;
/// 2. no token: redirect to login, remembering `path`;
/// 3. `/admin*` page with a non-admin token: redirect to the dashboard;
/// 4. otherwise allow.
pub fn decide(claims: Option<&Claims>, path: &str) -> Decision {
    if is_public(path) {
        return Decision::Allow;
    }

    let Some(claims) = claims else {
        return Decision::RedirectToLogin {
            callback: path.to_string(),
        };
    };

    if path.starts_with("/admin") && claims.role != Role::Admin {
        return Decision::RedirectToDashboard;
    }

    Decision::Allow
}

/// Handler-level rule for admin API routes: an ADMIN token or a 401.
pub fn require_admin(claims: Option<&Claims>) -> Decision {
    match claims {
        Some(c) if c.role == Role::Admin => Decision::Allow,
        _ => Decision::RejectUnauthorized,
    }
}

pub fn login_url(callback: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("callbackUrl", callback)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

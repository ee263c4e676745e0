/// Router Module Index
///
/// Routing split by access level. Access is enforced in two places: the
/// gateway middleware for every request, and the extractors taken by each
/// handler (`AuthUser`, `AdminUser`).

/// Routes open to everyone: auth, the published blog, branding, liveness.
pub mod public;

/// Routes for any signed-in user, wrapped in the `AuthUser` middleware.
pub mod authenticated;

/// Routes under `/api/admin`, role-checked in every handler.
pub mod admin;

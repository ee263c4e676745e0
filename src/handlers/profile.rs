use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{ErrorBody, ProfileChanges, UpdateProfileRequest, UserWithProfile},
    repository::RepoError,
};

/// get_profile
///
/// [Authenticated Route] The current user and their profile. The identity
/// comes from the token only; a token whose user has since been deleted is
/// treated as unauthenticated.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Current user", body = UserWithProfile),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn get_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserWithProfile>, ApiError> {
    match state.repo.get_user(id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            tracing::warn!(user_id = %id, "valid token for a deleted user");
            Err(ApiError::Unauthorized)
        }
    }
}

/// update_profile
///
/// [Authenticated Route] Partial self-service update of the name and profile
/// fields. Creates the profile row on first use. Role and email are not
/// editable here.
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserWithProfile),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserWithProfile>, ApiError> {
    let updated = state
        .repo
        .update_profile(id, ProfileChanges::from(payload))
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::Unauthorized,
            other => ApiError::from(other),
        })?;

    Ok(Json(updated))
}

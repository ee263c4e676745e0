use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AdminUser,
    error::ApiError,
    models::{
        CreateUserRequest, ErrorBody, NewUser, Role, SuccessResponse, UpdateUserRequest, User,
        UserChanges, UserDetail, UserListItem, UserWithProfile,
    },
    password,
    repository::RepoError,
};

/// list_users
///
/// [Admin Route] Every user, newest first, with profile and post count.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserListItem]),
        (status = 401, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserListItem>>, ApiError> {
    Ok(Json(state.repo.list_users().await?))
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role (USER by default).
/// The profile row is created alongside it with an empty bio.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing email or password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
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
            role: payload.role.unwrap_or(Role::User),
            bio: Some(String::new()),
        })
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = ?user.role, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// get_user
///
/// [Admin Route] One user with profile and a summary of their posts.
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserDetail),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn get_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    state
        .repo
        .get_user_detail(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

/// update_user
///
/// [Admin Route] Partial update: only the fields present in the body change.
/// An empty password keeps the current one; a present `bio` creates or
/// updates the profile. Demoting the only remaining admin is refused.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserWithProfile),
        (status = 400, description = "Would demote the last admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "Email held by another user", body = ErrorBody)
    )
)]
pub async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserWithProfile>, ApiError> {
    if state.repo.get_user(id).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    if let Some(email) = &payload.email {
        if email.trim().is_empty() {
            return Err(ApiError::validation("Email cannot be empty"));
        }
        if let Some(holder) = state.repo.find_user_by_email(email).await? {
            if holder.id != id {
                return Err(ApiError::Conflict(
                    "User with this email already exists".to_string(),
                ));
            }
        }
    }

    let password_hash = match payload.password.filter(|p| !p.is_empty()) {
        Some(plain) => Some(password::hash_password(plain, state.config.bcrypt_cost).await?),
        None => None,
    };

    let changes = UserChanges {
        name: payload.name,
        email: payload.email,
        role: payload.role,
        password_hash,
        bio: payload.bio,
    };

    let updated = state
        .repo
        .update_user(id, changes)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::NotFound("User"),
            RepoError::LastAdmin => ApiError::LastAdminProtection("demote"),
            other => ApiError::from(other),
        })?;

    tracing::info!(admin_id = %admin.id, user_id = %id, "user updated");
    Ok(Json(updated))
}

/// delete_user
///
/// [Admin Route] Removes a user and their profile. Refused for the sole
/// admin and for anyone who still authors posts.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 400, description = "Last admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "User still authors posts", body = ErrorBody)
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.repo.delete_user(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::NotFound("User"),
        RepoError::LastAdmin => ApiError::LastAdminProtection("delete"),
        other => ApiError::from(other),
    })?;

    tracing::info!(admin_id = %admin.id, user_id = %id, "user deleted");
    Ok(Json(SuccessResponse::ok()))
}

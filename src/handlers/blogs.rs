use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::future::Future;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AdminUser,
    error::ApiError,
    models::{
        CreatePostRequest, ErrorBody, NewPost, PostChanges, PostWithAuthor, PublicPost,
        SuccessResponse, UpdatePostRequest,
    },
    repository::{RepoError, RepoResult},
    slug::{SLUG_ATTEMPTS, derive_slug},
};

fn post_error(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::NotFound("Post"),
        other => ApiError::from(other),
    }
}

/// Runs `write` with a freshly derived slug when `title` is set, moving on to
/// the next suffix whenever the store reports a slug collision. Without a
/// title the write runs once with no slug.
async fn write_with_slug<F, Fut>(title: Option<&str>, mut write: F) -> Result<PostWithAuthor, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = RepoResult<PostWithAuthor>>,
{
    let Some(title) = title else {
        return write(None).await.map_err(post_error);
    };

    let now = Utc::now().timestamp_millis();
    for attempt in 0..SLUG_ATTEMPTS {
        match write(Some(derive_slug(title, now, attempt))).await {
            Err(RepoError::DuplicateSlug) => {
                tracing::debug!(attempt, "slug collision, trying next suffix");
            }
            result => return result.map_err(post_error),
        }
    }

    tracing::error!("no free slug after {} attempts", SLUG_ATTEMPTS);
    Err(ApiError::Internal)
}

/// list_posts
///
/// [Admin Route] All posts, published or not, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/blogs",
    responses(
        (status = 200, description = "All posts", body = [PostWithAuthor]),
        (status = 401, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_posts(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostWithAuthor>>, ApiError> {
    Ok(Json(state.repo.list_posts().await?))
}

/// create_post
///
/// [Admin Route] Creates a post. The author defaults to the requesting admin.
#[utoipa::path(
    post,
    path = "/api/admin/blogs",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = PostWithAuthor),
        (status = 400, description = "Missing title/content or unknown author", body = ErrorBody)
    )
)]
pub async fn create_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithAuthor>), ApiError> {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::validation("Title and content are required"));
    }

    let author_id = payload.author_id.unwrap_or(admin.id);
    let post = write_with_slug(Some(&payload.title), |slug| {
        let repo = state.repo.clone();
        let new_post = NewPost {
            title: payload.title.clone(),
            slug: slug.unwrap_or_default(),
            content: payload.content.clone(),
            published: payload.published,
            author_id,
        };
        async move { repo.create_post(new_post).await }
    })
    .await?;

    tracing::info!(post_id = %post.post.id, slug = %post.post.slug, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// get_post
///
/// [Admin Route] One post by id, regardless of publication state.
#[utoipa::path(
    get,
    path = "/api/admin/blogs/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostWithAuthor),
        (status = 404, description = "Unknown post", body = ErrorBody)
    )
)]
pub async fn get_post(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostWithAuthor>, ApiError> {
    state
        .repo
        .get_post(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Post"))
}

/// update_post
///
/// [Admin Route] Partial update. A new title also regenerates the slug, so
/// links to the old slug stop resolving.
#[utoipa::path(
    patch,
    path = "/api/admin/blogs/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = PostWithAuthor),
        (status = 400, description = "Empty title or unknown author", body = ErrorBody),
        (status = 404, description = "Unknown post", body = ErrorBody)
    )
)]
pub async fn update_post(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<PostWithAuthor>, ApiError> {
    if matches!(&payload.title, Some(title) if title.trim().is_empty()) {
        return Err(ApiError::validation("Title cannot be empty"));
    }

    let post = write_with_slug(payload.title.as_deref(), |slug| {
        let repo = state.repo.clone();
        let changes = PostChanges {
            title: payload.title.clone(),
            slug,
            content: payload.content.clone(),
            published: payload.published,
            author_id: payload.author_id,
        };
        async move { repo.update_post(id, changes).await }
    })
    .await?;

    tracing::info!(post_id = %id, "post updated");
    Ok(Json(post))
}

/// delete_post
///
/// [Admin Route] Hard delete.
#[utoipa::path(
    delete,
    path = "/api/admin/blogs/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 404, description = "Unknown post", body = ErrorBody)
    )
)]
pub async fn delete_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.repo.delete_post(id).await.map_err(post_error)?;
    tracing::info!(admin_id = %admin.id, post_id = %id, "post deleted");
    Ok(Json(SuccessResponse::ok()))
}

/// list_published
///
/// [Public Route] Published posts only, newest first.
///
/// *Security*: the repository applies `published = true` unconditionally.
#[utoipa::path(
    get,
    path = "/api/blogs",
    responses((status = 200, description = "Published posts", body = [PublicPost]))
)]
pub async fn list_published(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicPost>>, ApiError> {
    Ok(Json(state.repo.list_published_posts().await?))
}

/// get_published
///
/// [Public Route] A published post by slug. An unpublished post is a 404 even
/// when its exact slug is known.
#[utoipa::path(
    get,
    path = "/api/blogs/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = PublicPost),
        (status = 404, description = "No published post with this slug", body = ErrorBody)
    )
)]
pub async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPost>, ApiError> {
    state
        .repo
        .get_published_post(&slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Post"))
}

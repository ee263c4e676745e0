use axum::{
    Json,
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::AdminUser,
    error::ApiError,
    models::{ErrorBody, SiteSettings, SuccessResponse, UpdateSiteSettingsRequest},
};

/// Multipart field that carries the logo image.
const UPLOAD_FIELD: &str = "file";

const LOGO_CACHE_CONTROL: &str = "public, max-age=3600";

/// Documentation shape of the upload form; the handler reads the multipart stream directly.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct LogoUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// get_site_settings
///
/// [Public Route] The settings singleton, created with defaults on first
/// access. Readable without a session; only the PUT needs an admin. The image itself is never inlined, only `has_logo`.
#[utoipa::path(
    get,
    path = "/api/admin/site-settings",
    responses((status = 200, description = "Current settings", body = SiteSettings))
)]
pub async fn get_site_settings(
    State(state): State<AppState>,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.repo.get_or_create_settings().await?))
}

/// update_site_settings
///
/// [Admin Route] Sets the logo text, and optionally drops the stored image
/// in the same write.
#[utoipa::path(
    put,
    path = "/api/admin/site-settings",
    request_body = UpdateSiteSettingsRequest,
    responses(
        (status = 200, description = "Updated", body = SiteSettings),
        (status = 400, description = "Empty logo text", body = ErrorBody),
        (status = 401, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn update_site_settings(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateSiteSettingsRequest>,
) -> Result<Json<SiteSettings>, ApiError> {
    if payload.logo_text.trim().is_empty() {
        return Err(ApiError::validation("Logo text is required"));
    }

    let settings = state
        .repo
        .update_settings(payload.logo_text, payload.remove_logo_image)
        .await?;

    tracing::info!(admin_id = %admin.id, removed_image = payload.remove_logo_image, "site settings updated");
    Ok(Json(settings))
}

/// upload_logo
///
/// [Admin Route] Stores the multipart field `file` as the logo image. Only
/// `image/*` content types are accepted, up to the configured size limit.
#[utoipa::path(
    post,
    path = "/api/admin/upload",
    request_body(content = LogoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = SuccessResponse),
        (status = 400, description = "No file or not an image", body = ErrorBody),
        (status = 413, description = "File too large", body = ErrorBody)
    )
)]
pub async fn upload_logo(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SuccessResponse>, ApiError> {
    let limit = state.config.max_logo_bytes;

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::FileTooLarge(limit)
        } else {
            tracing::debug!("malformed multipart body: {}", e);
            ApiError::validation("Malformed multipart body")
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .filter(|m| m.type_() == mime::IMAGE)
            .ok_or(ApiError::InvalidFileType)?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limit {
            return Err(ApiError::FileTooLarge(limit));
        }

        let size = bytes.len();
        state
            .repo
            .store_logo_image(bytes.to_vec(), mime_type.essence_str().to_string())
            .await?;

        tracing::info!(admin_id = %admin.id, size, mime = %mime_type, "logo image stored");
        return Ok(Json(SuccessResponse::ok()));
    }

    Err(ApiError::validation("No file uploaded"))
}

/// logo_image
///
/// [Public Route] The raw logo bytes with their stored content type.
#[utoipa::path(
    get,
    path = "/api/logo-image",
    responses(
        (status = 200, description = "Image bytes", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "No logo image stored", body = ErrorBody)
    )
)]
pub async fn logo_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let image = state
        .repo
        .get_logo_image()
        .await?
        .ok_or(ApiError::NotFound("Logo image"))?;

    Ok((
        [
            (header::CONTENT_TYPE, image.mime_type),
            (header::CACHE_CONTROL, LOGO_CACHE_CONTROL.to_string()),
        ],
        image.bytes,
    )
        .into_response())
}

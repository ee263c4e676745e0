use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed primary key of the singleton `site_settings` row.
pub const SITE_SETTINGS_ID: &str = "site-settings";

/// Logo text used when the settings row is created lazily.
pub const DEFAULT_LOGO_TEXT: &str = "MyApp";

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field carried by every user and embedded in every session token.
/// Stored as the Postgres enum `user_role` and serialized as `"USER"` / `"ADMIN"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// UserRecord
///
/// The full `users` row, including the bcrypt hash. This type never leaves the
/// server: it has no `Serialize` impl, and every outward path converts it into `User`.
#[derive(Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User
///
/// The outward identity of an account. Has no password field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            role: record.role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Profile
///
/// 1:1 extension of a user (`profiles.user_id` is unique). Created lazily on the
/// first profile write when absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub twitter_handle: Option<String>,
    pub github_handle: Option<String>,
    pub linkedin_handle: Option<String>,
    pub avatar_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// An empty profile for `user_id`, optionally seeded with a bio.
    pub fn empty(user_id: Uuid, bio: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            bio,
            location: None,
            job_title: None,
            company: None,
            website: None,
            twitter_handle: None,
            github_handle: None,
            linkedin_handle: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Post
///
/// A blog post row. `slug` is unique and regenerated whenever the title changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    /// Markdown source. Rendering happens on the client.
    pub content: String,
    pub published: bool,
    pub author_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// SiteSettingsRecord
///
/// The raw singleton row, image bytes included. Only the logo-image read path
/// and the in-memory store touch the bytes.
#[derive(Debug, Clone)]
pub struct SiteSettingsRecord {
    pub id: String,
    pub logo_text: String,
    pub logo_image: Option<Vec<u8>>,
    pub logo_mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettingsRecord {
    pub fn with_defaults() -> Self {
        let now = Utc::now();
        Self {
            id: SITE_SETTINGS_ID.to_string(),
            logo_text: DEFAULT_LOGO_TEXT.to_string(),
            logo_image: None,
            logo_mime_type: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Response Schemas (Output) ---

/// UserWithProfile
///
/// Returned by the profile endpoints and by admin user updates.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
}

/// UserListItem
///
/// One row of the admin user listing (GET /api/admin/users).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserListItem {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
    pub post_count: i64,
}

/// PostSummary
///
/// Compact post reference listed under a user in the admin detail view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserDetail
///
/// Admin view of a single user (GET /api/admin/users/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
    pub posts: Vec<PostSummary>,
}

/// AuthorSummary
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

/// PostWithAuthor
///
/// Admin view of a post, with its author embedded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
}

/// PublicAuthor
///
/// The author as shown to anonymous readers: no email. `bio` is only filled
/// on the single-post view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PublicAuthor {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// PublicPost
///
/// A published post as served by /api/blogs. Never built from an unpublished row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PublicPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author: PublicAuthor,
}

/// SiteSettings
///
/// Outward view of the settings singleton. The image bytes are never included,
/// only `has_logo`; the bytes are served by GET /api/logo-image.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct SiteSettings {
    pub id: String,
    pub logo_text: String,
    pub logo_mime_type: Option<String>,
    pub has_logo: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<&SiteSettingsRecord> for SiteSettings {
    fn from(record: &SiteSettingsRecord) -> Self {
        Self {
            id: record.id.clone(),
            logo_text: record.logo_text.clone(),
            logo_mime_type: record.logo_mime_type.clone(),
            has_logo: record.logo_image.is_some(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// LogoImage
///
/// Raw branding image as stored inline in the settings row.
#[derive(Debug, Clone)]
pub struct LogoImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    /// Signed session token, also set as the `session_token` cookie.
    pub token: String,
    pub user: User,
}

/// SessionUser
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub role: Role,
}

/// SessionResponse
///
/// `user` is `null` whenever no valid token accompanied the request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub user: Option<SessionUser>,
}

/// SuccessResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// ErrorBody
///
/// Shape of every error response: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

// --- Request Payloads (Input Schemas) ---
//
// Required string fields default to "" so that a missing field is reported as
// a 400 by the handler instead of a JSON rejection.

/// RegisterRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// CreateUserRequest
///
/// Admin user creation. `role` defaults to USER when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update: absent fields are left untouched. An empty `password` means
/// "keep the current one".
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// UpdateProfileRequest
///
/// Self-service partial update (PATCH /api/profile). Role and email are not editable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// CreatePostRequest
///
/// `author_id` defaults to the requesting admin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub author_id: Option<Uuid>,
}

/// UpdatePostRequest
///
/// Partial update. A present `title` also regenerates the slug.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
}

/// UpdateSiteSettingsRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateSiteSettingsRequest {
    #[serde(default)]
    pub logo_text: String,
    /// Clears the stored image and its MIME type in the same write as the text change.
    #[serde(default)]
    pub remove_logo_image: bool,
}

// --- Store Commands (Handler -> Repository) ---

/// NewUser
///
/// A user ready for insertion: the password is already hashed. `bio` seeds the
/// profile row that is always created alongside the user.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub bio: Option<String>,
}

/// UserChanges
///
/// Each `Some` field is written, each `None` is left untouched.
#[derive(Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
}

/// ProfileChanges
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub twitter_handle: Option<String>,
    pub github_handle: Option<String>,
    pub linkedin_handle: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            name: req.name,
            bio: req.bio,
            location: req.location,
            job_title: req.job_title,
            company: req.company,
            website: req.website,
            twitter_handle: req.twitter_handle,
            github_handle: req.github_handle,
            linkedin_handle: req.linkedin_handle,
            avatar_url: req.avatar_url,
        }
    }
}

/// NewPost
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    pub author_id: Uuid,
}

/// PostChanges
///
/// `title` and `slug` travel together: the handler derives the slug whenever a title is set.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub author_id: Option<Uuid>,
}

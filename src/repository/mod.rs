use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    LogoImage, NewPost, NewUser, PostChanges, PostWithAuthor, ProfileChanges, PublicPost,
    SiteSettings, User, UserChanges, UserDetail, UserListItem, UserRecord, UserWithProfile,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepoError
///
/// Store outcomes. The domain variants are decided inside the store, in the
/// same atomic step as the write they guard; `Database` is everything else.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("slug already taken")]
    DuplicateSlug,
    #[error("author does not exist")]
    UnknownAuthor,
    /// Deleting or demoting the target would leave zero ADMIN users.
    #[error("operation would remove the last admin")]
    LastAdmin,
    /// The user still authors posts; deletion is restricted.
    #[error("user still authors {0} posts")]
    HasPosts(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers only see this
/// trait, so the Postgres store and the in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Full record including the password hash. Only the login flow uses it.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserWithProfile>>;
    async fn get_user_detail(&self, id: Uuid) -> RepoResult<Option<UserDetail>>;
    /// All users, newest first, with profile and post count.
    async fn list_users(&self) -> RepoResult<Vec<UserListItem>>;
    /// Inserts the user and its profile row together. `DuplicateEmail` on conflict.
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User>;
    /// Partial update. A role change that demotes the last admin fails with
    /// `LastAdmin`, decided atomically with the write.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<UserWithProfile>;
    /// Guarded delete: `NotFound`, `LastAdmin` or `HasPosts`, with the admin
    /// count checked and the row removed in one atomic operation.
    async fn delete_user(&self, id: Uuid) -> RepoResult<()>;
    /// Self-service update; creates the profile row when absent.
    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges)
    -> RepoResult<UserWithProfile>;

    // --- Posts (admin) ---
    async fn list_posts(&self) -> RepoResult<Vec<PostWithAuthor>>;
    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostWithAuthor>>;
    async fn create_post(&self, new_post: NewPost) -> RepoResult<PostWithAuthor>;
    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<PostWithAuthor>;
    async fn delete_post(&self, id: Uuid) -> RepoResult<()>;

    // --- Posts (public) ---
    // Must enforce published = true; unpublished posts do not exist here.
    async fn list_published_posts(&self) -> RepoResult<Vec<PublicPost>>;
    async fn get_published_post(&self, slug: &str) -> RepoResult<Option<PublicPost>>;

    // --- Site settings singleton ---
    /// Idempotent get-or-create; safe under concurrent first access.
    async fn get_or_create_settings(&self) -> RepoResult<SiteSettings>;
    /// Upsert of the logo text; `remove_image` clears bytes and MIME type in the same write.
    async fn update_settings(&self, logo_text: String, remove_image: bool)
    -> RepoResult<SiteSettings>;
    async fn store_logo_image(&self, bytes: Vec<u8>, mime_type: String) -> RepoResult<()>;
    async fn get_logo_image(&self) -> RepoResult<Option<LogoImage>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

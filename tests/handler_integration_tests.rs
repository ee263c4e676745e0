use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use inkwell_cms::{
    ApiError, AppConfig, AppState, MemoryRepository,
    auth::{AdminUser, AuthUser},
    handlers,
    models::{
        CreatePostRequest, CreateUserRequest, LogoImage, NewPost, NewUser, PostChanges,
        PostWithAuthor, ProfileChanges, PublicPost, Role, SiteSettings, UpdatePostRequest,
        UpdateProfileRequest, UpdateSiteSettingsRequest, UpdateUserRequest, User, UserChanges,
        UserDetail, UserListItem, UserRecord, UserWithProfile,
    },
    password,
    repository::{RepoError, RepoResult, Repository},
};
use std::sync::Arc;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Every call fails as if the database were unreachable; used to check that
// store failures surface as a generic 500.
struct BrokenRepo;

fn broken<T>() -> RepoResult<T> {
    Err(RepoError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Repository for BrokenRepo {
    async fn find_user_by_email(&self, _email: &str) -> RepoResult<Option<UserRecord>> {
        broken()
    }
    async fn get_user(&self, _id: Uuid) -> RepoResult<Option<UserWithProfile>> {
        broken()
    }
    async fn get_user_detail(&self, _id: Uuid) -> RepoResult<Option<UserDetail>> {
        broken()
    }
    async fn list_users(&self) -> RepoResult<Vec<UserListItem>> {
        broken()
    }
    async fn create_user(&self, _new_user: NewUser) -> RepoResult<User> {
        broken()
    }
    async fn update_user(&self, _id: Uuid, _changes: UserChanges) -> RepoResult<UserWithProfile> {
        broken()
    }
    async fn delete_user(&self, _id: Uuid) -> RepoResult<()> {
        broken()
    }
    async fn update_profile(
        &self,
        _user_id: Uuid,
        _changes: ProfileChanges,
    ) -> RepoResult<UserWithProfile> {
        broken()
    }
    async fn list_posts(&self) -> RepoResult<Vec<PostWithAuthor>> {
        broken()
    }
    async fn get_post(&self, _id: Uuid) -> RepoResult<Option<PostWithAuthor>> {
        broken()
    }
    async fn create_post(&self, _new_post: NewPost) -> RepoResult<PostWithAuthor> {
        broken()
    }
    async fn update_post(&self, _id: Uuid, _changes: PostChanges) -> RepoResult<PostWithAuthor> {
        broken()
    }
    async fn delete_post(&self, _id: Uuid) -> RepoResult<()> {
        broken()
    }
    async fn list_published_posts(&self) -> RepoResult<Vec<PublicPost>> {
        broken()
    }
    async fn get_published_post(&self, _slug: &str) -> RepoResult<Option<PublicPost>> {
        broken()
    }
    async fn get_or_create_settings(&self) -> RepoResult<SiteSettings> {
        broken()
    }
    async fn update_settings(
        &self,
        _logo_text: String,
        _remove_image: bool,
    ) -> RepoResult<SiteSettings> {
        broken()
    }
    async fn store_logo_image(&self, _bytes: Vec<u8>, _mime_type: String) -> RepoResult<()> {
        broken()
    }
    async fn get_logo_image(&self) -> RepoResult<Option<LogoImage>> {
        broken()
    }
}

// --- TEST UTILITIES ---

fn test_config() -> AppConfig {
    AppConfig {
        bcrypt_cost: 4,
        ..AppConfig::default()
    }
}

fn create_test_state() -> AppState {
    AppState::new(Arc::new(MemoryRepository::new()), test_config())
}

async fn seed_user(state: &AppState, email: &str, role: Role) -> User {
    let password_hash = password::hash_password("password123".to_string(), 4)
        .await
        .unwrap();
    state
        .repo
        .create_user(NewUser {
            email: email.to_string(),
            name: Some(email.split('@').next().unwrap_or_default().to_string()),
            password_hash,
            role,
            bio: Some(String::new()),
        })
        .await
        .unwrap()
}

fn as_admin(user: &User) -> AdminUser {
    AdminUser(AuthUser {
        id: user.id,
        role: Role::Admin,
    })
}

fn as_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

fn status_of(err: ApiError) -> StatusCode {
    err.into_response().status()
}

async fn create_post(state: &AppState, admin: &User, title: &str, published: bool) -> PostWithAuthor {
    let (status, Json(post)) = handlers::blogs::create_post(
        as_admin(admin),
        State(state.clone()),
        Json(CreatePostRequest {
            title: title.to_string(),
            content: "# Body".to_string(),
            published,
            author_id: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    post
}

// --- USER HANDLER TESTS ---

#[tokio::test]
async fn test_create_user_defaults_to_user_role_with_empty_bio() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let (status, Json(user)) = handlers::users::create_user(
        as_admin(&admin),
        State(state.clone()),
        Json(CreateUserRequest {
            email: "writer@inkwell.test".to_string(),
            password: "secret".to_string(),
            name: Some("Writer".to_string()),
            role: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user.role, Role::User);

    let stored = state.repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.profile.unwrap().bio.as_deref(), Some(""));

    // The hash is stored, never the plain password.
    let record = state
        .repo
        .find_user_by_email("writer@inkwell.test")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(record.password, "secret");
    assert!(password::verify_password("secret".to_string(), record.password).await);
}

#[tokio::test]
async fn test_create_user_validation_and_conflict() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let missing = handlers::users::create_user(
        as_admin(&admin),
        State(state.clone()),
        Json(CreateUserRequest {
            email: "".to_string(),
            password: "x".to_string(),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(missing), StatusCode::BAD_REQUEST);

    let duplicate = handlers::users::create_user(
        as_admin(&admin),
        State(state.clone()),
        Json(CreateUserRequest {
            email: "admin@inkwell.test".to_string(),
            password: "x".to_string(),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(duplicate), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_users_never_exposes_password() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    seed_user(&state, "reader@inkwell.test", Role::User).await;
    create_post(&state, &admin, "First", true).await;

    let Json(users) = handlers::users::list_users(as_admin(&admin), State(state.clone()))
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    // Newest first.
    assert_eq!(users[0].user.email, "reader@inkwell.test");
    assert_eq!(users[1].post_count, 1);

    let json = serde_json::to_value(&users).unwrap();
    for item in json.as_array().unwrap() {
        assert!(item.get("password").is_none());
        assert!(item.get("email").is_some());
    }
}

#[tokio::test]
async fn test_get_user_includes_post_summaries() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    create_post(&state, &admin, "Draft", false).await;

    let Json(detail) =
        handlers::users::get_user(as_admin(&admin), State(state.clone()), Path(admin.id))
            .await
            .unwrap();
    assert_eq!(detail.posts.len(), 1);
    assert!(!detail.posts[0].published);

    let missing =
        handlers::users::get_user(as_admin(&admin), State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
    assert_eq!(status_of(missing), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_user_partial_fields() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let reader = seed_user(&state, "reader@inkwell.test", Role::User).await;
    let original_hash = state
        .repo
        .find_user_by_email("reader@inkwell.test")
        .await
        .unwrap()
        .unwrap()
        .password;

    let Json(updated) = handlers::users::update_user(
        as_admin(&admin),
        State(state.clone()),
        Path(reader.id),
        Json(UpdateUserRequest {
            bio: Some("Hello".to_string()),
            password: Some(String::new()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    // Only the bio changed; an empty password means "keep it".
    assert_eq!(updated.user.name, reader.name);
    assert_eq!(updated.user.email, reader.email);
    assert_eq!(updated.profile.unwrap().bio.as_deref(), Some("Hello"));
    let hash_after = state
        .repo
        .find_user_by_email("reader@inkwell.test")
        .await
        .unwrap()
        .unwrap()
        .password;
    assert_eq!(hash_after, original_hash);
}

#[tokio::test]
async fn test_update_user_email_conflict_and_not_found() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let reader = seed_user(&state, "reader@inkwell.test", Role::User).await;

    let conflict = handlers::users::update_user(
        as_admin(&admin),
        State(state.clone()),
        Path(reader.id),
        Json(UpdateUserRequest {
            email: Some("admin@inkwell.test".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(conflict), StatusCode::CONFLICT);

    let missing = handlers::users::update_user(
        as_admin(&admin),
        State(state),
        Path(Uuid::new_v4()),
        Json(UpdateUserRequest::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(missing), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sole_admin_cannot_demote_self() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let err = handlers::users::update_user(
        as_admin(&admin),
        State(state.clone()),
        Path(admin.id),
        Json(UpdateUserRequest {
            role: Some(Role::User),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Cannot demote the last admin user");
    assert_eq!(status_of(err), StatusCode::BAD_REQUEST);

    // With a second admin the demotion goes through.
    seed_user(&state, "second@inkwell.test", Role::Admin).await;
    let Json(updated) = handlers::users::update_user(
        as_admin(&admin),
        State(state),
        Path(admin.id),
        Json(UpdateUserRequest {
            role: Some(Role::User),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.user.role, Role::User);
}

#[tokio::test]
async fn test_delete_last_admin_is_refused() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let err = handlers::users::delete_user(as_admin(&admin), State(state.clone()), Path(admin.id))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot delete the last admin user");
    assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    assert!(state.repo.get_user(admin.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_deletes_keep_one_admin() {
    let state = create_test_state();
    let first = seed_user(&state, "first@inkwell.test", Role::Admin).await;
    let second = seed_user(&state, "second@inkwell.test", Role::Admin).await;

    let a = tokio::spawn({
        let state = state.clone();
        let caller = second.clone();
        let target = first.id;
        async move { handlers::users::delete_user(as_admin(&caller), State(state), Path(target)).await }
    });
    let b = tokio::spawn({
        let state = state.clone();
        let caller = first.clone();
        let target = second.id;
        async move { handlers::users::delete_user(as_admin(&caller), State(state), Path(target)).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let admins = state
        .repo
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .filter(|u| u.user.role == Role::Admin)
        .count();
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn test_delete_author_is_restricted() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let writer = seed_user(&state, "writer@inkwell.test", Role::User).await;

    handlers::blogs::create_post(
        as_admin(&admin),
        State(state.clone()),
        Json(CreatePostRequest {
            title: "Guest post".to_string(),
            content: "text".to_string(),
            published: true,
            author_id: Some(writer.id),
        }),
    )
    .await
    .unwrap();

    let err = handlers::users::delete_user(as_admin(&admin), State(state.clone()), Path(writer.id))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::CONFLICT);

    let plain = seed_user(&state, "plain@inkwell.test", Role::User).await;
    let Json(ok) = handlers::users::delete_user(as_admin(&admin), State(state.clone()), Path(plain.id))
        .await
        .unwrap();
    assert!(ok.success);
    assert!(state.repo.get_user(plain.id).await.unwrap().is_none());
}

// --- POST HANDLER TESTS ---

#[tokio::test]
async fn test_create_post_derives_slug_and_defaults_author() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let post = create_post(&state, &admin, "Hello World", false).await;

    let (base, suffix) = post.post.slug.rsplit_once('-').unwrap();
    assert_eq!(base, "hello-world");
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(post.post.author_id, admin.id);
    assert_eq!(post.author.email, "admin@inkwell.test");
    assert!(!post.post.published);
}

#[tokio::test]
async fn test_same_title_twice_gets_distinct_slugs() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let first = create_post(&state, &admin, "Same Title", true).await;
    let second = create_post(&state, &admin, "Same Title", true).await;
    assert_ne!(first.post.slug, second.post.slug);
}

#[tokio::test]
async fn test_create_post_validation() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let empty = handlers::blogs::create_post(
        as_admin(&admin),
        State(state.clone()),
        Json(CreatePostRequest {
            title: "Title".to_string(),
            content: "".to_string(),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(empty.to_string(), "Title and content are required");

    let ghost_author = handlers::blogs::create_post(
        as_admin(&admin),
        State(state),
        Json(CreatePostRequest {
            title: "Title".to_string(),
            content: "Body".to_string(),
            author_id: Some(Uuid::new_v4()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(ghost_author), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_publish_toggle_controls_public_visibility() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let post = create_post(&state, &admin, "Draft Post", false).await;
    let slug = post.post.slug.clone();

    let hidden = handlers::blogs::get_published(State(state.clone()), Path(slug.clone()))
        .await
        .unwrap_err();
    assert_eq!(status_of(hidden), StatusCode::NOT_FOUND);
    let Json(listed) = handlers::blogs::list_published(State(state.clone())).await.unwrap();
    assert!(listed.is_empty());

    let Json(published) = handlers::blogs::update_post(
        as_admin(&admin),
        State(state.clone()),
        Path(post.post.id),
        Json(UpdatePostRequest {
            published: Some(true),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    // No new title, so the slug is untouched.
    assert_eq!(published.post.slug, slug);
    assert_eq!(published.post.title, "Draft Post");

    let Json(public) = handlers::blogs::get_published(State(state.clone()), Path(slug))
        .await
        .unwrap();
    assert_eq!(public.author.id, admin.id);

    let json = serde_json::to_value(&public).unwrap();
    assert!(json["author"].get("email").is_none());
}

#[tokio::test]
async fn test_retitle_regenerates_slug() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let post = create_post(&state, &admin, "Old Name", true).await;

    let Json(updated) = handlers::blogs::update_post(
        as_admin(&admin),
        State(state.clone()),
        Path(post.post.id),
        Json(UpdatePostRequest {
            title: Some("New Name".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert!(updated.post.slug.starts_with("new-name-"));
    assert_eq!(updated.post.content, "# Body");

    let old = handlers::blogs::get_published(State(state), Path(post.post.slug))
        .await
        .unwrap_err();
    assert_eq!(status_of(old), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_post_then_404() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;
    let post = create_post(&state, &admin, "Short lived", true).await;

    let Json(ok) =
        handlers::blogs::delete_post(as_admin(&admin), State(state.clone()), Path(post.post.id))
            .await
            .unwrap();
    assert!(ok.success);

    let again = handlers::blogs::delete_post(as_admin(&admin), State(state), Path(post.post.id))
        .await
        .unwrap_err();
    assert_eq!(again.to_string(), "Post not found");
}

// --- PROFILE HANDLER TESTS ---

#[tokio::test]
async fn test_profile_patch_is_partial() {
    let state = create_test_state();
    let reader = seed_user(&state, "reader@inkwell.test", Role::User).await;

    handlers::profile::update_profile(
        as_user(&reader),
        State(state.clone()),
        Json(UpdateProfileRequest {
            location: Some("Lisbon".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let Json(after) = handlers::profile::update_profile(
        as_user(&reader),
        State(state.clone()),
        Json(UpdateProfileRequest {
            name: Some("Renamed".to_string()),
            github_handle: Some("reader".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(after.user.name.as_deref(), Some("Renamed"));
    assert_eq!(after.user.role, Role::User);
    let profile = after.profile.unwrap();
    assert_eq!(profile.location.as_deref(), Some("Lisbon"));
    assert_eq!(profile.github_handle.as_deref(), Some("reader"));
}

#[tokio::test]
async fn test_profile_of_deleted_user_is_unauthorized() {
    let state = create_test_state();
    let ghost = AuthUser {
        id: Uuid::new_v4(),
        role: Role::User,
    };

    let err = handlers::profile::get_profile(ghost.clone(), State(state.clone()))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);

    let err = handlers::profile::update_profile(
        ghost,
        State(state),
        Json(UpdateProfileRequest::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
}

// --- SITE SETTINGS HANDLER TESTS ---

#[tokio::test]
async fn test_site_settings_lazy_default_and_update() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let Json(initial) = handlers::site_settings::get_site_settings(State(state.clone()))
        .await
        .unwrap();
    assert_eq!(initial.id, "site-settings");
    assert_eq!(initial.logo_text, "MyApp");
    assert!(!initial.has_logo);

    state
        .repo
        .store_logo_image(vec![1, 2, 3], "image/png".to_string())
        .await
        .unwrap();

    let Json(updated) = handlers::site_settings::update_site_settings(
        as_admin(&admin),
        State(state.clone()),
        Json(UpdateSiteSettingsRequest {
            logo_text: "Inkwell".to_string(),
            remove_logo_image: true,
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.logo_text, "Inkwell");
    assert!(!updated.has_logo);
    assert!(updated.logo_mime_type.is_none());

    let gone = handlers::site_settings::logo_image(State(state)).await.unwrap_err();
    assert_eq!(status_of(gone), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_site_settings_rejects_empty_text() {
    let state = create_test_state();
    let admin = seed_user(&state, "admin@inkwell.test", Role::Admin).await;

    let err = handlers::site_settings::update_site_settings(
        as_admin(&admin),
        State(state),
        Json(UpdateSiteSettingsRequest::default()),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logo_image_headers() {
    let state = create_test_state();
    state
        .repo
        .store_logo_image(vec![0x89, b'P', b'N', b'G'], "image/png".to_string())
        .await
        .unwrap();

    let response = handlers::site_settings::logo_image(State(state)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
}

// --- STORE FAILURE ---

#[tokio::test]
async fn test_store_failure_is_generic_500() {
    let state = AppState::new(Arc::new(BrokenRepo), test_config());

    let err = handlers::blogs::list_published(State(state.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Internal server error");
    assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);

    let admin = AdminUser(AuthUser {
        id: Uuid::new_v4(),
        role: Role::Admin,
    });
    let err = handlers::users::list_users(admin, State(state)).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
}

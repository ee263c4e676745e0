use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RepoError, RepoResult, Repository};
use crate::models::{
    AuthorSummary, LogoImage, NewPost, NewUser, Post, PostChanges, PostSummary, PostWithAuthor,
    Profile, ProfileChanges, PublicAuthor, PublicPost, SiteSettings, SiteSettingsRecord, User,
    UserChanges, UserDetail, UserListItem, UserRecord, UserWithProfile,
};

#[derive(Default)]
struct Store {
    // Insertion order doubles as creation order; listings walk it in reverse.
    users: Vec<UserRecord>,
    profiles: HashMap<Uuid, Profile>,
    posts: Vec<Post>,
    settings: Option<SiteSettingsRecord>,
}

impl Store {
    fn user(&self, id: Uuid) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn admin_count(&self) -> usize {
        self.users.iter().filter(|u| u.role.is_admin()).count()
    }

    fn user_with_profile(&self, id: Uuid) -> Option<UserWithProfile> {
        self.user(id).map(|record| UserWithProfile {
            user: User::from(record.clone()),
            profile: self.profiles.get(&id).cloned(),
        })
    }

    fn with_author(&self, post: &Post) -> PostWithAuthor {
        let author = match self.user(post.author_id) {
            Some(u) => AuthorSummary {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            },
            None => AuthorSummary {
                id: post.author_id,
                name: None,
                email: String::new(),
            },
        };
        PostWithAuthor {
            post: post.clone(),
            author,
        }
    }

    fn public(&self, post: &Post, with_bio: bool) -> PublicPost {
        let author = self.user(post.author_id);
        PublicPost {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            created_at: post.created_at,
            updated_at: post.updated_at,
            author: PublicAuthor {
                id: post.author_id,
                name: author.and_then(|u| u.name.clone()),
                bio: if with_bio {
                    self.profiles
                        .get(&post.author_id)
                        .and_then(|p| p.bio.clone())
                } else {
                    None
                },
            },
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }

    fn settings_mut(&mut self) -> &mut SiteSettingsRecord {
        self.settings
            .get_or_insert_with(SiteSettingsRecord::with_defaults)
    }
}

/// MemoryRepository
///
/// In-process implementation of `Repository`, used by the test suite and by
/// local runs without `DATABASE_URL`. Every operation runs under a single
/// mutex guard, so each guarded check-and-write is atomic with respect to all
/// other operations. Data is lost on restart.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let store = self.store.lock().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserWithProfile>> {
        let store = self.store.lock().await;
        Ok(store.user_with_profile(id))
    }

    async fn get_user_detail(&self, id: Uuid) -> RepoResult<Option<UserDetail>> {
        let store = self.store.lock().await;
        let Some(UserWithProfile { user, profile }) = store.user_with_profile(id) else {
            return Ok(None);
        };

        let posts = store
            .posts
            .iter()
            .rev()
            .filter(|p| p.author_id == id)
            .map(|p| PostSummary {
                id: p.id,
                title: p.title.clone(),
                slug: p.slug.clone(),
                published: p.published,
                created_at: p.created_at,
            })
            .collect();

        Ok(Some(UserDetail {
            user,
            profile,
            posts,
        }))
    }

    async fn list_users(&self) -> RepoResult<Vec<UserListItem>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .rev()
            .map(|record| UserListItem {
                user: User::from(record.clone()),
                profile: store.profiles.get(&record.id).cloned(),
                post_count: store
                    .posts
                    .iter()
                    .filter(|p| p.author_id == record.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let mut store = self.store.lock().await;
        if store.email_taken(&new_user.email, None) {
            return Err(RepoError::DuplicateEmail);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            password: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };

        store
            .profiles
            .insert(record.id, Profile::empty(record.id, new_user.bio));
        store.users.push(record.clone());
        Ok(User::from(record))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<UserWithProfile> {
        let mut store = self.store.lock().await;
        let Some(current) = store.user(id) else {
            return Err(RepoError::NotFound);
        };

        let demoting = current.role.is_admin() && matches!(changes.role, Some(r) if !r.is_admin());
        if demoting && store.admin_count() <= 1 {
            return Err(RepoError::LastAdmin);
        }
        if let Some(email) = &changes.email {
            if store.email_taken(email, Some(id)) {
                return Err(RepoError::DuplicateEmail);
            }
        }

        let now = Utc::now();
        if let Some(record) = store.users.iter_mut().find(|u| u.id == id) {
            if let Some(name) = changes.name {
                record.name = Some(name);
            }
            if let Some(email) = changes.email {
                record.email = email;
            }
            if let Some(role) = changes.role {
                record.role = role;
            }
            if let Some(hash) = changes.password_hash {
                record.password = hash;
            }
            record.updated_at = now;
        }

        if let Some(bio) = changes.bio {
            let profile = store
                .profiles
                .entry(id)
                .or_insert_with(|| Profile::empty(id, None));
            profile.bio = Some(bio);
            profile.updated_at = now;
        }

        store.user_with_profile(id).ok_or(RepoError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<()> {
        let mut store = self.store.lock().await;
        let Some(target) = store.user(id) else {
            return Err(RepoError::NotFound);
        };

        if target.role.is_admin() && store.admin_count() <= 1 {
            return Err(RepoError::LastAdmin);
        }

        let post_count = store.posts.iter().filter(|p| p.author_id == id).count() as i64;
        if post_count > 0 {
            return Err(RepoError::HasPosts(post_count));
        }

        store.users.retain(|u| u.id != id);
        store.profiles.remove(&id);
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> RepoResult<UserWithProfile> {
        let mut store = self.store.lock().await;
        let now = Utc::now();

        let Some(record) = store.users.iter_mut().find(|u| u.id == user_id) else {
            return Err(RepoError::NotFound);
        };
        if let Some(name) = changes.name {
            record.name = Some(name);
        }
        record.updated_at = now;

        let profile = store
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::empty(user_id, None));

        let fields = [
            (&mut profile.bio, changes.bio),
            (&mut profile.location, changes.location),
            (&mut profile.job_title, changes.job_title),
            (&mut profile.company, changes.company),
            (&mut profile.website, changes.website),
            (&mut profile.twitter_handle, changes.twitter_handle),
            (&mut profile.github_handle, changes.github_handle),
            (&mut profile.linkedin_handle, changes.linkedin_handle),
            (&mut profile.avatar_url, changes.avatar_url),
        ];
        for (slot, value) in fields {
            if value.is_some() {
                *slot = value;
            }
        }
        profile.updated_at = now;

        store.user_with_profile(user_id).ok_or(RepoError::NotFound)
    }

    async fn list_posts(&self) -> RepoResult<Vec<PostWithAuthor>> {
        let store = self.store.lock().await;
        Ok(store.posts.iter().rev().map(|p| store.with_author(p)).collect())
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostWithAuthor>> {
        let store = self.store.lock().await;
        Ok(store
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| store.with_author(p)))
    }

    async fn create_post(&self, new_post: NewPost) -> RepoResult<PostWithAuthor> {
        let mut store = self.store.lock().await;
        if store.user(new_post.author_id).is_none() {
            return Err(RepoError::UnknownAuthor);
        }
        if store.slug_taken(&new_post.slug, None) {
            return Err(RepoError::DuplicateSlug);
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: new_post.title,
            slug: new_post.slug,
            content: new_post.content,
            published: new_post.published,
            author_id: new_post.author_id,
            created_at: now,
            updated_at: now,
        };
        store.posts.push(post.clone());
        Ok(store.with_author(&post))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<PostWithAuthor> {
        let mut store = self.store.lock().await;
        if !store.posts.iter().any(|p| p.id == id) {
            return Err(RepoError::NotFound);
        }
        if let Some(author_id) = changes.author_id {
            if store.user(author_id).is_none() {
                return Err(RepoError::UnknownAuthor);
            }
        }
        if let Some(slug) = &changes.slug {
            if store.slug_taken(slug, Some(id)) {
                return Err(RepoError::DuplicateSlug);
            }
        }

        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Err(RepoError::NotFound);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(slug) = changes.slug {
            post.slug = slug;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(published) = changes.published {
            post.published = published;
        }
        if let Some(author_id) = changes.author_id {
            post.author_id = author_id;
        }
        post.updated_at = Utc::now();

        let post = post.clone();
        Ok(store.with_author(&post))
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<()> {
        let mut store = self.store.lock().await;
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        if store.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_published_posts(&self) -> RepoResult<Vec<PublicPost>> {
        let store = self.store.lock().await;
        Ok(store
            .posts
            .iter()
            .rev()
            .filter(|p| p.published)
            .map(|p| store.public(p, false))
            .collect())
    }

    async fn get_published_post(&self, slug: &str) -> RepoResult<Option<PublicPost>> {
        let store = self.store.lock().await;
        Ok(store
            .posts
            .iter()
            .find(|p| p.published && p.slug == slug)
            .map(|p| store.public(p, true)))
    }

    async fn get_or_create_settings(&self) -> RepoResult<SiteSettings> {
        let mut store = self.store.lock().await;
        Ok(SiteSettings::from(&*store.settings_mut()))
    }

    async fn update_settings(
        &self,
        logo_text: String,
        remove_image: bool,
    ) -> RepoResult<SiteSettings> {
        let mut store = self.store.lock().await;
        let settings = store.settings_mut();
        settings.logo_text = logo_text;
        if remove_image {
            settings.logo_image = None;
            settings.logo_mime_type = None;
        }
        settings.updated_at = Utc::now();
        Ok(SiteSettings::from(&*settings))
    }

    async fn store_logo_image(&self, bytes: Vec<u8>, mime_type: String) -> RepoResult<()> {
        let mut store = self.store.lock().await;
        let settings = store.settings_mut();
        settings.logo_image = Some(bytes);
        settings.logo_mime_type = Some(mime_type);
        settings.updated_at = Utc::now();
        Ok(())
    }

    async fn get_logo_image(&self) -> RepoResult<Option<LogoImage>> {
        let store = self.store.lock().await;
        Ok(store.settings.as_ref().and_then(|s| {
            match (s.logo_image.clone(), s.logo_mime_type.clone()) {
                (Some(bytes), Some(mime_type)) => Some(LogoImage { bytes, mime_type }),
                _ => None,
            }
        }))
    }
}

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{RepoError, RepoResult, Repository};
use crate::models::{
    AuthorSummary, DEFAULT_LOGO_TEXT, LogoImage, NewPost, NewUser, Post, PostChanges,
    PostSummary, PostWithAuthor, Profile, ProfileChanges, PublicAuthor, PublicPost,
    SITE_SETTINGS_ID, SiteSettings, User, UserChanges, UserDetail, UserListItem, UserRecord,
    UserWithProfile,
};

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, user_id, bio, location, job_title, company, website, \
     twitter_handle, github_handle, linkedin_handle, avatar_url, created_at, updated_at";

const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.content, p.published, p.author_id,
           p.created_at, p.updated_at,
           u.name AS author_name, u.email AS author_email
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const SETTINGS_COLUMNS: &str =
    "id, logo_text, logo_mime_type, (logo_image IS NOT NULL) AS has_logo, created_at, updated_at";

/// A post row joined with its author's summary columns.
#[derive(FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    author_name: Option<String>,
    author_email: String,
}

impl From<PostRow> for PostWithAuthor {
    fn from(row: PostRow) -> Self {
        let author = AuthorSummary {
            id: row.post.author_id,
            name: row.author_name,
            email: row.author_email,
        };
        Self {
            post: row.post,
            author,
        }
    }
}

#[derive(FromRow)]
struct PublicPostRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    author_id: Uuid,
    author_name: Option<String>,
    author_bio: Option<String>,
}

impl From<PublicPostRow> for PublicPost {
    fn from(row: PublicPostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: PublicAuthor {
                id: row.author_id,
                name: row.author_name,
                bio: row.author_bio,
            },
        }
    }
}

#[derive(FromRow)]
struct UserCountRow {
    #[sqlx(flatten)]
    user: User,
    post_count: i64,
}

/// Translates constraint violations into domain outcomes. Anything else stays
/// a database error.
fn map_write_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some("users_email_key") => return RepoError::DuplicateEmail,
            Some("posts_slug_key") => return RepoError::DuplicateSlug,
            Some("posts_author_id_fkey") if db.is_foreign_key_violation() => {
                return RepoError::UnknownAuthor;
            }
            _ => {}
        }
    }
    RepoError::Database(err)
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// All queries are built at runtime; every value goes through a bind parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_profile(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, name, password, role, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserWithProfile>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let Some(user) = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let profile = self.fetch_profile(id).await?;
        Ok(Some(UserWithProfile { user, profile }))
    }

    /// get_user_detail
    ///
    /// The user, their profile, and a newest-first summary of every post they authored.
    async fn get_user_detail(&self, id: Uuid) -> RepoResult<Option<UserDetail>> {
        let Some(UserWithProfile { user, profile }) = self.get_user(id).await? else {
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, PostSummary>(
            r#"SELECT id, title, slug, published, created_at
               FROM posts
               WHERE author_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(UserDetail {
            user,
            profile,
            posts,
        }))
    }

    async fn list_users(&self) -> RepoResult<Vec<UserListItem>> {
        let rows = sqlx::query_as::<_, UserCountRow>(
            r#"SELECT u.id, u.email, u.name, u.role, u.created_at, u.updated_at,
                      (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS post_count
               FROM users u
               ORDER BY u.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.user.id).collect();
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ANY($1)");
        let mut profiles: HashMap<Uuid, Profile> = sqlx::query_as::<_, Profile>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|profile| (profile.user_id, profile))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| UserListItem {
                profile: profiles.remove(&row.user.id),
                user: row.user,
                post_count: row.post_count,
            })
            .collect())
    }

    /// create_user
    ///
    /// User and profile rows are inserted in one transaction, so a user never
    /// exists without its profile.
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (id, email, name, password, role) VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.password_hash)
            .bind(new_user.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;

        sqlx::query("INSERT INTO profiles (id, user_id, bio) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(&new_user.bio)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// update_user
    ///
    /// Uses COALESCE so that only the provided fields change. A demotion locks
    /// every admin row first, so two racing demotions cannot both pass the count.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<UserWithProfile> {
        let mut tx = self.pool.begin().await?;

        if matches!(changes.role, Some(role) if !role.is_admin()) {
            let admins: Vec<Uuid> = sqlx::query_scalar(
                "SELECT id FROM users WHERE role = 'ADMIN' ORDER BY id FOR UPDATE",
            )
            .fetch_all(&mut *tx)
            .await?;

            if admins.len() <= 1 && admins.contains(&id) {
                return Err(RepoError::LastAdmin);
            }
        }

        let result = sqlx::query(
            r#"UPDATE users SET
                   name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   role = COALESCE($4, role),
                   password = COALESCE($5, password),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(changes.role)
        .bind(&changes.password_hash)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        if let Some(bio) = &changes.bio {
            sqlx::query(
                r#"INSERT INTO profiles (id, user_id, bio) VALUES ($1, $2, $3)
                   ON CONFLICT (user_id) DO UPDATE SET bio = EXCLUDED.bio, updated_at = NOW()"#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(bio)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_user(id).await?.ok_or(RepoError::NotFound)
    }

    /// delete_user
    ///
    /// One transaction: lock all admin rows (stable order), lock the target,
    /// check the admin count and the authored posts, then delete. The profile
    /// goes with the user through ON DELETE CASCADE.
    async fn delete_user(&self, id: Uuid) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let admins: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = 'ADMIN' ORDER BY id FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;

        let target: Option<crate::models::Role> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(role) = target else {
            return Err(RepoError::NotFound);
        };

        if role.is_admin() && admins.len() <= 1 {
            return Err(RepoError::LastAdmin);
        }

        let post_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if post_count > 0 {
            return Err(RepoError::HasPosts(post_count));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    RepoError::HasPosts(1)
                }
                _ => RepoError::Database(e),
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> RepoResult<UserWithProfile> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET name = COALESCE($2, name), updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(&changes.name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query(
            r#"INSERT INTO profiles (id, user_id, bio, location, job_title, company, website,
                                     twitter_handle, github_handle, linkedin_handle, avatar_url)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT (user_id) DO UPDATE SET
                   bio = COALESCE(EXCLUDED.bio, profiles.bio),
                   location = COALESCE(EXCLUDED.location, profiles.location),
                   job_title = COALESCE(EXCLUDED.job_title, profiles.job_title),
                   company = COALESCE(EXCLUDED.company, profiles.company),
                   website = COALESCE(EXCLUDED.website, profiles.website),
                   twitter_handle = COALESCE(EXCLUDED.twitter_handle, profiles.twitter_handle),
                   github_handle = COALESCE(EXCLUDED.github_handle, profiles.github_handle),
                   linkedin_handle = COALESCE(EXCLUDED.linkedin_handle, profiles.linkedin_handle),
                   avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                   updated_at = NOW()"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&changes.bio)
        .bind(&changes.location)
        .bind(&changes.job_title)
        .bind(&changes.company)
        .bind(&changes.website)
        .bind(&changes.twitter_handle)
        .bind(&changes.github_handle)
        .bind(&changes.linkedin_handle)
        .bind(&changes.avatar_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_user(user_id).await?.ok_or(RepoError::NotFound)
    }

    async fn list_posts(&self) -> RepoResult<Vec<PostWithAuthor>> {
        let sql = format!("{POST_WITH_AUTHOR_SELECT} ORDER BY p.created_at DESC");
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PostWithAuthor::from).collect())
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostWithAuthor>> {
        let sql = format!("{POST_WITH_AUTHOR_SELECT} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PostWithAuthor::from))
    }

    async fn create_post(&self, new_post: NewPost) -> RepoResult<PostWithAuthor> {
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO posts (id, title, slug, content, published, author_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_post.title)
        .bind(&new_post.slug)
        .bind(&new_post.content)
        .bind(new_post.published)
        .bind(new_post.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        self.get_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<PostWithAuthor> {
        let result = sqlx::query(
            r#"UPDATE posts SET
                   title = COALESCE($2, title),
                   slug = COALESCE($3, slug),
                   content = COALESCE($4, content),
                   published = COALESCE($5, published),
                   author_id = COALESCE($6, author_id),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.slug)
        .bind(&changes.content)
        .bind(changes.published)
        .bind(changes.author_id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.get_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// list_published_posts
    ///
    /// **Security**: Strictly enforces `WHERE p.published = true`.
    async fn list_published_posts(&self) -> RepoResult<Vec<PublicPost>> {
        let rows = sqlx::query_as::<_, PublicPostRow>(
            r#"SELECT p.id, p.title, p.slug, p.content, p.created_at, p.updated_at,
                      u.id AS author_id, u.name AS author_name, NULL::TEXT AS author_bio
               FROM posts p
               JOIN users u ON u.id = p.author_id
               WHERE p.published = true
               ORDER BY p.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PublicPost::from).collect())
    }

    async fn get_published_post(&self, slug: &str) -> RepoResult<Option<PublicPost>> {
        let row = sqlx::query_as::<_, PublicPostRow>(
            r#"SELECT p.id, p.title, p.slug, p.content, p.created_at, p.updated_at,
                      u.id AS author_id, u.name AS author_name, pr.bio AS author_bio
               FROM posts p
               JOIN users u ON u.id = p.author_id
               LEFT JOIN profiles pr ON pr.user_id = u.id
               WHERE p.slug = $1 AND p.published = true"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PublicPost::from))
    }

    /// get_or_create_settings
    ///
    /// The primary key makes the insert idempotent: concurrent first readers
    /// all converge on the same row.
    async fn get_or_create_settings(&self) -> RepoResult<SiteSettings> {
        sqlx::query(
            "INSERT INTO site_settings (id, logo_text) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(SITE_SETTINGS_ID)
        .bind(DEFAULT_LOGO_TEXT)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM site_settings WHERE id = $1");
        let settings = sqlx::query_as::<_, SiteSettings>(&sql)
            .bind(SITE_SETTINGS_ID)
            .fetch_one(&self.pool)
            .await?;
        Ok(settings)
    }

    async fn update_settings(
        &self,
        logo_text: String,
        remove_image: bool,
    ) -> RepoResult<SiteSettings> {
        let sql = format!(
            r#"INSERT INTO site_settings (id, logo_text) VALUES ($1, $2)
               ON CONFLICT (id) DO UPDATE SET
                   logo_text = EXCLUDED.logo_text,
                   logo_image = CASE WHEN $3 THEN NULL ELSE site_settings.logo_image END,
                   logo_mime_type = CASE WHEN $3 THEN NULL ELSE site_settings.logo_mime_type END,
                   updated_at = NOW()
               RETURNING {SETTINGS_COLUMNS}"#
        );
        let settings = sqlx::query_as::<_, SiteSettings>(&sql)
            .bind(SITE_SETTINGS_ID)
            .bind(&logo_text)
            .bind(remove_image)
            .fetch_one(&self.pool)
            .await?;
        Ok(settings)
    }

    async fn store_logo_image(&self, bytes: Vec<u8>, mime_type: String) -> RepoResult<()> {
        sqlx::query(
            r#"INSERT INTO site_settings (id, logo_text, logo_image, logo_mime_type)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (id) DO UPDATE SET
                   logo_image = EXCLUDED.logo_image,
                   logo_mime_type = EXCLUDED.logo_mime_type,
                   updated_at = NOW()"#,
        )
        .bind(SITE_SETTINGS_ID)
        .bind(DEFAULT_LOGO_TEXT)
        .bind(&bytes)
        .bind(&mime_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_logo_image(&self) -> RepoResult<Option<LogoImage>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> = sqlx::query_as(
            "SELECT logo_image, logo_mime_type FROM site_settings WHERE id = $1",
        )
        .bind(SITE_SETTINGS_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((Some(bytes), Some(mime_type))) => Some(LogoImage { bytes, mime_type }),
            _ => None,
        })
    }
}

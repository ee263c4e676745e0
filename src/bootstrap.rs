use crate::{
    config::AppConfig,
    error::ApiError,
    models::{NewUser, Role},
    password,
    repository::Repository,
};

const DEFAULT_ADMIN_NAME: &str = "Admin";
const ADMIN_BIO: &str = "System administrator";

/// seed_admin
///
/// Creates the first administrator from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when
/// no account holds that email yet. Returns whether a user was created.
/// Startup never fails because of it: the caller logs the error and moves on.
pub async fn seed_admin(repo: &dyn Repository, config: &AppConfig) -> Result<bool, ApiError> {
    let Some(seed) = &config.admin_seed else {
        return Ok(false);
    };

    if repo.find_user_by_email(&seed.email).await?.is_some() {
        tracing::debug!("admin seed skipped, account already exists");
        return Ok(false);
    }

    let password_hash = password::hash_password(seed.password.clone(), config.bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            email: seed.email.clone(),
            name: Some(
                seed.name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            ),
            password_hash,
            role: Role::Admin,
            bio: Some(ADMIN_BIO.to_string()),
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "seeded administrator account");
    Ok(true)
}

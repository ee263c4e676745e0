use crate::error::ApiError;

// bcrypt is CPU-bound: both calls run on the blocking pool.

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::Internal
        })
}

/// Constant-time comparison of `password` against a stored bcrypt hash.
/// A malformed hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

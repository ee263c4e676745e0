use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::ErrorBody;
use crate::repository::RepoError;

/// ApiError
///
/// The error taxonomy of the HTTP surface. Every handler returns
/// `Result<_, ApiError>`, and every variant renders as `{"error": "..."}` with
/// its status code. Unexpected failures are logged where they are converted
/// and always answer with the generic `Internal` message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid token, or a role that does not grant access.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// The operation would leave the system without an ADMIN user.
    #[error("Cannot {0} the last admin user")]
    LastAdminProtection(&'static str),

    #[error("Only image files are allowed")]
    InvalidFileType,

    #[error("File exceeds the {0} byte limit")]
    FileTooLarge(usize),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_)
            | ApiError::LastAdminProtection(_)
            | ApiError::InvalidFileType => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Default mapping for store outcomes. Handlers that can phrase a domain
/// outcome more precisely (e.g. which entity was not found) match on
/// `RepoError` before falling back to this conversion.
impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ApiError::NotFound("Resource"),
            RepoError::DuplicateEmail => {
                ApiError::Conflict("User with this email already exists".to_string())
            }
            RepoError::DuplicateSlug => {
                ApiError::Conflict("A post with this slug already exists".to_string())
            }
            RepoError::UnknownAuthor => ApiError::validation("Author does not exist"),
            RepoError::LastAdmin => ApiError::LastAdminProtection("remove"),
            RepoError::HasPosts(count) => ApiError::Conflict(format!(
                "User still has {} post(s); reassign or delete them first",
                count
            )),
            RepoError::Database(e) => {
                tracing::error!("store error: {:?}", e);
                ApiError::Internal
            }
        }
    }
}

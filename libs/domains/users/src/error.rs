use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::validators::BIO_MAX_LEN;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Nickname already exists: {0}")]
    DuplicateNickname(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked")]
    AccountLocked,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Bio exceeds maximum length of {BIO_MAX_LEN} characters.")]
    BioTooLong,

    #[error("Invalid profile picture URL")]
    InvalidProfilePicture,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Could not generate an unused nickname")]
    NicknameExhausted,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DuplicateEmail(_) => {
                AppError::BadRequest("Email already exists".to_string())
            }
            UserError::DuplicateNickname(_) => {
                AppError::BadRequest("Nickname already exists".to_string())
            }
            UserError::InvalidCredentials => {
                AppError::Unauthorized("Incorrect email or password.".to_string())
            }
            UserError::AccountLocked => AppError::BadRequest(
                "Account locked due to too many failed login attempts.".to_string(),
            ),
            UserError::Validation(msg) => AppError::UnprocessableEntity(msg),
            err @ UserError::BioTooLong => AppError::UnprocessableEntity(err.to_string()),
            UserError::InvalidProfilePicture => AppError::BadRequest(
                "Invalid profile picture URL or other update issues.".to_string(),
            ),
            UserError::InvalidVerificationToken => {
                AppError::BadRequest("Invalid or expired verification token".to_string())
            }
            UserError::Database(e) => AppError::Database(e),
            err @ (UserError::NicknameExhausted
            | UserError::PasswordHash(_)
            | UserError::Token(_)
            | UserError::Internal(_)) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

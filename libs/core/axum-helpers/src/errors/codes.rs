//! Stable error codes carried in every error response.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error identifiers: a string for clients, an integer for dashboards and
/// a default message for when the caller has nothing more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000s)
    ValidationError,
    InvalidUuid,
    InvalidJson,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    UnprocessableEntity,

    // Server errors
    InternalError,

    // Database errors (2000s)
    DatabaseError,
    DatabaseNotFound,
    DatabaseUnavailable,

    // Migration errors (3000s)
    MigrationError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::InvalidJson => "INVALID_JSON",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest => "BAD_REQUEST",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::InternalError => "INTERNAL_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DatabaseNotFound => "DATABASE_NOT_FOUND",
            Self::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
            Self::MigrationError => "MIGRATION_ERROR",
        }
    }

    pub const fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::InvalidJson => 1003,
            Self::NotFound => 1004,
            Self::Unauthorized => 1005,
            Self::Forbidden => 1006,
            Self::BadRequest => 1007,
            Self::UnprocessableEntity => 1009,
            Self::InternalError => 1010,
            Self::DatabaseError => 2001,
            Self::DatabaseNotFound => 2002,
            Self::DatabaseUnavailable => 2003,
            Self::MigrationError => 3001,
        }
    }

    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::InvalidJson => "Invalid request body",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Operation not permitted",
            Self::BadRequest => "Bad request",
            Self::UnprocessableEntity => "Request cannot be processed",
            Self::InternalError => "An unexpected error occurred.",
            Self::DatabaseError => "An unexpected error occurred.",
            Self::DatabaseNotFound => "Database record not found",
            Self::DatabaseUnavailable => "Database is temporarily unavailable",
            Self::MigrationError => "An unexpected error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_integer_codes() {
        assert_eq!(ErrorCode::ValidationError.code(), 1001);
        assert_eq!(ErrorCode::UnprocessableEntity.code(), 1009);
        assert_eq!(ErrorCode::DatabaseError.code(), 2001);
        assert_eq!(ErrorCode::MigrationError.code(), 3001);
    }

    #[test]
    fn test_server_errors_share_generic_message() {
        for code in [
            ErrorCode::InternalError,
            ErrorCode::DatabaseError,
            ErrorCode::MigrationError,
        ] {
            assert_eq!(code.default_message(), "An unexpected error occurred.");
        }
    }

    #[test]
    fn test_error_code_serialization_matches_as_str() {
        let json = serde_json::to_string(&ErrorCode::UnprocessableEntity).unwrap();
        assert_eq!(json, "\"UNPROCESSABLE_ENTITY\"");
        assert_eq!(ErrorCode::UnprocessableEntity.to_string(), "UNPROCESSABLE_ENTITY");
    }
}

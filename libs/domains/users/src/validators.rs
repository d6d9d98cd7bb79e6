//! Field rules shared by the request DTOs and the service layer.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::{ValidateUrl, ValidationError};

pub const NICKNAME_MIN_LEN: usize = 3;
pub const NICKNAME_MAX_LEN: usize = 50;
pub const BIO_MAX_LEN: usize = 500;
pub const URL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

static NICKNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Letters, digits, `_` and `-` only.
pub fn is_valid_nickname(nickname: &str) -> bool {
    (NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&nickname.chars().count())
        && NICKNAME_REGEX.is_match(nickname)
}

pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if is_valid_nickname(nickname) {
        Ok(())
    } else {
        Err(error(
            "nickname",
            "Nickname must be 3-50 characters of letters, digits, underscores or hyphens",
        ))
    }
}

/// 8-128 characters with at least one uppercase, lowercase, digit and
/// special character.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(error(
            "password_length",
            "Password must be at least 8 characters",
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(error(
            "password_length",
            "Password must be at most 128 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(error(
            "password_uppercase",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(error(
            "password_lowercase",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(error(
            "password_digit",
            "Password must contain at least one digit",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        return Err(error(
            "password_special",
            "Password must contain at least one special character",
        ));
    }
    Ok(())
}

/// Absolute http(s) URL with a host, at most 255 characters.
pub fn is_valid_profile_url(url: &str) -> bool {
    url.len() <= URL_MAX_LEN
        && (url.starts_with("http://") || url.starts_with("https://"))
        && url.validate_url()
}

pub fn validate_profile_url(url: &str) -> Result<(), ValidationError> {
    if is_valid_profile_url(url) {
        Ok(())
    } else {
        Err(error("url", "Must be a valid http or https URL"))
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::pagination::PaginationLinks;
use crate::validators::{validate_nickname, validate_password, validate_profile_url};

/// Access tier, ordered from least to most privileged.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "ANONYMOUS")]
    Anonymous,
    #[sea_orm(string_value = "AUTHENTICATED")]
    Authenticated,
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

/// A user account as the domain sees it. Never serialized directly; API
/// responses go through [`UserResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub nickname: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub role: Role,
    pub is_professional: bool,
    pub professional_status_updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verification_token: Option<String>,
    pub email_verified: bool,
    pub hashed_password: String,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn lock_account(&mut self) {
        self.is_locked = true;
    }

    /// Clears the lock and the failed-attempt counter.
    pub fn unlock_account(&mut self) {
        self.is_locked = false;
        self.failed_login_attempts = 0;
    }

    pub fn verify_email(&mut self) {
        self.email_verified = true;
        self.verification_token = None;
    }

    /// Sets the professional flag, stamping the change time only when the
    /// value actually changes.
    pub fn set_professional_status(&mut self, is_professional: bool) {
        if self.is_professional != is_professional {
            self.is_professional = is_professional;
            self.professional_status_updated_at = Some(Utc::now());
        }
    }

    pub fn apply_update(&mut self, update: UpdateUser) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(nickname) = update.nickname {
            self.nickname = nickname;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(url) = update.profile_picture_url {
            self.profile_picture_url = Some(url);
        }
        if let Some(url) = update.linkedin_profile_url {
            self.linkedin_profile_url = Some(url);
        }
        if let Some(url) = update.github_profile_url {
            self.github_profile_url = Some(url);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User {}, Role: {}>", self.nickname, self.role)
    }
}

/// Repository input for a new row. Role, verification state and token are
/// final for every user except the very first one, which the store promotes
/// to a verified admin.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub nickname: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub role: Role,
    pub verification_token: Option<String>,
    pub hashed_password: String,
}

/// Public representation of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub nickname: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub role: Role,
    pub is_professional: bool,
    pub professional_status_updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub is_locked: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture_url: user.profile_picture_url,
            linkedin_profile_url: user.linkedin_profile_url,
            github_profile_url: user.github_profile_url,
            role: user.role,
            is_professional: user.is_professional,
            professional_status_updated_at: user.professional_status_updated_at,
            last_login_at: user.last_login_at,
            failed_login_attempts: user.failed_login_attempts,
            is_locked: user.is_locked,
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Administrative creation. A missing nickname is generated.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email, length(max = 255))]
    #[schema(example = "john.doe@example.com")]
    pub email: String,

    #[validate(custom(function = "validate_nickname"))]
    #[schema(example = "john_doe123")]
    pub nickname: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub profile_picture_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub linkedin_profile_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub github_profile_url: Option<String>,

    #[validate(custom(function = "validate_password"))]
    #[schema(example = "Secure*1234")]
    pub password: String,

    /// Defaults to `AUTHENTICATED`.
    pub role: Option<Role>,
}

/// Self-service registration. Same fields as [`CreateUser`] minus the role.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email, length(max = 255))]
    #[schema(example = "john.doe@example.com")]
    pub email: String,

    #[validate(custom(function = "validate_nickname"))]
    pub nickname: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub profile_picture_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub linkedin_profile_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub github_profile_url: Option<String>,

    #[validate(custom(function = "validate_password"))]
    #[schema(example = "Secure*1234")]
    pub password: String,
}

impl From<RegisterUser> for CreateUser {
    fn from(input: RegisterUser) -> Self {
        Self {
            email: input.email,
            nickname: input.nickname,
            first_name: input.first_name,
            last_name: input.last_name,
            bio: input.bio,
            profile_picture_url: input.profile_picture_url,
            linkedin_profile_url: input.linkedin_profile_url,
            github_profile_url: input.github_profile_url,
            password: input.password,
            role: None,
        }
    }
}

/// Partial update. Bio length is checked by the service so that its
/// dedicated message reaches the client.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(email, length(max = 255))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_nickname"))]
    pub nickname: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub profile_picture_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub linkedin_profile_url: Option<String>,

    #[validate(custom(function = "validate_profile_url"))]
    pub github_profile_url: Option<String>,

    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBio {
    pub bio: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfilePicture {
    pub profile_picture_url: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfessionalStatus {
    pub is_professional: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPassword {
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

/// OAuth2 password-flow form. `username` is an email or a nickname.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Query parameters for `GET /users`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchParams {
    #[serde(default)]
    #[validate(range(max = MAX_SKIP))]
    pub skip: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    /// Case-insensitive nickname substring
    pub username: Option<String>,
    pub role: Option<Role>,
    /// Matches the email-verified flag
    pub account_status: Option<bool>,
    pub registration_date_start: Option<DateTime<Utc>>,
    pub registration_date_end: Option<DateTime<Utc>>,
    /// Case-insensitive exact email
    pub email: Option<String>,
}

/// Largest offset the database accepts.
pub const MAX_SKIP: u64 = i64::MAX as u64;

fn default_limit() -> u64 {
    10
}

impl Default for UserSearchParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            username: None,
            role: None,
            account_status: None,
            registration_date_start: None,
            registration_date_end: None,
            email: None,
        }
    }
}

impl UserSearchParams {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            username: non_blank(&self.username),
            role: self.role,
            email_verified: self.account_status,
            created_after: self.registration_date_start,
            created_before: self.registration_date_end,
            email: non_blank(&self.email),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Filters combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub email_verified: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(ref username) = self.username {
            if !user
                .nickname
                .to_lowercase()
                .contains(&username.to_lowercase())
            {
                return false;
            }
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(verified) = self.email_verified {
            if user.email_verified != verified {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if user.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if user.created_at > before {
                return false;
            }
        }
        if let Some(ref email) = self.email {
            if !user.email.eq_ignore_ascii_case(email) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
    pub links: PaginationLinks,
}

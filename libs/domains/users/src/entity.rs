use crate::models::{Role, User};
use sea_orm::entity::prelude::*;

/// Sea-ORM entity for the `users` table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    pub professional_status_updated_at: Option<DateTimeWithTimeZone>,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    pub failed_login_attempts: i32,
    pub is_locked: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub verification_token: Option<String>,
    pub email_verified: bool,
    pub hashed_password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            nickname: model.nickname,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            bio: model.bio,
            profile_picture_url: model.profile_picture_url,
            linkedin_profile_url: model.linkedin_profile_url,
            github_profile_url: model.github_profile_url,
            role: model.role,
            is_professional: model.is_professional,
            professional_status_updated_at: model.professional_status_updated_at.map(Into::into),
            last_login_at: model.last_login_at.map(Into::into),
            failed_login_attempts: model.failed_login_attempts,
            is_locked: model.is_locked,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            verification_token: model.verification_token,
            email_verified: model.email_verified,
            hashed_password: model.hashed_password,
        }
    }
}

/// Profile columns only. Login bookkeeping, credentials and verification
/// state are left `NotSet` so a stale read can never overwrite them; those
/// columns change through their own repository operations.
impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        use sea_orm::ActiveValue::{NotSet, Set};

        ActiveModel {
            id: Set(user.id),
            nickname: Set(user.nickname.clone()),
            email: Set(user.email.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            bio: Set(user.bio.clone()),
            profile_picture_url: Set(user.profile_picture_url.clone()),
            linkedin_profile_url: Set(user.linkedin_profile_url.clone()),
            github_profile_url: Set(user.github_profile_url.clone()),
            role: Set(user.role),
            is_professional: Set(user.is_professional),
            professional_status_updated_at: Set(user.professional_status_updated_at.map(Into::into)),
            last_login_at: NotSet,
            failed_login_attempts: NotSet,
            is_locked: NotSet,
            created_at: NotSet,
            updated_at: Set(user.updated_at.into()),
            verification_token: NotSet,
            email_verified: NotSet,
            hashed_password: NotSet,
        }
    }
}

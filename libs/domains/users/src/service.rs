use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum_helpers::JwtAuth;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or_default};
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::{UserError, UserResult};
use crate::models::{
    CreateUser, NewUser, RegisterUser, Role, UpdateUser, User, UserFilter, UserSearchParams,
};
use crate::nickname::generate_nickname;
use crate::notifier::{TracingNotifier, VerificationNotifier};
use crate::repository::UserRepository;
use crate::validators::{BIO_MAX_LEN, is_valid_profile_url};

pub const DEFAULT_MAX_LOGIN_ATTEMPTS: i32 = 3;
const NICKNAME_ATTEMPTS: usize = 10;
const VERIFICATION_TOKEN_LEN: usize = 32;
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Business-rule settings.
///
/// - `MAX_LOGIN_ATTEMPTS` (default 3)
/// - `SERVER_BASE_URL` (default `http://localhost:8080`), prefix of verification links
#[derive(Clone, Debug)]
pub struct UserServiceConfig {
    pub max_login_attempts: i32,
    pub base_url: String,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl FromEnv for UserServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_login_attempts =
            env_parse_or_default("MAX_LOGIN_ATTEMPTS", DEFAULT_MAX_LOGIN_ATTEMPTS)?;
        if max_login_attempts < 1 {
            return Err(ConfigError::ParseError {
                key: "MAX_LOGIN_ATTEMPTS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        let base_url = env_or_default("SERVER_BASE_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            max_login_attempts,
            base_url,
        })
    }
}

/// Service layer for User business logic
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    notifier: Arc<dyn VerificationNotifier>,
    jwt: JwtAuth,
    config: UserServiceConfig,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, jwt: JwtAuth, config: UserServiceConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            notifier: Arc::new(TracingNotifier),
            jwt,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: impl VerificationNotifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn config(&self) -> &UserServiceConfig {
        &self.config
    }

    pub fn jwt(&self) -> &JwtAuth {
        &self.jwt
    }

    /// Self-service registration.
    pub async fn register(&self, input: RegisterUser) -> UserResult<User> {
        self.create_user(input.into()).await
    }

    /// Validates, checks uniqueness, hashes the password and stores the user.
    /// Unverified users are sent a verification link.
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        input.validate().map_err(validation_error)?;

        if self.repository.get_by_email(&input.email).await?.is_some() {
            return Err(UserError::DuplicateEmail(input.email));
        }

        let nickname = match input.nickname {
            Some(nickname) => {
                if self.repository.get_by_nickname(&nickname).await?.is_some() {
                    return Err(UserError::DuplicateNickname(nickname));
                }
                nickname
            }
            None => self.unused_nickname().await?,
        };

        let new_user = NewUser {
            nickname,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            bio: input.bio,
            profile_picture_url: input.profile_picture_url,
            linkedin_profile_url: input.linkedin_profile_url,
            github_profile_url: input.github_profile_url,
            role: input.role.unwrap_or(Role::Authenticated),
            verification_token: Some(generate_verification_token()),
            hashed_password: hash_password(&input.password)?,
        };

        let user = self.repository.create(new_user).await?;

        if let Some(token) = user.verification_token.as_deref().filter(|_| !user.email_verified) {
            let link = self.verification_link(user.id, token);
            if let Err(e) = self.notifier.send_verification(&user, &link).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to send verification email");
            }
        }

        Ok(user)
    }

    /// Like [`create_user`](Self::create_user) but reports policy failures
    /// and duplicates as `None`.
    pub async fn create(&self, input: CreateUser) -> UserResult<Option<User>> {
        match self.create_user(input).await {
            Ok(user) => Ok(Some(user)),
            Err(
                e @ (UserError::Validation(_)
                | UserError::DuplicateEmail(_)
                | UserError::DuplicateNickname(_)),
            ) => {
                tracing::info!(error = %e, "User creation rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn unused_nickname(&self) -> UserResult<String> {
        for _ in 0..NICKNAME_ATTEMPTS {
            let candidate = generate_nickname();
            if self.repository.get_by_nickname(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(UserError::NicknameExhausted)
    }

    /// Partial update. `Ok(None)` when the user does not exist.
    pub async fn update(&self, id: Uuid, input: UpdateUser) -> UserResult<Option<User>> {
        input.validate().map_err(validation_error)?;
        if let Some(ref bio) = input.bio {
            check_bio(bio)?;
        }

        let Some(mut user) = self.repository.get_by_id(id).await? else {
            return Ok(None);
        };

        if let Some(ref nickname) = input.nickname {
            if let Some(other) = self.repository.get_by_nickname(nickname).await? {
                if other.id != id {
                    return Err(UserError::DuplicateNickname(nickname.clone()));
                }
            }
        }
        if let Some(ref email) = input.email {
            if let Some(other) = self.repository.get_by_email(email).await? {
                if other.id != id {
                    return Err(UserError::DuplicateEmail(email.clone()));
                }
            }
        }

        user.apply_update(input);
        self.repository.update(user).await
    }

    pub async fn update_bio(&self, id: Uuid, bio: String) -> UserResult<Option<User>> {
        check_bio(&bio)?;

        self.update(
            id,
            UpdateUser {
                bio: Some(bio),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_profile_picture(&self, id: Uuid, url: String) -> UserResult<Option<User>> {
        if !is_valid_profile_url(&url) {
            return Err(UserError::InvalidProfilePicture);
        }

        self.update(
            id,
            UpdateUser {
                profile_picture_url: Some(url),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_professional_status(
        &self,
        id: Uuid,
        is_professional: bool,
    ) -> UserResult<Option<User>> {
        self.modify(id, |user| user.set_professional_status(is_professional))
            .await
    }

    pub async fn delete(&self, id: Uuid) -> UserResult<bool> {
        self.repository.delete(id).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        self.repository.get_by_id(id).await
    }

    pub async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>> {
        self.repository.get_by_nickname(nickname).await
    }

    pub async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.repository.get_by_email(email).await
    }

    /// Matching page plus the total number of matches.
    pub async fn search(&self, params: &UserSearchParams) -> UserResult<(Vec<User>, u64)> {
        self.repository
            .search(params.filter(), params.skip, params.limit)
            .await
    }

    pub async fn list(&self, skip: u64, limit: u64) -> UserResult<(Vec<User>, u64)> {
        self.repository
            .search(UserFilter::default(), skip, limit)
            .await
    }

    /// Checks credentials and does the lockout bookkeeping.
    ///
    /// `identifier` is an email when it contains `@`, otherwise a nickname.
    /// Returns `Ok(None)` for unknown users and wrong passwords and
    /// [`UserError::AccountLocked`] for locked accounts, even with the right
    /// password.
    pub async fn login(&self, identifier: &str, password: &str) -> UserResult<Option<User>> {
        let Some(user) = self.find_by_identifier(identifier).await? else {
            return Ok(None);
        };

        if user.is_locked {
            return Err(UserError::AccountLocked);
        }

        if verify_password(password, &user.hashed_password)? {
            return self.repository.record_successful_login(user.id).await;
        }

        let updated = self
            .repository
            .record_failed_login(user.id, self.config.max_login_attempts)
            .await?;

        if let Some(ref u) = updated {
            if u.is_locked {
                tracing::warn!(
                    user_id = %u.id,
                    attempts = u.failed_login_attempts,
                    "Account locked after repeated failed logins"
                );
            }
        }

        Ok(None)
    }

    /// [`login`](Self::login) with a wrong password or unknown user turned
    /// into [`UserError::InvalidCredentials`].
    pub async fn authenticate(&self, identifier: &str, password: &str) -> UserResult<User> {
        self.login(identifier, password)
            .await?
            .ok_or(UserError::InvalidCredentials)
    }

    pub async fn is_account_locked(&self, identifier: &str) -> UserResult<bool> {
        Ok(self
            .find_by_identifier(identifier)
            .await?
            .is_some_and(|u| u.is_locked))
    }

    async fn find_by_identifier(&self, identifier: &str) -> UserResult<Option<User>> {
        if identifier.contains('@') {
            self.repository.get_by_email(identifier).await
        } else {
            self.repository.get_by_nickname(identifier).await
        }
    }

    pub async fn lock_account(&self, id: Uuid) -> UserResult<Option<User>> {
        self.repository.set_locked(id, true).await
    }

    pub async fn unlock_account(&self, id: Uuid) -> UserResult<Option<User>> {
        self.repository.set_locked(id, false).await
    }

    /// Re-hashes the password and clears any lockout. `false` when the user
    /// does not exist.
    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> UserResult<bool> {
        crate::validators::validate_password(new_password).map_err(|e| {
            UserError::Validation(
                e.message
                    .map(|m| m.into_owned())
                    .unwrap_or_else(|| "Invalid password".to_string()),
            )
        })?;
        let hashed = hash_password(new_password)?;

        Ok(self.repository.set_password(id, &hashed).await?.is_some())
    }

    /// Marks the email verified when `token` matches the stored one exactly.
    /// Anonymous users are promoted to authenticated.
    pub async fn verify_email_with_token(&self, id: Uuid, token: &str) -> UserResult<bool> {
        Ok(self.repository.verify_email(id, token).await?.is_some())
    }

    /// Signed access token for `user`.
    pub fn issue_token(&self, user: &User) -> UserResult<String> {
        self.jwt
            .create_access_token(user.id, &user.email, &user.nickname, &user.role.to_string())
            .map_err(|e| UserError::Token(e.to_string()))
    }

    pub fn verification_link(&self, id: Uuid, token: &str) -> String {
        format!("{}/api/verify-email/{}/{}", self.config.base_url, id, token)
    }

    async fn modify(&self, id: Uuid, f: impl FnOnce(&mut User)) -> UserResult<Option<User>> {
        let Some(mut user) = self.repository.get_by_id(id).await? else {
            return Ok(None);
        };

        f(&mut user);
        user.updated_at = chrono::Utc::now();
        self.repository.update(user).await
    }
}

fn check_bio(bio: &str) -> UserResult<()> {
    if bio.chars().count() > BIO_MAX_LEN {
        return Err(UserError::BioTooLong);
    }
    Ok(())
}

fn validation_error(errors: ValidationErrors) -> UserError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: invalid ({})", e.code),
            })
        })
        .collect();
    messages.sort();
    UserError::Validation(messages.join("; "))
}

fn generate_verification_token() -> String {
    (0..VERIFICATION_TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rand::random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

// Password helpers

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MockVerificationNotifier;
    use crate::repository::{InMemoryUserRepository, MockUserRepository};
    use axum_helpers::JwtConfig;
    use sea_orm::DbErr;

    const PASSWORD: &str = "Sup3r$ecret!";

    fn jwt() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("service-test-secret-that-is-long-enough"))
    }

    fn service() -> UserService<InMemoryUserRepository> {
        UserService::new(InMemoryUserRepository::new(), jwt(), UserServiceConfig::default())
    }

    fn input(nickname: &str) -> CreateUser {
        CreateUser {
            email: format!("{nickname}@example.com"),
            nickname: Some(nickname.to_string()),
            password: PASSWORD.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_user_is_admin_then_authenticated() {
        let service = service();

        let first = service.create_user(input("first")).await.unwrap();
        assert_eq!(first.role, Role::Admin);
        assert!(first.email_verified);

        let second = service.create_user(input("second")).await.unwrap();
        assert_eq!(second.role, Role::Authenticated);
        assert!(!second.email_verified);
        assert_eq!(second.verification_token.as_ref().map(String::len), Some(32));
    }

    #[tokio::test]
    async fn test_create_persists_input_verbatim() {
        let service = service();
        let user = service.create_user(input("john_doe")).await.unwrap();

        assert_eq!(user.email, "john_doe@example.com");
        assert_eq!(user.nickname, "john_doe");
        assert_ne!(user.hashed_password, PASSWORD);
    }

    #[tokio::test]
    async fn test_missing_nickname_is_generated() {
        let service = service();
        let user = service
            .create_user(CreateUser {
                nickname: None,
                ..input("ignored")
            })
            .await
            .unwrap();

        assert!(crate::validators::is_valid_nickname(&user.nickname));
        assert_eq!(user.nickname.split('-').count(), 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected() {
        let service = service();
        service.create_user(input("john")).await.unwrap();

        let same_email = CreateUser {
            nickname: Some("other".to_string()),
            ..input("john")
        };
        assert!(matches!(
            service.create_user(same_email.clone()).await,
            Err(UserError::DuplicateEmail(_))
        ));
        assert_eq!(service.create(same_email).await.unwrap(), None);

        let same_nickname = CreateUser {
            email: "someone@example.com".to_string(),
            ..input("JOHN")
        };
        assert!(matches!(
            service.create_user(same_nickname).await,
            Err(UserError::DuplicateNickname(_))
        ));
    }

    #[tokio::test]
    async fn test_weak_password_is_rejected_before_persistence() {
        let service = service();
        let weak = CreateUser {
            password: "password".to_string(),
            ..input("john")
        };

        assert!(matches!(
            service.create_user(weak.clone()).await,
            Err(UserError::Validation(_))
        ));
        assert_eq!(service.create(weak).await.unwrap(), None);
        assert_eq!(service.list(0, 10).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_login_lockout_flow() {
        let service = service();
        service.create_user(input("admin")).await.unwrap();
        let user = service.create_user(input("john")).await.unwrap();

        let logged_in = service.login("john@example.com", PASSWORD).await.unwrap();
        assert_eq!(logged_in.map(|u| u.id), Some(user.id));

        for _ in 0..DEFAULT_MAX_LOGIN_ATTEMPTS {
            assert_eq!(service.login("john", "Wr0ng!pass").await.unwrap(), None);
        }
        assert!(service.is_account_locked("john").await.unwrap());

        assert!(matches!(
            service.login("john", PASSWORD).await,
            Err(UserError::AccountLocked)
        ));

        service.unlock_account(user.id).await.unwrap();
        let user = service.login("JOHN", PASSWORD).await.unwrap().unwrap();
        assert_eq!(user.failed_login_attempts, 0);
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_successful_login_resets_counter() {
        let service = service();
        service.create_user(input("john")).await.unwrap();

        service.login("john", "Wr0ng!pass").await.unwrap();
        service.login("john", "Wr0ng!pass").await.unwrap();
        let user = service.login("john", PASSWORD).await.unwrap().unwrap();

        assert_eq!(user.failed_login_attempts, 0);
        assert!(!user.is_locked);
    }

    #[tokio::test]
    async fn test_unknown_user_login_is_none() {
        let service = service();
        assert_eq!(service.login("nobody@example.com", PASSWORD).await.unwrap(), None);
        assert!(matches!(
            service.authenticate("nobody", PASSWORD).await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_surfaces_unexpected_failures() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(|_| Err(UserError::Database(DbErr::Custom("connection reset".into()))));

        let service = UserService::new(repo, jwt(), UserServiceConfig::default());
        let result = service.login("john@example.com", PASSWORD).await;

        assert!(matches!(result, Err(UserError::Database(_))));
    }

    #[tokio::test]
    async fn test_bio_limits() {
        let service = service();
        let user = service.create_user(input("john")).await.unwrap();

        let bio = "a".repeat(BIO_MAX_LEN);
        let updated = service.update_bio(user.id, bio.clone()).await.unwrap().unwrap();
        assert_eq!(updated.bio, Some(bio));

        let err = service
            .update_bio(user.id, "a".repeat(BIO_MAX_LEN + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::BioTooLong));
    }

    #[tokio::test]
    async fn test_update_conflicts_and_missing() {
        let service = service();
        service.create_user(input("alice")).await.unwrap();
        let bob = service.create_user(input("bob")).await.unwrap();

        let err = service
            .update(
                bob.id,
                UpdateUser {
                    nickname: Some("Alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::DuplicateNickname(_)));

        let renamed = service
            .update(
                bob.id,
                UpdateUser {
                    nickname: Some("Bob".to_string()),
                    first_name: Some("Robert".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.nickname, "Bob");
        assert_eq!(renamed.first_name.as_deref(), Some("Robert"));

        let missing = service
            .update(Uuid::now_v7(), UpdateUser::default())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_profile_picture_must_be_http_url() {
        let service = service();
        let user = service.create_user(input("john")).await.unwrap();

        let err = service
            .update_profile_picture(user.id, "not-a-valid-url".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::InvalidProfilePicture));

        let updated = service
            .update_profile_picture(user.id, "https://example.com/me.png".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.profile_picture_url.as_deref(),
            Some("https://example.com/me.png")
        );
    }

    #[tokio::test]
    async fn test_delete_missing_returns_false() {
        let service = service();
        assert!(!service.delete(Uuid::now_v7()).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_email_requires_exact_token() {
        let service = service();
        service.create_user(input("admin")).await.unwrap();
        let user = service.create_user(input("john")).await.unwrap();
        let token = user.verification_token.clone().unwrap();

        assert!(!service.verify_email_with_token(user.id, "wrong").await.unwrap());
        assert!(
            !service
                .verify_email_with_token(Uuid::now_v7(), &token)
                .await
                .unwrap()
        );
        assert!(service.verify_email_with_token(user.id, &token).await.unwrap());

        let verified = service.get_by_id(user.id).await.unwrap().unwrap();
        assert!(verified.email_verified);
        assert_eq!(verified.verification_token, None);

        // Token is single-use.
        assert!(!service.verify_email_with_token(user.id, &token).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_email_promotes_anonymous() {
        let service = service();
        service.create_user(input("admin")).await.unwrap();
        let user = service
            .create_user(CreateUser {
                role: Some(Role::Anonymous),
                ..input("guest")
            })
            .await
            .unwrap();

        let token = user.verification_token.clone().unwrap();
        service.verify_email_with_token(user.id, &token).await.unwrap();

        let user = service.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Authenticated);
    }

    #[tokio::test]
    async fn test_reset_password() {
        let service = service();
        let user = service.create_user(input("john")).await.unwrap();
        service.lock_account(user.id).await.unwrap();

        assert!(matches!(
            service.reset_password(user.id, "weak").await,
            Err(UserError::Validation(_))
        ));
        assert!(!service.reset_password(Uuid::now_v7(), "N3w!Password").await.unwrap());
        assert!(service.reset_password(user.id, "N3w!Password").await.unwrap());

        let user = service.login("john", "N3w!Password").await.unwrap().unwrap();
        assert!(!user.is_locked);
    }

    #[tokio::test]
    async fn test_professional_status() {
        let service = service();
        let user = service.create_user(input("john")).await.unwrap();

        let updated = service
            .set_professional_status(user.id, true)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_professional);
        assert!(updated.professional_status_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_search_filters() {
        let service = service();
        service.create_user(input("admin")).await.unwrap();
        service.create_user(input("john_one")).await.unwrap();
        service.create_user(input("john_two")).await.unwrap();
        service.create_user(input("jane")).await.unwrap();

        let params = UserSearchParams {
            username: Some("JOHN".to_string()),
            ..Default::default()
        };
        let (users, total) = service.search(&params).await.unwrap();
        assert_eq!(total, 2);
        assert!(users.iter().all(|u| u.nickname.contains("john")));

        let params = UserSearchParams {
            role: Some(Role::Admin),
            account_status: Some(true),
            ..Default::default()
        };
        let (users, total) = service.search(&params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(users[0].nickname, "admin");

        let params = UserSearchParams {
            email: Some("JANE@EXAMPLE.COM".to_string()),
            ..Default::default()
        };
        assert_eq!(service.search(&params).await.unwrap().1, 1);

        let (page, total) = service.list(1, 2).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_notifier_receives_verification_link() {
        let mut notifier = MockVerificationNotifier::new();
        notifier
            .expect_send_verification()
            .times(1)
            .withf(|user, link| {
                link.starts_with("http://localhost:8080/api/verify-email/")
                    && link.ends_with(user.verification_token.as_deref().unwrap_or("-"))
            })
            .returning(|_, _| Ok(()));

        let service = service().with_notifier(notifier);
        // The first user is verified on creation and gets no email.
        service.create_user(input("admin")).await.unwrap();
        service.create_user(input("john")).await.unwrap();
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_registration() {
        let mut notifier = MockVerificationNotifier::new();
        notifier
            .expect_send_verification()
            .returning(|_, _| Err(UserError::Internal("smtp down".into())));

        let service = service().with_notifier(notifier);
        service.create_user(input("admin")).await.unwrap();
        assert!(service.create_user(input("john")).await.is_ok());
    }

    #[tokio::test]
    async fn test_issue_token_carries_role() {
        let service = service();
        let user = service.create_user(input("admin")).await.unwrap();

        let token = service.issue_token(&user).unwrap();
        let claims = jwt().verify_token(&token).unwrap();
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.nickname, "admin");
        assert_eq!(claims.user_id().unwrap(), user.id);
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("MAX_LOGIN_ATTEMPTS", Some("5")),
                ("SERVER_BASE_URL", Some("https://accounts.example.com/")),
            ],
            || {
                let config = UserServiceConfig::from_env().unwrap();
                assert_eq!(config.max_login_attempts, 5);
                assert_eq!(config.base_url, "https://accounts.example.com");
            },
        );

        temp_env::with_var("MAX_LOGIN_ATTEMPTS", Some("0"), || {
            assert!(UserServiceConfig::from_env().is_err());
        });
    }
}

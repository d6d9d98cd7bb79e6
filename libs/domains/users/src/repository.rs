use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, Role, User, UserFilter};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. The first user ever stored becomes a verified admin
    /// without a verification token, regardless of the input.
    async fn create(&self, user: NewUser) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Case-insensitive
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Case-insensitive
    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>>;

    /// A page of matching users, newest first, plus the total match count.
    async fn search(&self, filter: UserFilter, skip: u64, limit: u64)
    -> UserResult<(Vec<User>, u64)>;

    /// Write the profile columns of `user`: nickname, email, names, bio,
    /// links, role and professional status. Login bookkeeping, password and
    /// verification state keep their stored values. `Ok(None)` when the id
    /// is unknown.
    async fn update(&self, user: User) -> UserResult<Option<User>>;

    async fn delete(&self, id: Uuid) -> UserResult<bool>;

    /// Atomically bump the failed-attempt counter and lock the account once
    /// it reaches `max_attempts`.
    async fn record_failed_login(&self, id: Uuid, max_attempts: i32) -> UserResult<Option<User>>;

    /// Reset the failed-attempt counter and stamp the login time.
    async fn record_successful_login(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Lock the account, or unlock it and clear the failed-attempt counter.
    async fn set_locked(&self, id: Uuid, locked: bool) -> UserResult<Option<User>>;

    /// Replace the password hash and clear any lockout.
    async fn set_password(&self, id: Uuid, hashed_password: &str) -> UserResult<Option<User>>;

    /// Mark the email verified and drop the token when `token` matches the
    /// stored one exactly; anonymous users become authenticated. `Ok(None)`
    /// for an unknown id or a mismatched token.
    async fn verify_email(&self, id: Uuid, token: &str) -> UserResult<Option<User>>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Applies `f` to the stored user under the write lock.
    async fn modify(&self, id: Uuid, f: impl FnOnce(&mut User)) -> UserResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        f(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

fn check_unique(
    users: &HashMap<Uuid, User>,
    id: Uuid,
    email: &str,
    nickname: &str,
) -> UserResult<()> {
    for other in users.values().filter(|u| u.id != id) {
        if other.email.eq_ignore_ascii_case(email) {
            return Err(UserError::DuplicateEmail(email.to_string()));
        }
        if other.nickname.eq_ignore_ascii_case(nickname) {
            return Err(UserError::DuplicateNickname(nickname.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;

        let id = Uuid::now_v7();
        check_unique(&users, id, &input.email, &input.nickname)?;

        let first = users.is_empty();
        let now = Utc::now();
        let user = User {
            id,
            nickname: input.nickname,
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            bio: input.bio,
            profile_picture_url: input.profile_picture_url,
            linkedin_profile_url: input.linkedin_profile_url,
            github_profile_url: input.github_profile_url,
            role: if first { Role::Admin } else { input.role },
            is_professional: false,
            professional_status_updated_at: None,
            last_login_at: None,
            failed_login_attempts: 0,
            is_locked: false,
            created_at: now,
            updated_at: now,
            verification_token: if first { None } else { input.verification_token },
            email_verified: first,
            hashed_password: input.hashed_password,
        };

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.nickname.eq_ignore_ascii_case(nickname))
            .cloned())
    }

    async fn search(
        &self,
        filter: UserFilter,
        skip: u64,
        limit: u64,
    ) -> UserResult<(Vec<User>, u64)> {
        let users = self.users.read().await;

        let mut matches: Vec<User> = users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();

        // Newest first; ids are v7 so they break ties in creation order.
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matches.len() as u64;
        let page = matches
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn update(&self, user: User) -> UserResult<Option<User>> {
        let mut users = self.users.write().await;

        let Some(stored) = users.get(&user.id) else {
            return Ok(None);
        };
        check_unique(&users, user.id, &user.email, &user.nickname)?;

        let merged = User {
            last_login_at: stored.last_login_at,
            failed_login_attempts: stored.failed_login_attempts,
            is_locked: stored.is_locked,
            created_at: stored.created_at,
            verification_token: stored.verification_token.clone(),
            email_verified: stored.email_verified,
            hashed_password: stored.hashed_password.clone(),
            ..user
        };
        users.insert(merged.id, merged.clone());

        tracing::info!(user_id = %merged.id, "Updated user");
        Ok(Some(merged))
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;
        let removed = users.remove(&id).is_some();

        if removed {
            tracing::info!(user_id = %id, "Deleted user");
        }
        Ok(removed)
    }

    async fn record_failed_login(&self, id: Uuid, max_attempts: i32) -> UserResult<Option<User>> {
        self.modify(id, |user| {
            user.failed_login_attempts += 1;
            if user.failed_login_attempts >= max_attempts {
                user.lock_account();
            }
        })
        .await
    }

    async fn record_successful_login(&self, id: Uuid) -> UserResult<Option<User>> {
        self.modify(id, |user| {
            user.failed_login_attempts = 0;
            user.last_login_at = Some(Utc::now());
        })
        .await
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> UserResult<Option<User>> {
        self.modify(id, |user| {
            if locked {
                user.lock_account();
            } else {
                user.unlock_account();
            }
        })
        .await
    }

    async fn set_password(&self, id: Uuid, hashed_password: &str) -> UserResult<Option<User>> {
        self.modify(id, |user| {
            user.hashed_password = hashed_password.to_string();
            user.unlock_account();
        })
        .await
    }

    async fn verify_email(&self, id: Uuid, token: &str) -> UserResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users
            .get_mut(&id)
            .filter(|u| u.verification_token.as_deref() == Some(token))
        else {
            return Ok(None);
        };

        user.verify_email();
        if user.role == Role::Anonymous {
            user.role = Role::Authenticated;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

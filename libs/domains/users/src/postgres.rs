use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, SqlErr, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{NewUser, Role, User, UserFilter},
    repository::UserRepository,
};

/// Serializes inserts so that exactly one user can observe an empty table.
const FIRST_USER_LOCK_KEY: i64 = 0x7573_6572_735f_3031;

/// Select list for raw statements. The enum column is read back as text.
const COLUMNS: &str = "id, nickname, email, first_name, last_name, bio, profile_picture_url, \
    linkedin_profile_url, github_profile_url, role::text AS role, is_professional, \
    professional_status_updated_at, last_login_at, failed_login_attempts, is_locked, \
    created_at, updated_at, verification_token, email_verified, hashed_password";

/// PostgreSQL implementation of UserRepository using SeaORM
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_one(&self, sql: &str, values: Vec<Value>) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
        let model = entity::Model::find_by_statement(stmt).one(&self.db).await?;
        Ok(model.map(Into::into))
    }
}

#[derive(Debug, FromQueryResult)]
struct ExistsRow {
    present: bool,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// Maps unique-index violations to the matching domain conflict.
fn map_write_error(err: DbErr, email: &str, nickname: &str) -> UserError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("ix_users_email") => {
            UserError::DuplicateEmail(email.to_string())
        }
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("ix_users_nickname") => {
            UserError::DuplicateNickname(nickname.to_string())
        }
        _ => UserError::Database(err),
    }
}

/// `WHERE` clause with positional parameters for [`UserFilter`].
fn where_clause(filter: &UserFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut push = |template: &str, value: Value| {
        values.push(value);
        clauses.push(template.replace('?', &format!("${}", values.len())));
    };

    if let Some(ref username) = filter.username {
        push(
            r"lower(nickname) LIKE ? ESCAPE '\'",
            format!("%{}%", escape_like(&username.to_lowercase())).into(),
        );
    }
    if let Some(role) = filter.role {
        push("role = ?::user_role", role.to_string().into());
    }
    if let Some(verified) = filter.email_verified {
        push("email_verified = ?", verified.into());
    }
    if let Some(after) = filter.created_after {
        push("created_at >= ?", after.into());
    }
    if let Some(before) = filter.created_before {
        push("created_at <= ?", before.into());
    }
    if let Some(ref email) = filter.email {
        push("lower(email) = lower(?)", email.clone().into());
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_")
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let txn = self.db.begin().await?;

        txn.execute_unprepared(&format!(
            "SELECT pg_advisory_xact_lock({FIRST_USER_LOCK_KEY})"
        ))
        .await?;

        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT EXISTS (SELECT 1 FROM users) AS present",
        );
        let first = !ExistsRow::find_by_statement(stmt)
            .one(&txn)
            .await?
            .is_some_and(|row| row.present);

        let (email, nickname) = (input.email.clone(), input.nickname.clone());
        let active_model = entity::ActiveModel::from(NewRow { input, first });

        let model = active_model
            .insert(&txn)
            .await
            .map_err(|e| map_write_error(e, &email, &nickname))?;

        txn.commit().await?;

        tracing::info!(user_id = %model.id, role = %model.role, first, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        self.find_one(
            &format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1)"),
            vec![email.into()],
        )
        .await
    }

    async fn get_by_nickname(&self, nickname: &str) -> UserResult<Option<User>> {
        self.find_one(
            &format!("SELECT {COLUMNS} FROM users WHERE lower(nickname) = lower($1)"),
            vec![nickname.into()],
        )
        .await
    }

    async fn search(
        &self,
        filter: UserFilter,
        skip: u64,
        limit: u64,
    ) -> UserResult<(Vec<User>, u64)> {
        let (where_sql, values) = where_clause(&filter);

        let count_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("SELECT COUNT(*) AS total FROM users {where_sql}"),
            values.clone(),
        );
        let total = CountRow::find_by_statement(count_stmt)
            .one(&self.db)
            .await?
            .map_or(0, |row| row.total.max(0) as u64);

        let mut page_values = values;
        let limit_idx = page_values.len() + 1;
        let offset_idx = page_values.len() + 2;
        let offset = i64::try_from(skip)
            .map_err(|_| UserError::Validation(format!("skip out of range: {skip}")))?;
        page_values.push(i64::try_from(limit).unwrap_or(i64::MAX).into());
        page_values.push(offset.into());

        let page_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT {COLUMNS} FROM users {where_sql} ORDER BY created_at DESC, id DESC \
                 LIMIT ${limit_idx} OFFSET ${offset_idx}"
            ),
            page_values,
        );
        let models = entity::Model::find_by_statement(page_stmt)
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, user: User) -> UserResult<Option<User>> {
        let active_model = entity::ActiveModel::from(&user);

        match active_model.update(&self.db).await {
            Ok(model) => {
                tracing::info!(user_id = %model.id, "Updated user");
                Ok(Some(model.into()))
            }
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(map_write_error(e, &user.email, &user.nickname)),
        }
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = %id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn record_failed_login(&self, id: Uuid, max_attempts: i32) -> UserResult<Option<User>> {
        self.find_one(
            &format!(
                "UPDATE users \
                 SET failed_login_attempts = failed_login_attempts + 1, \
                     is_locked = is_locked OR failed_login_attempts + 1 >= $2 \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            ),
            vec![id.into(), max_attempts.into()],
        )
        .await
    }

    async fn record_successful_login(&self, id: Uuid) -> UserResult<Option<User>> {
        self.find_one(
            &format!(
                "UPDATE users \
                 SET failed_login_attempts = 0, last_login_at = NOW() \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            ),
            vec![id.into()],
        )
        .await
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> UserResult<Option<User>> {
        self.find_one(
            &format!(
                "UPDATE users \
                 SET is_locked = $2, \
                     failed_login_attempts = CASE WHEN $2 THEN failed_login_attempts ELSE 0 END \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            ),
            vec![id.into(), locked.into()],
        )
        .await
    }

    async fn set_password(&self, id: Uuid, hashed_password: &str) -> UserResult<Option<User>> {
        self.find_one(
            &format!(
                "UPDATE users \
                 SET hashed_password = $2, is_locked = false, failed_login_attempts = 0 \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            ),
            vec![id.into(), hashed_password.into()],
        )
        .await
    }

    async fn verify_email(&self, id: Uuid, token: &str) -> UserResult<Option<User>> {
        self.find_one(
            &format!(
                "UPDATE users \
                 SET email_verified = true, verification_token = NULL, \
                     role = CASE WHEN role = $3::user_role THEN $4::user_role ELSE role END \
                 WHERE id = $1 AND verification_token = $2 \
                 RETURNING {COLUMNS}"
            ),
            vec![
                id.into(),
                token.into(),
                Role::Anonymous.to_string().into(),
                Role::Authenticated.to_string().into(),
            ],
        )
        .await
    }
}

/// A [`NewUser`] together with whether it is the first row in the table.
struct NewRow {
    input: NewUser,
    first: bool,
}

impl From<NewRow> for entity::ActiveModel {
    fn from(row: NewRow) -> Self {
        use sea_orm::ActiveValue::{NotSet, Set};

        let NewRow { input, first } = row;
        let now = chrono::Utc::now();

        entity::ActiveModel {
            id: Set(Uuid::now_v7()),
            nickname: Set(input.nickname),
            email: Set(input.email),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            bio: Set(input.bio),
            profile_picture_url: Set(input.profile_picture_url),
            linkedin_profile_url: Set(input.linkedin_profile_url),
            github_profile_url: Set(input.github_profile_url),
            role: Set(if first { Role::Admin } else { input.role }),
            is_professional: Set(false),
            professional_status_updated_at: NotSet,
            last_login_at: NotSet,
            failed_login_attempts: Set(0),
            is_locked: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            verification_token: Set(if first {
                None
            } else {
                input.verification_token
            }),
            email_verified: Set(first),
            hashed_password: Set(input.hashed_password),
        }
    }
}

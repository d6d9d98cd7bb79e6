use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DbBackend, Statement};
use uuid::Uuid;

const PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

/// Seeds the `admin` account when `SEED_ADMIN_PASSWORD` is set.
///
/// Without the variable nothing is inserted and the first registered user
/// becomes the administrator instead.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let Ok(password) = std::env::var(PASSWORD_ENV) else {
            tracing::info!("{PASSWORD_ENV} not set, skipping admin seed");
            return Ok(());
        };

        let salt = SaltString::generate(&mut OsRng);
        let hashed = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DbErr::Migration(format!("Failed to hash seed password: {}", e)))?
            .to_string();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO users (id, nickname, email, first_name, last_name, role, email_verified, hashed_password)
            VALUES ($1, 'admin', 'admin@example.com', 'Admin', 'User', 'ADMIN'::user_role, true, $2)
            ON CONFLICT DO NOTHING
            "#,
            [Uuid::now_v7().into(), hashed.into()],
        );
        manager.get_connection().execute_raw(stmt).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DELETE FROM users WHERE lower(nickname) = 'admin'")
            .await?;

        Ok(())
    }
}

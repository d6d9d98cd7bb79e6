use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(UserRole::Enum)
                    .values([
                        UserRole::Anonymous,
                        UserRole::Authenticated,
                        UserRole::Manager,
                        UserRole::Admin,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string_len(Users::Nickname, 50))
                    .col(string_len(Users::Email, 255))
                    .col(string_len_null(Users::FirstName, 100))
                    .col(string_len_null(Users::LastName, 100))
                    .col(string_len_null(Users::Bio, 500))
                    .col(string_len_null(Users::ProfilePictureUrl, 255))
                    .col(string_len_null(Users::LinkedinProfileUrl, 255))
                    .col(string_len_null(Users::GithubProfileUrl, 255))
                    .col(
                        ColumnDef::new(Users::Role)
                            .enumeration(
                                UserRole::Enum,
                                [
                                    UserRole::Anonymous,
                                    UserRole::Authenticated,
                                    UserRole::Manager,
                                    UserRole::Admin,
                                ],
                            )
                            .not_null()
                            .default("AUTHENTICATED"),
                    )
                    .col(boolean(Users::IsProfessional).default(false))
                    .col(timestamp_with_time_zone_null(
                        Users::ProfessionalStatusUpdatedAt,
                    ))
                    .col(timestamp_with_time_zone_null(Users::LastLoginAt))
                    .col(integer(Users::FailedLoginAttempts).default(0))
                    .col(boolean(Users::IsLocked).default(false))
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(string_len_null(Users::VerificationToken, 255))
                    .col(boolean(Users::EmailVerified).default(false))
                    .col(string_len(Users::HashedPassword, 255))
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        // Uniqueness is case-insensitive, so it lives on lower() expressions
        db.execute_unprepared("CREATE UNIQUE INDEX ix_users_email ON users (lower(email))")
            .await?;
        db.execute_unprepared("CREATE UNIQUE INDEX ix_users_nickname ON users (lower(nickname))")
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_users_created_at")
                    .table(Users::Table)
                    .col(Users::CreatedAt)
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            r#"
            CREATE TRIGGER users_touch_updated_at
                BEFORE UPDATE ON users
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_updated_at()
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_type(Type::drop().if_exists().name(UserRole::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Nickname,
    Email,
    FirstName,
    LastName,
    Bio,
    ProfilePictureUrl,
    LinkedinProfileUrl,
    GithubProfileUrl,
    Role,
    IsProfessional,
    ProfessionalStatusUpdatedAt,
    LastLoginAt,
    FailedLoginAttempts,
    IsLocked,
    CreatedAt,
    UpdatedAt,
    VerificationToken,
    EmailVerified,
    HashedPassword,
}

#[derive(DeriveIden)]
enum UserRole {
    #[sea_orm(iden = "user_role")]
    Enum,
    #[sea_orm(iden = "ANONYMOUS")]
    Anonymous,
    #[sea_orm(iden = "AUTHENTICATED")]
    Authenticated,
    #[sea_orm(iden = "MANAGER")]
    Manager,
    #[sea_orm(iden = "ADMIN")]
    Admin,
}

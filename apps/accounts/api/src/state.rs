//! Shared application state.

use axum_helpers::JwtAuth;
use domain_users::{PgUserRepository, UserService};

/// Cloned into the readiness handler and used to build the domain routers.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: database::postgres::DatabaseConnection,
    pub jwt_auth: JwtAuth,
}

impl AppState {
    pub fn user_service(&self) -> UserService<PgUserRepository> {
        UserService::new(
            PgUserRepository::new(self.db.clone()),
            self.jwt_auth.clone(),
            self.config.users.clone(),
        )
    }
}

//! Users Domain
//!
//! Account lifecycle for the accounts service: registration, login with
//! lockout, email verification, profile updates, role-gated administration
//! and paginated search.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, role checks, audit events
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Business rules, password hashing, tokens
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Trait + in-memory and PostgreSQL implementations
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Domain types, DTOs, entity
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{handlers, InMemoryUserRepository, UserService, UserServiceConfig};
//!
//! let jwt = JwtAuth::new(&JwtConfig::new("a-secret-of-at-least-thirty-two-chars"));
//! let service = UserService::new(InMemoryUserRepository::new(), jwt, UserServiceConfig::default());
//!
//! // Mount under /api
//! let router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod nickname;
pub mod notifier;
pub mod pagination;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validators;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{
    CreateUser, LoginForm, RegisterUser, Role, TokenResponse, UpdateUser, User, UserFilter,
    UserListResponse, UserResponse, UserSearchParams,
};
pub use notifier::{TracingNotifier, VerificationNotifier};
pub use pagination::{PaginationLinks, generate_links};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::{UserService, UserServiceConfig};

//! # Axum Helpers
//!
//! Building blocks shared by the HTTP services in this workspace.
//!
//! - **[`auth`]**: JWT issuing/verification and the bearer-token middleware
//! - **[`server`]**: Router assembly with API docs, health routes, graceful shutdown
//! - **[`http`]**: CORS and security-header middleware
//! - **[`errors`]**: `AppError` and the JSON error envelope
//! - **[`extractors`]**: Validating JSON/query/form extractors and UUID paths
//! - **[`audit`]**: Audit event logging

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{JwtAuth, JwtClaims, JwtConfig, jwt_auth_middleware};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};

pub use http::{create_cors_layer, create_permissive_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{UuidPath, ValidatedForm, ValidatedJson, ValidatedQuery};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};

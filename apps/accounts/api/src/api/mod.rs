use axum::Router;
use axum::routing::get;

pub mod health;

use crate::state::AppState;

/// Routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState) -> Router {
    domain_users::handlers::router(state.user_service())
}

/// `/ready`, kept outside `/api` next to `/health`.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

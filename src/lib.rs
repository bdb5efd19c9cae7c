use axum::{routing::get, Router};
use database::PgPool;
use loader::Options;

mod handlers;
mod state;

pub(crate) use state::AppState;

/// Setup the routes
pub fn router(db: PgPool, batching: Options) -> Router {
    let state = AppState::new(db, batching);

    Router::new()
        .route(
            "/graphql",
            get(handlers::playground).post(handlers::graphql),
        )
        .route("/graphql/ws", get(handlers::graphql_ws))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(common::logging::http())
}

use axum::extract::FromRef;
use database::PgPool;
use loader::Options;

/// State passed to each request handler
#[derive(Clone)]
pub(crate) struct AppState {
    pub batching: Options,
    pub db: PgPool,
    pub schema: graphql::Schema,
}

impl AppState {
    pub fn new(db: PgPool, batching: Options) -> AppState {
        AppState {
            batching,
            schema: graphql::schema(db.clone()),
            db,
        }
    }
}

impl FromRef<AppState> for Options {
    fn from_ref(state: &AppState) -> Self {
        state.batching
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for graphql::Schema {
    fn from_ref(state: &AppState) -> Self {
        state.schema.clone()
    }
}

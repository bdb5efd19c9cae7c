use async_graphql::{
    http::{playground_source, GraphQLPlaygroundConfig, ALL_WEBSOCKET_PROTOCOLS},
    Data,
};
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{Html, Json, Response},
};
use database::{Loaders, PgPool};
use loader::Options;
use serde::Serialize;
use tracing::{error, instrument};

/// Handle graphql requests
///
/// Every request gets its own set of loaders, so nothing cached while resolving one request is
/// visible to another.
#[instrument(name = "graphql", skip_all)]
pub(crate) async fn graphql(
    State(schema): State<graphql::Schema>,
    State(db): State<PgPool>,
    State(batching): State<Options>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let loaders = Loaders::new(&db, batching);
    let req = req.into_inner().data(loaders.clone());
    let response = schema.execute(req).await;

    // resolver tasks that outlive the request must not start new fetches
    loaders.cancel();

    response.into()
}

/// Handle graphql subscriptions over a websocket
///
/// A connection shares one set of loaders across its subscriptions, each subscription clears
/// them before resolving an event.
#[instrument(name = "graphql_ws", skip_all)]
pub(crate) async fn graphql_ws(
    State(schema): State<graphql::Schema>,
    State(db): State<PgPool>,
    State(batching): State<Options>,
    protocol: GraphQLProtocol,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade
        .protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |socket| {
            let mut data = Data::default();
            data.insert(Loaders::new(&db, batching));

            GraphQLWebSocket::new(socket, schema, protocol)
                .with_data(data)
                .serve()
        })
}

/// Serve the GraphQL playground for development
#[instrument(name = "playground")]
pub(crate) async fn playground() -> Html<String> {
    let config = GraphQLPlaygroundConfig::new("/graphql")
        .subscription_endpoint("/graphql/ws")
        .title("Conference Playground");
    Html(playground_source(config))
}

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    database: bool,
}

/// Check that the service and its database are reachable
#[instrument(name = "health", skip_all)]
pub(crate) async fn health(State(db): State<PgPool>) -> (StatusCode, Json<Health>) {
    match database::ping(&db).await {
        Ok(()) => (StatusCode::OK, Json(Health { database: true })),
        Err(e) => {
            error!(error = %e, "database is unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(Health { database: false }))
        }
    }
}

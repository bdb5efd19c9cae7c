use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Setup logging and error reporting
///
/// `batching_level` overrides the level for the loaders only, so batch dispatches can be followed
/// without turning on every SQL statement as well. Loads resolve across runtime workers, each
/// line records the thread it came from.
pub fn init(default_level: Level, batching_level: Option<Level>) -> eyre::Result<()> {
    let debug = cfg!(debug_assertions);

    Registry::default()
        .with(filter(default_level, batching_level)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(debug)
                .with_line_number(debug)
                .with_thread_ids(true)
                .with_target(true),
        )
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}

/// Build the filter, `RUST_LOG` still takes precedence
fn filter(default_level: Level, batching_level: Option<Level>) -> eyre::Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if let Some(level) = batching_level {
        let directive = format!("loader={level}").parse::<Directive>()?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Trace every HTTP request and its response
pub fn http() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

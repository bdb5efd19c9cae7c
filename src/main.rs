use axum::Server;
use clap::Parser;
use eyre::WrapErr;
use loader::Options;
use std::{net::SocketAddr, time::Duration};
use tracing::{debug, info, Level};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    common::dotenv()?;

    let config = Config::parse();
    common::logging::init(config.log_level, config.batch_log_level)?;
    debug!(?config);

    let batching = Options::new(
        config.batch_delay.map(Duration::from_millis),
        config.max_batch_size,
    )
    .wrap_err("invalid batching options")?;

    let db = database::connect(&config.database_url).await?;
    if config.migrate {
        database::migrate(&db).await?;
    }

    let router = conference::router(db, batching);

    info!(address = %config.address, "listening and ready to handle requests");
    Server::bind(&config.address)
        .serve(router.into_make_service())
        .with_graceful_shutdown(common::shutdown_signal())
        .await
        .wrap_err("failed to start server")?;

    info!("server successfully shutdown");
    info!("goodbye! o/");

    Ok(())
}

/// GraphQL API for planning a conference's speakers, sessions, tracks, and attendees
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Config {
    /// The address for the server to listen on
    #[arg(long, default_value = "127.0.0.1:4243", env = "ADDRESS")]
    address: SocketAddr,

    /// The database to connect to
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// The default level to log at
    #[arg(long, default_value_t = Level::INFO, env = "LOG_LEVEL")]
    log_level: Level,

    /// Apply any pending database migrations on startup
    #[arg(long, env = "MIGRATE")]
    migrate: bool,

    /// The level to log batch dispatches at, defaults to the log level
    #[arg(long, env = "BATCH_LOG_LEVEL")]
    batch_log_level: Option<Level>,

    /// How long, in milliseconds, to hold a batch open for more keys before fetching it.
    /// Defaults to 1ms, 0 closes the batch as soon as the resolver yields
    #[arg(long, env = "BATCH_DELAY_MS")]
    batch_delay: Option<u64>,

    /// The most keys a single batch fetch may contain
    #[arg(long, env = "MAX_BATCH_SIZE")]
    max_batch_size: Option<usize>,
}

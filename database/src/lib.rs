use eyre::WrapErr;
use sqlx::{migrate::Migrator, postgres::PgConnectOptions, ConnectOptions};
use std::str::FromStr;
use tracing::{info, log::LevelFilter};

mod attendee;
mod listing;
pub mod loaders;
mod session;
mod speaker;
mod track;

pub use attendee::Attendee;
pub use listing::SortDirection;
pub use loaders::Loaders;
pub use session::{Session, SessionFilter, SessionOrder, SessionOrderField, SessionUpdater};
pub use speaker::{Speaker, SpeakerFilter, SpeakerOrder, SpeakerOrderField, SpeakerUpdater};
pub use sqlx::{Error, PgPool};
pub use track::{Track, TrackFilter, TrackOrder, TrackOrderField};

pub type Result<T, E = Error> = std::result::Result<T, E>;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connect to the database and ensure it works
pub async fn connect(url: &str) -> eyre::Result<PgPool> {
    let options = PgConnectOptions::from_str(url)
        .wrap_err("invalid database url format")?
        .log_statements(LevelFilter::Debug);

    let db = PgPool::connect_with(options)
        .await
        .wrap_err("failed to connect to the database")?;

    info!("connected to the database");
    Ok(db)
}

/// Check that the database is reachable
pub async fn ping(db: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(db).await?;
    Ok(())
}

/// Apply any migrations that have not been run yet
pub async fn migrate(db: &PgPool) -> eyre::Result<()> {
    MIGRATOR
        .run(db)
        .await
        .wrap_err("failed to apply migrations")?;

    info!("database is up to date");
    Ok(())
}

use chrono::Utc;
use eyre::{eyre, WrapErr};
use sqlx::{
    migrate::{Migrate, Migrator},
    pool::PoolConnection,
    PgConnection, Postgres,
};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub async fn run(args: Args) -> eyre::Result<()> {
    match args.command {
        Command::Add { name } => add(&args.source, &name.join("_"))?,
        Command::Info => {
            let (migrator, mut conn) = open(&args.source, &args.database_url).await?;
            let applied = applied_versions(&mut conn).await?;

            for migration in migrator
                .iter()
                .filter(|m| !m.migration_type.is_down_migration())
            {
                info!(
                    version = migration.version,
                    description = %migration.description,
                    applied = applied.contains(&migration.version),
                );
            }
        }
        Command::Apply => {
            let (migrator, mut conn) = open(&args.source, &args.database_url).await?;
            migrator.run(&mut *conn).await?;
            info!("all migrations applied");
        }
        Command::Revert { target } => {
            let (migrator, mut conn) = open(&args.source, &args.database_url).await?;
            let target = match target {
                Some(target) => target,
                None => {
                    let mut versions = applied_versions(&mut conn)
                        .await?
                        .into_iter()
                        .collect::<Vec<_>>();
                    versions.sort_unstable();
                    versions.pop().ok_or_else(|| eyre!("no migrations to revert"))?;
                    versions.pop().unwrap_or(0)
                }
            };

            migrator.undo(&mut *conn, target).await?;
            info!(target, "reverted migrations");
        }
    }

    Ok(())
}

/// Load the migrations and connect to the database they are managed in
async fn open(source: &Path, url: &str) -> eyre::Result<(Migrator, PoolConnection<Postgres>)> {
    let migrator = Migrator::new(source)
        .await
        .wrap_err("failed to load migrations")?;

    let db = database::connect(url).await?;
    let conn = db.acquire().await?;

    Ok((migrator, conn))
}

/// The versions of every migration that has been applied
async fn applied_versions(conn: &mut PgConnection) -> eyre::Result<HashSet<i64>> {
    conn.ensure_migrations_table().await?;

    let applied = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|migration| migration.version)
        .collect();

    Ok(applied)
}

/// Create a new reversible migration
fn add(source: &Path, name: &str) -> eyre::Result<()> {
    let version = Utc::now().format("%Y%m%d%H%M%S");

    for direction in ["up", "down"] {
        let path = source.join(format!("{version}_{name}.{direction}.sql"));
        fs::write(&path, "").wrap_err("failed to create migration")?;
        info!(path = %path.display(), "created migration");
    }

    Ok(())
}

#[derive(clap::Args, Debug)]
pub struct Args {
    /// The database to run migrations on
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,

    /// The migrations source
    #[arg(short, long, default_value = "./database/migrations")]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Create a new migration
    Add {
        /// The name of the migration
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// List all available migrations
    Info,
    /// Apply all pending migrations
    Apply,
    /// Revert migrations
    ///
    /// If no target is provided, the most recent migration is reverted.
    Revert {
        /// The version to revert back to
        target: Option<i64>,
    },
}

//! Standalone schema migration runner.
//!
//! The database is taken from `--database-url`, then `DATABASE_URL`, then the
//! URL in the application configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

use foodcourt::migrator::Migrator;

#[derive(Parser, Debug)]
#[command(name = "migration", about = "Apply or roll back the foodcourt schema", version)]
struct Cli {
    /// Database to migrate instead of the configured one
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Defaults to `up`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Apply every pending migration
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
    /// Drop all tables and apply every migration again
    Fresh,
    /// Roll back every applied migration
    Reset,
}

impl Cli {
    fn database_url(&self) -> anyhow::Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return Ok(url);
        }
        let cfg = foodcourt::config::load_config().context(
            "no database URL given and the application configuration could not be loaded",
        )?;
        Ok(cfg.database_url)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let command = cli.command.unwrap_or(Command::Up);
    let mut options = ConnectOptions::new(cli.database_url()?);
    options
        .max_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    info!(?command, "running migrations");
    match command {
        Command::Up => Migrator::up(&db, None).await?,
        Command::Down { steps } => Migrator::down(&db, Some(steps)).await?,
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => Migrator::fresh(&db).await?,
        Command::Reset => Migrator::reset(&db).await?,
    }
    info!("migration command finished");

    Ok(())
}

mod config;
mod employees;
mod http;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, SeaOrmEmployeeStore, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{Employee, EmployeeService, EmployeeServiceError, InMemoryEmployeeStore};
use tracing::{info, warn};

use crate::{
    config::{AppConfig, StoreBackend},
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee directory service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert the sample employees into Postgres.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, value_enum, help = "Override EMPLOYEE_STORE")]
    store: Option<StoreBackend>,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

const SAMPLE_EMPLOYEES: &[(&str, &str, &str)] = &[
    ("Christian", "Ramirez", "c1@gmail.com"),
    ("Gabriel", "Ramirez", "g1@gmail.com"),
    ("Julen", "Ramirez", "cj@gmail.com"),
    ("Biaggio", "Ramirez", "b1@gmail.com"),
    ("Adrian", "Ramirez", "a@gmail.com"),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    let app_config = AppConfig::load()?;
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => run_seed().await,
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, mut config: AppConfig) -> Result<()> {
    if let Some(store) = cmd.store {
        config.store = store;
    }
    let (service, pool) = match config.store {
        StoreBackend::Memory => {
            warn!("using the in-memory employee store; records are lost on shutdown");
            let service = EmployeeService::new(Arc::new(InMemoryEmployeeStore::new()));
            (service, None)
        }
        StoreBackend::Postgres => {
            let pool = setup_pool().await?;
            ensure_migrations(&pool, cmd.allow_dirty).await?;
            let service = EmployeeService::new(Arc::new(SeaOrmEmployeeStore::new(pool.clone())));
            (service, Some(pool))
        }
    };
    info!(store = config.store.as_str(), "employee store ready");
    let state = AppState {
        service,
        pool,
        config: Arc::new(config),
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        bail!(
            "pending migrations detected; run `cargo run -p server -- migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed() -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, false).await?;
    let service = EmployeeService::new(Arc::new(SeaOrmEmployeeStore::new(pool)));
    let inserted = seed_employees(&service).await?;
    info!(inserted, "seed complete");
    Ok(())
}

/// Create each sample employee, skipping emails that already exist.
async fn seed_employees(service: &EmployeeService) -> Result<usize> {
    let mut inserted = 0;
    for (first, last, email) in SAMPLE_EMPLOYEES {
        match service.create(Employee::new(*first, *last, *email)).await {
            Ok(_) => inserted += 1,
            Err(EmployeeServiceError::DuplicateResource { email }) => {
                info!(%email, "sample employee already present");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(inserted)
}

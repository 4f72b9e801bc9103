//! Database primitives: connection settings, the shared pool, and the
//! SeaORM adapter behind the employee store port.

mod employee_store;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

pub use employee_store::SeaOrmEmployeeStore;

/// Shared Postgres pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing: set {0}")]
    MissingUrl(String),
    #[error("failed to connect to database")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    env_key: String,
    max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::new("DATABASE_URL")
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Reads `DATABASE_URL` lazily and the pool size from `DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Self {
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Self {
            max_connections,
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }
}

/// Open a pool using the URL named by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    connect_url(&url, settings.max_connections).await
}

/// Open a pool against an explicit URL.
pub async fn connect_url(url: &str, max_connections: u32) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.max_connections(max_connections).sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!(max_connections, "database pool ready");
    Ok(pool)
}

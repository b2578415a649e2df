//! Connection pool for the `apod` table.

use std::str::FromStr;
use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, PgPool, Postgres};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

const APPLICATION_NAME: &str = "astrovista";

/// Parses the connection URL and tags sessions with the application name.
pub(crate) fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions> {
    if config.url.trim().is_empty() {
        return Err(PostgresError::config("url must not be empty"));
    }
    let options = PgConnectOptions::from_str(&config.url)?.application_name(APPLICATION_NAME);
    Ok(options)
}

/// Opens a pool sized by `config`. Fails on the first unreachable connect
/// rather than retrying.
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be greater than zero"));
    }
    let connect = connect_options(config)?;

    tracing::info!(
        host = connect.get_host(),
        port = connect.get_port(),
        database = connect.get_database().unwrap_or_default(),
        pool_size = config.pool_size,
        "Connecting to PostgreSQL"
    );

    let mut options = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(1)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms));
    if let Some(idle) = config.idle_timeout_ms {
        options = options.idle_timeout(Duration::from_millis(idle));
    }

    Ok(options.connect_with(connect).await?)
}

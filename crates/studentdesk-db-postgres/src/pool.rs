//! Connection pool for the student and identity tables.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Type alias for PostgreSQL pool options.
pub type PgPoolOptions = PoolOptions<Postgres>;

/// Connections are recycled after this long unless configured otherwise.
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Translates the configuration into pool options without connecting.
pub fn pool_options(config: &PostgresConfig) -> PgPoolOptions {
    // A quarter of the pool stays warm, at least one and never above the cap.
    let warm = config
        .min_connections
        .unwrap_or(config.pool_size / 4)
        .clamp(1, config.pool_size.max(1));

    let max_lifetime = config
        .max_lifetime_secs
        .map_or(DEFAULT_MAX_LIFETIME, Duration::from_secs);

    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .min_connections(warm)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .max_lifetime(max_lifetime)
}

/// Validates the configuration and opens a pool.
#[instrument(skip(config), fields(url = %redact_url(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    config.validate().map_err(PostgresError::config)?;

    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        "Opening student database pool"
    );
    let pool = pool_options(config).connect(&config.url).await?;
    debug!(size = pool.size(), "Student database pool ready");
    Ok(pool)
}

/// Replaces the password of a connection URL with `****` for logging.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _password)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}

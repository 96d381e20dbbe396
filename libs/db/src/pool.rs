//! Postgres connection pool construction.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").unwrap_or_default(),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Build a connection pool. Migrations are run separately via
/// `sqlx::migrate!` against `migrations/` at process startup.
pub async fn connect(config: &PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults_without_env() {
        std::env::remove_var("DATABASE_MAX_CONNECTIONS");
        let config = PoolConfig {
            url: "postgres://localhost/test".into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        };
        assert_eq!(config.max_connections, 10);
    }
}

use std::time::Duration;

use sqlx::{Pool, Postgres};
use tracing::info;

use crate::bootstrap::config::Config;

pub type PgPool = Pool<Postgres>;

/// Builds the process-wide pool and proves it can reach the server before any
/// request is served.
pub async fn connect_pool(cfg: &Config) -> anyhow::Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(cfg.database_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .test_before_acquire(true)
        .connect(&cfg.database_url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(
        max_connections = cfg.database_max_connections,
        "db_pool_warmed"
    );
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    // Uses compile-time embedded migrations under ./migrations
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub mod repositories;
pub mod resilience;

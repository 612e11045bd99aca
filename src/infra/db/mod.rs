//! Postgres-backed repository implementations.

mod posts;
mod retry;
mod util;

pub use retry::ConnectRetry;
pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::repos::{HealthRepo, RepoError};
use crate::infra::error::InfraError;

const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Weighted full-text index backing post search. The weights themselves live
/// in the generated `search_vector` column.
const SEARCH_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS posts_search_vector_idx ON posts USING GIN (search_vector)";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build a pool and wait until the database answers a ping, backing off
    /// between attempts until `retry` gives up.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        mut retry: ConnectRetry,
    ) -> Result<PgPool, InfraError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(PING_TIMEOUT)
            .connect_lazy(url)?;

        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            debug!(target = "bulletin::db", attempt = attempts, "pinging database");

            let error = match tokio::time::timeout(PING_TIMEOUT, ping(&pool)).await {
                Ok(Ok(())) => {
                    info!(target = "bulletin::db", attempts, "database is up");
                    return Ok(pool);
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => "ping timed out".to_string(),
            };

            let waited = started.elapsed();
            let Some(delay) = retry.next_delay(waited) else {
                pool.close().await;
                return Err(InfraError::DatabaseUnavailable {
                    attempts,
                    waited,
                    last_error: error,
                });
            };

            warn!(
                target = "bulletin::db",
                attempt = attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "database not ready"
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }

    /// Create the search index unless it already exists.
    pub async fn ensure_search_index(&self) -> Result<(), InfraError> {
        query(SEARCH_INDEX_DDL).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    query("SELECT 1").execute(pool).await.map(|_| ())
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        ping(self.pool()).await.map_err(map_sqlx_error)
    }
}

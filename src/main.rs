// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use exam_bank::clients::completion::HttpCompletionClient;
use exam_bank::config::{Config, DEFAULT_POPULAR_SIZE};
use exam_bank::error::AppError;
use exam_bank::state::AppState;
use exam_bank::store::PgStore;
use exam_bank::store::ranking::PgRanking;
use exam_bank::utils::logging::{init_tracing, log_bank_summary};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const CONNECT_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_tracing(&config);

    let pool = connect_with_retry(&config.database_url).await?;
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let store = Arc::new(PgStore::new(pool.clone()));
    let ranking = Arc::new(PgRanking::new(pool));
    let client = Arc::new(HttpCompletionClient::new(&config.ai)?);
    let state = AppState::new(config, store, ranking, client);

    let tree = state.categories.build_tree().await?;
    let hot = state.popular.top_n(DEFAULT_POPULAR_SIZE).await?;
    log_bank_summary(&tree, hot.len());

    Ok(())
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> Result<PgPool, AppError> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count >= CONNECT_ATTEMPTS {
                    tracing::error!("Failed to connect to database after {} attempts", retry_count);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

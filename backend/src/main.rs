use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};

use financogram_backend::app;
use financogram_backend::config::{AppConfig, ProviderKind};
use financogram_backend::external::price_provider::PriceProvider;
use financogram_backend::external::synthetic::SyntheticProvider;
use financogram_backend::external::yahoo::YahooProvider;
use financogram_backend::logging::{init_logging, LoggingConfig};
use financogram_backend::services::prediction_history::{
    InMemoryPredictionHistory, PgPredictionHistory, PredictionHistory,
};
use financogram_backend::state::AppState;

/// How often expired cache entries are swept.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let provider: Arc<dyn PriceProvider> = match config.provider {
        ProviderKind::Yahoo => {
            tracing::info!("📊 Using price provider: Yahoo Finance");
            Arc::new(YahooProvider::new())
        }
        ProviderKind::Synthetic => {
            let seed = config.seed.unwrap_or(42);
            tracing::info!("📊 Using price provider: synthetic (seed {})", seed);
            Arc::new(SyntheticProvider::new(seed))
        }
    };

    let history: Arc<dyn PredictionHistory> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("failed to connect to DATABASE_URL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run database migrations")?;

            tracing::info!("🗄️ Prediction history stored in Postgres");
            Arc::new(PgPredictionHistory::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; prediction history is kept in memory");
            Arc::new(InMemoryPredictionHistory::with_limit(config.history_limit))
        }
    };

    let addr = config.bind_addr;
    let state = AppState::new(config, provider, history);

    let cache = state.prediction_cache.clone();
    tokio::spawn(async move {
        let mut ticker = interval(CACHE_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired().await;
            if removed > 0 {
                tracing::debug!("Purged {} expired predictions from cache", removed);
            }
        }
    });

    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Financogram backend running at http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

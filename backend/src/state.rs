use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::price_provider::PriceProvider;
use crate::services::prediction_cache::PredictionCache;
use crate::services::prediction_history::PredictionHistory;
use crate::services::prediction_service::PredictionEngine;
use crate::services::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub price_provider: Arc<dyn PriceProvider>,
    pub engine: Arc<PredictionEngine>,
    pub prediction_cache: Arc<dyn PredictionCache>,
    pub history: Arc<dyn PredictionHistory>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State with the in-process cache and the given history backend.
    pub fn new(
        config: AppConfig,
        price_provider: Arc<dyn PriceProvider>,
        history: Arc<dyn PredictionHistory>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.max_concurrent_fetches, config.requests_per_minute);
        let engine = PredictionEngine::from_seed(config.seed);

        Self {
            config: Arc::new(config),
            price_provider,
            engine: Arc::new(engine),
            prediction_cache: Arc::new(crate::services::prediction_cache::InMemoryPredictionCache::new()),
            history,
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}

pub mod export_service;
pub mod feature_service;
pub mod forecasting_service;
pub mod indicators;
pub mod prediction_cache;
pub mod prediction_history;
pub mod prediction_service;
pub mod price_service;
pub mod rate_limiter;
pub mod trend_service;

#[cfg(test)]
pub(crate) mod test_support;

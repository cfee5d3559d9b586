use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::errors::{PredictionError, PredictionFailed};
use crate::models::{forecast_horizon, PredictionResult, PriceSeries, PriceWindow};
use crate::services::feature_service;
use crate::services::forecasting_service::{self, round_to};
use crate::services::trend_service;

/// Closes returned as the chartable history.
pub const HISTORICAL_WINDOW: usize = 60;

pub const MODEL_NAME: &str = "trend-extrapolation";

/// Runs the full analysis pipeline for one symbol.
///
/// Holds the random source used for forecast noise. A fixed seed makes every
/// prediction reproducible; otherwise the generator is seeded from the OS.
pub struct PredictionEngine {
    rng: Mutex<StdRng>,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(),
        }
    }

    /// Enrich, classify, score, forecast and recommend.
    ///
    /// Any stage failure is reported as `PredictionFailed` carrying the
    /// uppercased symbol. Timeframes outside 1d/1w/1m forecast 30 days.
    pub fn predict(
        &self,
        series: &PriceSeries,
        timeframe: &str,
        today: NaiveDate,
    ) -> Result<PredictionResult, PredictionFailed> {
        let symbol = series.symbol().to_uppercase();
        let fail = |reason: PredictionError| PredictionFailed::new(symbol.clone(), reason);

        info!("Preparing features for {} ({} bars)", symbol, series.len());
        let enriched = feature_service::enrich(series).map_err(fail)?;
        debug!("{} enriched rows for {}", enriched.len(), symbol);

        let trend = trend_service::classify_trend(&enriched).map_err(fail)?;
        let confidence = trend_service::confidence_score(&enriched, trend);
        info!("{} trend {} with confidence {:.3}", symbol, trend, confidence);

        let closes = enriched.closes();
        let volatility = forecasting_service::recent_volatility(&enriched);
        let horizon = forecast_horizon(timeframe);

        let forecast = {
            let mut rng = self.rng.lock();
            forecasting_service::forecast_prices(&closes, volatility, horizon, today, &mut *rng)
                .map_err(fail)?
        };
        debug!("Forecast {} points for {} ({})", forecast.len(), symbol, timeframe);

        let current_price = closes[closes.len() - 1];
        let expected_return_pct = forecasting_service::expected_return_pct(current_price, &forecast);
        let recommendation = trend_service::recommend(trend, confidence, expected_return_pct);

        let forecast_window = forecasting_service::to_window(&forecast);
        let predicted_end_price = forecast_window.last_price().unwrap_or(current_price);

        let tail = enriched.tail(HISTORICAL_WINDOW);
        let historical_window = PriceWindow {
            dates: tail.iter().map(|r| r.bar.date.format("%Y-%m-%d").to_string()).collect(),
            prices: tail.iter().map(|r| round_to(r.close(), 2)).collect(),
        };

        info!(
            "Prediction for {}: {} expected {:.2}% ({})",
            symbol, recommendation, expected_return_pct, timeframe
        );

        Ok(PredictionResult {
            symbol,
            timeframe: timeframe.to_string(),
            historical_window,
            forecast_window,
            trend_direction: trend,
            confidence_score: round_to(confidence, 3),
            recommendation,
            current_price: round_to(current_price, 2),
            predicted_end_price,
            expected_return_pct,
            model_used: MODEL_NAME.to_string(),
            generated_at: Utc::now(),
        })
    }
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recommendation, TrendDirection};
    use crate::services::feature_service::WARM_UP_ROWS;
    use crate::services::test_support::{trending_series, wavy_series};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn test_minimum_bars_for_prediction() {
        let engine = PredictionEngine::seeded(1);

        let short = wavy_series("aapl", WARM_UP_ROWS + 19);
        let err = engine.predict(&short, "1w", today()).unwrap_err();
        assert_eq!(err.symbol, "AAPL");
        assert!(matches!(err.reason, PredictionError::InsufficientData { required: 20, actual: 19, .. }));

        let enough = wavy_series("aapl", WARM_UP_ROWS + 20);
        let result = engine.predict(&enough, "1w", today()).unwrap();
        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.forecast_window.prices.len(), 7);
        assert_eq!(result.historical_window.prices.len(), 20);
    }

    #[test]
    fn test_result_is_internally_consistent() {
        let engine = PredictionEngine::seeded(11);
        let series = wavy_series("MSFT", 300);

        for code in ["1d", "1w", "1m", "weird"] {
            let result = engine.predict(&series, code, today()).unwrap();

            assert_eq!(result.forecast_window.prices.len(), forecast_horizon(code));
            assert_eq!(result.forecast_window.dates.len(), result.forecast_window.prices.len());
            assert!(result.historical_window.prices.len() <= HISTORICAL_WINDOW);
            assert_eq!(result.historical_window.prices.len(), HISTORICAL_WINDOW);
            assert_eq!(result.predicted_end_price, *result.forecast_window.prices.last().unwrap());
            assert!((0.30..=0.95).contains(&result.confidence_score));
            assert_eq!(result.model_used, MODEL_NAME);

            let recomputed = (result.predicted_end_price - result.current_price) / result.current_price * 100.0;
            assert!((recomputed - result.expected_return_pct).abs() <= 0.02);
        }
    }

    #[test]
    fn test_historical_window_ends_at_last_bar() {
        let engine = PredictionEngine::seeded(2);
        let series = wavy_series("NVDA", 150);
        let result = engine.predict(&series, "1d", today()).unwrap();

        let last = series.last();
        assert_eq!(
            result.historical_window.dates.last().unwrap(),
            &last.date.format("%Y-%m-%d").to_string()
        );
        assert_eq!(result.current_price, round_to(last.close, 2));
        assert_eq!(result.forecast_window.dates[0], "2024-06-04");
    }

    #[test]
    fn test_same_seed_reproduces_prediction() {
        let series = wavy_series("TSLA", 200);
        let a = PredictionEngine::seeded(5).predict(&series, "1m", today()).unwrap();
        let b = PredictionEngine::seeded(5).predict(&series, "1m", today()).unwrap();

        assert_eq!(a.forecast_window, b.forecast_window);
        assert_eq!(a.recommendation, b.recommendation);
        assert_eq!(a.confidence_score, b.confidence_score);
    }

    #[test]
    fn test_strong_uptrend_is_not_sell() {
        let engine = PredictionEngine::seeded(3);
        let series = trending_series("AMD", 250, 50.0, 0.5);
        let result = engine.predict(&series, "1m", today()).unwrap();

        assert_eq!(result.trend_direction, TrendDirection::Up);
        assert_ne!(result.recommendation, Recommendation::Sell);
        assert!(result.expected_return_pct > 0.0);
    }
}

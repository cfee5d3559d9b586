use crate::errors::PredictionError;
use crate::models::{EnrichedSeries, Recommendation, TrendDirection};
use crate::services::indicators::mean;

/// Rows inspected by the trend vote and the recent-window sub-scores.
pub const TREND_WINDOW: usize = 20;

const PRICE_WEIGHT: f64 = 0.4;
const SMA_WEIGHT: f64 = 0.3;
const RSI_WEIGHT: f64 = 0.2;
const MACD_WEIGHT: f64 = 0.1;
const TREND_THRESHOLD: f64 = 0.2;

const DATA_QUALITY_WEIGHT: f64 = 0.30;
const VOLATILITY_WEIGHT: f64 = 0.25;
const CONSISTENCY_WEIGHT: f64 = 0.25;
const VOLUME_WEIGHT: f64 = 0.20;

/// Row count at which data quality saturates.
const FULL_QUALITY_ROWS: f64 = 200.0;

pub const MIN_CONFIDENCE: f64 = 0.30;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Below this confidence the answer is always HOLD.
pub const CONFIDENCE_GATE: f64 = 0.5;

/// Expected return (in percent) a trend must clear to trigger BUY/SELL.
pub const RETURN_THRESHOLD_PCT: f64 = 2.0;

fn signed_vote(delta: f64, weight: f64) -> f64 {
    if delta > 0.0 {
        weight
    } else if delta < 0.0 {
        -weight
    } else {
        0.0
    }
}

/// Weighted sign vote in [-1, 1].
///
/// Terms are accumulated in a fixed order (price, SMA, RSI, MACD) so ties at
/// the ±0.2 boundary always round the same way.
pub fn trend_score(price_trend: f64, sma_trend: f64, rsi: f64, macd: f64) -> f64 {
    let mut score = 0.0;
    score += signed_vote(price_trend, PRICE_WEIGHT);
    score += signed_vote(sma_trend, SMA_WEIGHT);
    score += if rsi > 50.0 { RSI_WEIGHT } else { -RSI_WEIGHT };
    score += if macd > 0.0 { MACD_WEIGHT } else { -MACD_WEIGHT };
    score
}

/// Classify the direction of the last 20 enriched rows.
pub fn classify_trend(series: &EnrichedSeries) -> Result<TrendDirection, PredictionError> {
    let window = series.tail(TREND_WINDOW);
    if window.len() < TREND_WINDOW {
        return Err(PredictionError::insufficient("trend prediction", TREND_WINDOW, window.len()));
    }

    let first = &window[0];
    let last = &window[window.len() - 1];

    let price_trend = last.close() - first.close();
    let sma_trend = last.sma20 - first.sma20;
    let rsi = last.rsi14;
    let macd = last.macd;

    if [price_trend, sma_trend, rsi, macd].iter().any(|v| v.is_nan()) {
        return Err(PredictionError::InvalidIndicators(
            "NaN values found in trend indicators".to_string(),
        ));
    }

    let score = trend_score(price_trend, sma_trend, rsi, macd);

    Ok(if score > TREND_THRESHOLD {
        TrendDirection::Up
    } else if score < -TREND_THRESHOLD {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    })
}

/// Heuristic confidence in the classified trend, clamped to [0.30, 0.95].
///
/// Sub-scores and weights:
/// - data quality (0.30): row count relative to 200
/// - volatility (0.25): one minus recent volatility relative to mean price
/// - trend consistency (0.25): share of recent daily returns agreeing with
///   the trend; SIDEWAYS always scores 0.5
/// - volume (0.20): recent volume relative to the whole series
pub fn confidence_score(series: &EnrichedSeries, trend: TrendDirection) -> f64 {
    let rows = series.rows();
    let recent = series.tail(TREND_WINDOW);

    let data_quality = (rows.len() as f64 / FULL_QUALITY_ROWS).min(1.0);

    let recent_volatility = mean(&recent.iter().map(|r| r.volatility20).collect::<Vec<_>>());
    let mean_close = mean(&series.closes());
    let volatility_score = if mean_close > 0.0 {
        (1.0 - recent_volatility / mean_close).max(0.0)
    } else {
        0.0
    };

    let consistency_score = match trend {
        TrendDirection::Sideways => 0.5,
        TrendDirection::Up | TrendDirection::Down if recent.is_empty() => 0.0,
        TrendDirection::Up => {
            recent.iter().filter(|r| r.pct_change_1 > 0.0).count() as f64 / recent.len() as f64
        }
        TrendDirection::Down => {
            recent.iter().filter(|r| r.pct_change_1 < 0.0).count() as f64 / recent.len() as f64
        }
    };

    let recent_volume = mean(&recent.iter().map(|r| r.bar.volume).collect::<Vec<_>>());
    let overall_volume = mean(&rows.iter().map(|r| r.bar.volume).collect::<Vec<_>>());
    let volume_score = if overall_volume > 0.0 {
        (recent_volume / overall_volume).min(1.0)
    } else {
        0.0
    };

    let confidence = data_quality * DATA_QUALITY_WEIGHT
        + volatility_score * VOLATILITY_WEIGHT
        + consistency_score * CONSISTENCY_WEIGHT
        + volume_score * VOLUME_WEIGHT;

    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// BUY/SELL/HOLD decision table, evaluated top to bottom.
pub fn recommend(trend: TrendDirection, confidence: f64, expected_return_pct: f64) -> Recommendation {
    if confidence < CONFIDENCE_GATE {
        return Recommendation::Hold;
    }

    match trend {
        TrendDirection::Up if expected_return_pct > RETURN_THRESHOLD_PCT => Recommendation::Buy,
        TrendDirection::Down if expected_return_pct < -RETURN_THRESHOLD_PCT => Recommendation::Sell,
        _ => Recommendation::Hold,
    }
}

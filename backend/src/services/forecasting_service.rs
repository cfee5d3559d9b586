use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::errors::PredictionError;
use crate::models::{EnrichedSeries, PriceWindow};
use crate::services::indicators::{mean, regression_trend};
use crate::services::trend_service::TREND_WINDOW;

/// Closes used to fit the trend line.
pub const TREND_LOOKBACK: usize = 30;

/// Fewest closes the forecaster will extrapolate from.
pub const MIN_FORECAST_POINTS: usize = 10;

/// Noise standard deviation as a share of volatility.
const NOISE_SCALE: f64 = 0.1;

/// Volatility assumed when the series gives none, as a share of price.
const DEFAULT_VOLATILITY_RATIO: f64 = 0.02;

/// Forecasts never drop below this share of the current price.
pub const PRICE_FLOOR_RATIO: f64 = 0.5;

/// Single simulated future close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub price: f64,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of the last 20 rolling-volatility values.
pub fn recent_volatility(series: &EnrichedSeries) -> f64 {
    let values: Vec<f64> = series.tail(TREND_WINDOW).iter().map(|r| r.volatility20).collect();
    mean(&values)
}

/// Standard normal draw (Box-Muller).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - u keeps the log argument in (0, 1]
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Extrapolate `horizon` daily closes from the recent trend plus noise.
///
/// The slope comes from a least-squares line through the last 30 closes.
/// Each step adds zero-mean normal noise with standard deviation
/// `0.1 * volatility`; a NaN or non-positive `volatility` falls back to 2% of
/// the current price. Prices are floored at half the current price and
/// rounded to cents. Dates run from `today + 1`.
pub fn forecast_prices<R: Rng>(
    closes: &[f64],
    volatility: f64,
    horizon: usize,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Vec<ForecastPoint>, PredictionError> {
    let recent = &closes[closes.len().saturating_sub(TREND_LOOKBACK)..];
    if recent.len() < MIN_FORECAST_POINTS {
        return Err(PredictionError::insufficient("price forecasting", MIN_FORECAST_POINTS, recent.len()));
    }

    let current = recent[recent.len() - 1];
    let (slope, _intercept) = regression_trend(recent);

    let volatility = if volatility.is_nan() || volatility <= 0.0 {
        current * DEFAULT_VOLATILITY_RATIO
    } else {
        volatility
    };
    let noise_sd = volatility * NOISE_SCALE;
    let floor = current * PRICE_FLOOR_RATIO;

    let points = (1..=horizon)
        .map(|step| {
            let trend_price = current + slope * step as f64;
            let noise = standard_normal(rng) * noise_sd;

            let mut price = round_to((trend_price + noise).max(floor), 2);
            if price < floor {
                // rounding must not undercut the floor
                price = (floor * 100.0).ceil() / 100.0;
            }

            ForecastPoint {
                date: today + Duration::days(step as i64),
                price,
            }
        })
        .collect();

    Ok(points)
}

/// Percent change from `current_price` to the last forecast price, rounded to
/// two decimals. Zero for an empty forecast.
pub fn expected_return_pct(current_price: f64, forecast: &[ForecastPoint]) -> f64 {
    match forecast.last() {
        Some(end) => round_to((end.price - current_price) / current_price * 100.0, 2),
        None => 0.0,
    }
}

pub fn to_window(points: &[ForecastPoint]) -> PriceWindow {
    PriceWindow {
        dates: points.iter().map(|p| p.date.format("%Y-%m-%d").to_string()).collect(),
        prices: points.iter().map(|p| p.price).collect(),
    }
}

use chrono::{Duration, NaiveDate};

use crate::models::{EnrichedBar, PriceBar, PriceSeries};

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start_date() + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000_000.0 + (i % 5) as f64 * 100_000.0,
        })
        .collect();

    PriceSeries::new(symbol, bars).unwrap()
}

/// Oscillating prices with a slight upward drift.
pub fn wavy_series(symbol: &str, n: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + 10.0 * (i as f64 / 5.0).sin() + 0.05 * i as f64)
        .collect();
    series_from_closes(symbol, &closes)
}

pub fn trending_series(symbol: &str, n: usize, start: f64, step: f64) -> PriceSeries {
    let closes: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    series_from_closes(symbol, &closes)
}

/// Enriched row with only the fields the trend vote looks at set explicitly.
pub fn vote_row(close: f64, sma20: f64, rsi14: f64, macd: f64) -> EnrichedBar {
    EnrichedBar {
        bar: PriceBar::from_close(start_date(), close, 1_000.0),
        sma20,
        sma50: sma20,
        rsi14,
        macd,
        volatility20: 1.0,
        pct_change_1: 0.0,
        pct_change_5: 0.0,
        pct_change_10: 0.0,
    }
}

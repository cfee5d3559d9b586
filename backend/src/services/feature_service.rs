use tracing::debug;

use crate::errors::PredictionError;
use crate::models::{EnrichedBar, EnrichedSeries, PriceSeries};
use crate::services::indicators;

pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const VOLATILITY_WINDOW: usize = 20;

/// Smallest average loss used as the RSI denominator.
pub const RSI_LOSS_FLOOR: f64 = 1e-4;

/// Rows that must survive warm-up truncation.
pub const MIN_ENRICHED_ROWS: usize = 20;

/// Leading bars lost to indicator warm-up (the 50-bar SMA dominates).
pub const WARM_UP_ROWS: usize = SMA_LONG - 1;

/// RSI(14) over closing prices. Needs at least `RSI_PERIOD + 1` closes.
pub fn relative_strength(closes: &[f64]) -> Result<Vec<Option<f64>>, PredictionError> {
    if closes.len() < RSI_PERIOD + 1 {
        return Err(PredictionError::insufficient("RSI calculation", RSI_PERIOD + 1, closes.len()));
    }
    Ok(indicators::rsi(closes, RSI_PERIOD, RSI_LOSS_FLOOR))
}

/// MACD(12, 26, 9) line over closing prices. Needs at least
/// `MACD_SLOW + MACD_SIGNAL` closes.
pub fn macd_line(closes: &[f64]) -> Result<Vec<f64>, PredictionError> {
    if closes.len() < MACD_SLOW + MACD_SIGNAL {
        return Err(PredictionError::insufficient(
            "MACD calculation",
            MACD_SLOW + MACD_SIGNAL,
            closes.len(),
        ));
    }

    // the signal line is computed alongside but not part of the feature set
    let (line, _signal) = indicators::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    Ok(line)
}

/// Derive the indicator columns for every bar and drop the rows that are
/// still inside a warm-up window.
pub fn enrich(series: &PriceSeries) -> Result<EnrichedSeries, PredictionError> {
    let closes = series.closes();

    let rsi14 = relative_strength(&closes)?;
    let macd = macd_line(&closes)?;
    let sma20 = indicators::sma(&closes, SMA_SHORT);
    let sma50 = indicators::sma(&closes, SMA_LONG);
    let volatility20 = indicators::rolling_std(&closes, VOLATILITY_WINDOW);
    let pct_1 = indicators::pct_change(&closes, 1);
    let pct_5 = indicators::pct_change(&closes, 5);
    let pct_10 = indicators::pct_change(&closes, 10);

    let rows: Vec<EnrichedBar> = series
        .bars()
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            let row = EnrichedBar {
                bar: *bar,
                sma20: sma20[i]?,
                sma50: sma50[i]?,
                rsi14: rsi14[i]?,
                macd: macd[i],
                volatility20: volatility20[i]?,
                pct_change_1: pct_1[i]?,
                pct_change_5: pct_5[i]?,
                pct_change_10: pct_10[i]?,
            };
            row.is_complete().then_some(row)
        })
        .collect();

    debug!(
        "Enriched {} of {} bars for {}",
        rows.len(),
        series.len(),
        series.symbol()
    );

    if rows.len() < MIN_ENRICHED_ROWS {
        return Err(PredictionError::insufficient(
            "feature preparation",
            MIN_ENRICHED_ROWS,
            rows.len(),
        ));
    }

    Ok(EnrichedSeries::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::wavy_series;

    #[test]
    fn test_warm_up_rows_are_dropped() {
        let series = wavy_series("AAPL", 120);
        let enriched = enrich(&series).unwrap();

        assert_eq!(enriched.len(), 120 - WARM_UP_ROWS);
        assert_eq!(enriched.rows()[0].bar.date, series.bars()[WARM_UP_ROWS].date);
        assert_eq!(enriched.last().unwrap().bar, *series.last());
    }

    #[test]
    fn test_nineteen_rows_fail_twenty_succeed() {
        let too_short = wavy_series("AAPL", WARM_UP_ROWS + 19);
        let err = enrich(&too_short).unwrap_err();
        assert_eq!(
            err,
            PredictionError::InsufficientData {
                stage: "feature preparation",
                required: 20,
                actual: 19
            }
        );

        let just_enough = wavy_series("AAPL", WARM_UP_ROWS + 20);
        assert_eq!(enrich(&just_enough).unwrap().len(), 20);
    }

    #[test]
    fn test_rsi_needs_fifteen_closes() {
        let closes = vec![100.0; 14];
        assert!(matches!(
            relative_strength(&closes),
            Err(PredictionError::InsufficientData { required: 15, actual: 14, .. })
        ));
        assert!(relative_strength(&[100.0; 15]).is_ok());
    }

    #[test]
    fn test_macd_needs_thirty_five_closes() {
        assert!(matches!(
            macd_line(&[100.0; 34]),
            Err(PredictionError::InsufficientData { required: 35, actual: 34, .. })
        ));
        assert_eq!(macd_line(&[100.0; 35]).unwrap().len(), 35);
    }

    #[test]
    fn test_short_series_fails_before_truncation() {
        let series = wavy_series("AAPL", 30);
        assert!(matches!(
            enrich(&series),
            Err(PredictionError::InsufficientData { stage: "MACD calculation", .. })
        ));
    }

    #[test]
    fn test_enriched_rows_are_complete() {
        let enriched = enrich(&wavy_series("MSFT", 200)).unwrap();
        assert!(enriched.rows().iter().all(|r| r.is_complete()));
        assert!(enriched.rows().iter().all(|r| (0.0..=100.0).contains(&r.rsi14)));
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::PredictionError;

/// A single daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Bar where open/high/low all sit on the close. Handy when a source only
    /// reports closing prices.
    pub fn from_close(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Daily bars for one symbol, ordered by strictly increasing date.
///
/// The series is never empty; `PriceSeries::new` rejects empty input and
/// out-of-order dates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, PredictionError> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(PredictionError::InvalidSeries(format!(
                "price series for {} has no bars",
                symbol
            )));
        }

        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(PredictionError::InvalidSeries(format!(
                "dates must be strictly increasing ({} followed by {})",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    // never empty, so no is_empty
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> &PriceBar {
        // non-empty by construction
        &self.bars[self.bars.len() - 1]
    }
}

/// A price bar together with the indicators derived for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichedBar {
    pub bar: PriceBar,
    pub sma20: f64,
    pub sma50: f64,
    pub rsi14: f64,
    pub macd: f64,
    pub volatility20: f64,
    pub pct_change_1: f64,
    pub pct_change_5: f64,
    pub pct_change_10: f64,
}

impl EnrichedBar {
    pub fn close(&self) -> f64 {
        self.bar.close
    }

    /// True when the bar and every indicator hold a finite number.
    pub fn is_complete(&self) -> bool {
        self.bar.is_finite()
            && [
                self.sma20,
                self.sma50,
                self.rsi14,
                self.macd,
                self.volatility20,
                self.pct_change_1,
                self.pct_change_5,
                self.pct_change_10,
            ]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Price series after indicator warm-up rows have been dropped.
#[derive(Debug, Clone, Default)]
pub struct EnrichedSeries {
    rows: Vec<EnrichedBar>,
}

impl EnrichedSeries {
    pub fn from_rows(rows: Vec<EnrichedBar>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedBar] {
        &self.rows
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The trailing `n` rows (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[EnrichedBar] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close()).collect()
    }

    pub fn last(&self) -> Option<&EnrichedBar> {
        self.rows.last()
    }
}
